//! Core data types for the launch detector.

pub mod risk;
pub mod token;

pub use risk::*;
pub use token::*;
