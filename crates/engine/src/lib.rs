//! Token triage engine.
//!
//! Everything between a fetched record and an alert: the quality filter,
//! the seen-set that guarantees one alert per token, the risk scorer, and
//! the on-disk cache of recent results.

pub mod cache;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod scorer;

pub use cache::*;
pub use dedup::*;
pub use error::*;
pub use filter::*;
pub use scorer::*;
