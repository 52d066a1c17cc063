//! Telegram alerting for newly detected tokens.
//!
//! This crate provides:
//! - The [`AlertChannel`] delivery trait with Telegram and log implementations
//! - Alert message formatting (Telegram HTML)
//! - [`AlertDispatcher`], which sends each alert once and reports the outcome
//!   to registered [`DispatchObserver`]s

pub mod channel;
pub mod dispatcher;
pub mod error;
pub mod telegram;

pub use channel::{AlertChannel, LogChannel};
pub use dispatcher::{AlertDispatcher, DispatchObserver};
pub use error::DeliveryError;
pub use telegram::{format_alert_message, TelegramChannel};
