//! Delivery targets for formatted alerts.

use crate::error::DeliveryError;
use async_trait::async_trait;
use tracing::info;

/// Somewhere an alert can be sent.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one message. Called exactly once per alert.
    async fn send(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Writes alerts to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        info!(channel = "log", "Alert (not sent):\n{}", text);
        Ok(())
    }
}
