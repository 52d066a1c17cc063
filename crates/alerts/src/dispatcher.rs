//! Alert dispatch logic.

use crate::channel::AlertChannel;
use crate::error::DeliveryError;
use crate::telegram::{format_alert_message, format_startup_message};
use launch_core::{RiskAssessment, TokenRecord};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Notified after every dispatch attempt.
pub trait DispatchObserver: Send + Sync {
    fn on_delivered(&self, record: &TokenRecord, assessment: &RiskAssessment, source: &str);

    fn on_failed(&self, record: &TokenRecord, source: &str, error: &DeliveryError);
}

/// Formats alerts and hands them to one channel, exactly once each.
pub struct AlertDispatcher {
    channel: Arc<dyn AlertChannel>,
    observers: Vec<Arc<dyn DispatchObserver>>,
}

impl AlertDispatcher {
    pub fn new(channel: Arc<dyn AlertChannel>) -> Self {
        Self {
            channel,
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    /// Send one alert. Failures are logged and reported to observers, then
    /// returned; nothing is retried.
    pub async fn dispatch(
        &self,
        record: &TokenRecord,
        assessment: &RiskAssessment,
        source: &str,
    ) -> Result<(), DeliveryError> {
        let message = format_alert_message(record, assessment, source);

        match self.channel.send(&message).await {
            Ok(()) => {
                info!(
                    channel = self.channel.name(),
                    symbol = %record.symbol,
                    address = %record.address,
                    source = source,
                    score = assessment.score,
                    level = %assessment.level,
                    "Alert sent"
                );
                for observer in &self.observers {
                    observer.on_delivered(record, assessment, source);
                }
                Ok(())
            }
            Err(e) => {
                error!(
                    channel = self.channel.name(),
                    address = %record.address,
                    source = source,
                    error = %e,
                    "Failed to send alert"
                );
                for observer in &self.observers {
                    observer.on_failed(record, source, &e);
                }
                Err(e)
            }
        }
    }

    /// Best-effort "detector online" message. Failure is only logged.
    pub async fn announce_startup(&self, sources: &[&str], host: &str, min_liquidity_usd: f64) {
        let message = format_startup_message(sources, host, min_liquidity_usd);
        match self.channel.send(&message).await {
            Ok(()) => info!(channel = self.channel.name(), sources = sources.len(), "Startup announced"),
            Err(e) => warn!(channel = self.channel.name(), error = %e, "Startup announcement failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use launch_core::RiskLevel;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl AlertChannel for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, text: &str) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(text.to_string());
            if self.fail {
                Err(DeliveryError::Rejected("chat not found".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct Counting {
        delivered: Mutex<Vec<String>>,
        failed: Mutex<Vec<String>>,
    }

    impl DispatchObserver for Counting {
        fn on_delivered(&self, record: &TokenRecord, _: &RiskAssessment, source: &str) {
            self.delivered
                .lock()
                .unwrap()
                .push(format!("{}@{}", record.address, source));
        }

        fn on_failed(&self, record: &TokenRecord, _: &str, _: &DeliveryError) {
            self.failed.lock().unwrap().push(record.address.clone());
        }
    }

    fn sample() -> (TokenRecord, RiskAssessment) {
        (
            TokenRecord::new("Mint111", "BONK", "Bonk").with_market(0.00002, 45_000.0, 120_000.0),
            RiskAssessment::new(85, RiskLevel::Low, Vec::new()),
        )
    }

    #[tokio::test]
    async fn test_dispatch_sends_once_and_notifies() {
        let channel = Arc::new(Recording::default());
        let observer = Arc::new(Counting::default());
        let dispatcher = AlertDispatcher::new(channel.clone()).with_observer(observer.clone());

        let (record, assessment) = sample();
        dispatcher.dispatch(&record, &assessment, "DexScreener").await.unwrap();

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("BONK"));
        assert_eq!(*observer.delivered.lock().unwrap(), vec!["Mint111@DexScreener".to_string()]);
        assert!(observer.failed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delivery_not_retried() {
        let channel = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let observer = Arc::new(Counting::default());
        let dispatcher = AlertDispatcher::new(channel.clone()).with_observer(observer.clone());

        let (record, assessment) = sample();
        let result = dispatcher.dispatch(&record, &assessment, "Raydium").await;

        assert!(matches!(result, Err(DeliveryError::Rejected(_))));
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
        assert_eq!(*observer.failed.lock().unwrap(), vec!["Mint111".to_string()]);
        assert!(observer.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_startup_failure_is_swallowed() {
        let channel = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let dispatcher = AlertDispatcher::new(channel.clone());
        dispatcher.announce_startup(&["DexScreener"], "host", 100.0).await;
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
        assert_eq!(dispatcher.channel_name(), "recording");
    }
}
