//! The polymorphic data-source interface.

use crate::error::FeedError;
use async_trait::async_trait;
use launch_core::TokenRecord;
use tracing::{debug, warn};

/// One external token data provider.
///
/// Implementors only write [`try_fetch`](SourceFetcher::try_fetch); the poll
/// loop calls [`fetch`](SourceFetcher::fetch), which never fails. Every call
/// re-queries the provider.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Provider name used in logs and alerts.
    fn name(&self) -> &str;

    /// Query the provider once and normalize the response.
    async fn try_fetch(&self) -> Result<Vec<TokenRecord>, FeedError>;

    /// Query the provider, converting any failure into an empty result.
    async fn fetch(&self) -> Vec<TokenRecord> {
        match self.try_fetch().await {
            Ok(records) => {
                debug!(source = self.name(), count = records.len(), "Fetched records");
                records
            }
            Err(e) => {
                warn!(
                    source = self.name(),
                    transient = e.is_transient(),
                    error = %e,
                    "Source fetch failed"
                );
                Vec::new()
            }
        }
    }
}
