//! Error types for source fetch operations.

use thiserror::Error;

/// Errors that can occur while querying a data provider.
///
/// None of these escape [`SourceFetcher::fetch`](crate::SourceFetcher::fetch);
/// they are logged there and turned into an empty result.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport failure, timeout, or non-success HTTP status.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider answered but the payload had an unexpected shape
    /// or carried a provider-level error flag.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::MalformedPayload(err.to_string())
        } else {
            FeedError::ProviderUnavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::MalformedPayload(err.to_string())
    }
}

impl FeedError {
    /// Returns true if the next poll is likely to succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, FeedError::ProviderUnavailable(_))
    }
}
