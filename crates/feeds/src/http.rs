//! Shared HTTP plumbing for provider fetchers.

use crate::error::FeedError;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("launch-detector/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by all fetchers.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, FeedError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| FeedError::ProviderUnavailable(format!("failed to build HTTP client: {}", e)))
}

/// Send a prepared request and decode the body as JSON.
///
/// Non-success statuses are reported as `ProviderUnavailable`, the same as a
/// transport failure; an undecodable body is `MalformedPayload`.
pub async fn get_json(request: reqwest::RequestBuilder) -> Result<Value, FeedError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::ProviderUnavailable(format!("HTTP {}", status)));
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Read a number that may be encoded as a JSON number or a numeric string.
pub fn json_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Like [`json_f64`] but missing values become 0.
pub fn json_f64_or_zero(value: &Value) -> f64 {
    json_f64(value).unwrap_or(0.0)
}

/// Read a non-empty string field.
pub fn json_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Convert a unix timestamp in milliseconds to a UTC time.
pub fn from_unix_ms(value: &Value) -> Option<DateTime<Utc>> {
    let ms = json_f64(value)? as i64;
    if ms <= 0 {
        return None;
    }
    Utc.timestamp_millis_opt(ms).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_f64_accepts_numbers_and_strings() {
        assert_eq!(json_f64(&json!(1.5)), Some(1.5));
        assert_eq!(json_f64(&json!("0.000012")), Some(0.000012));
        assert_eq!(json_f64(&json!(" 42 ")), Some(42.0));
        assert_eq!(json_f64(&json!("abc")), None);
        assert_eq!(json_f64(&Value::Null), None);
        assert_eq!(json_f64_or_zero(&json!({"usd": 1})), 0.0);
    }

    #[test]
    fn test_json_str_rejects_blank() {
        assert_eq!(json_str(&json!("BONK")), Some("BONK"));
        assert_eq!(json_str(&json!("   ")), None);
        assert_eq!(json_str(&json!(5)), None);
    }

    #[test]
    fn test_from_unix_ms() {
        let ts = from_unix_ms(&json!(1_700_000_000_000i64)).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert!(from_unix_ms(&json!(0)).is_none());
        assert!(from_unix_ms(&Value::Null).is_none());
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn test_request_timeout_is_provider_unavailable() {
        use crate::raydium::{RaydiumConfig, RaydiumFetcher};
        use crate::source::SourceFetcher;
        use crate::testing::serve;
        use axum::{routing::get, Json, Router};

        let app = Router::new().route(
            "/v2/main/pairs",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!([]))
            }),
        );
        let config = RaydiumConfig {
            base_url: serve(app).await,
            ..Default::default()
        };
        let client = build_client(Duration::from_millis(200)).unwrap();
        let fetcher = RaydiumFetcher::new(client, config);

        let started = std::time::Instant::now();
        assert!(matches!(
            fetcher.try_fetch().await,
            Err(FeedError::ProviderUnavailable(_))
        ));
        assert!(fetcher.fetch().await.is_empty());
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
