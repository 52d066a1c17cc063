//! Shyft token-list fetcher with DexScreener enrichment.

use crate::dexscreener::DexScreenerClient;
use crate::error::FeedError;
use crate::http::{get_json, json_str};
use crate::source::SourceFetcher;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use launch_core::TokenRecord;
use serde_json::Value;
use tracing::debug;

pub const SHYFT_BASE_URL: &str = "https://api.shyft.to";

#[derive(Debug, Clone)]
pub struct ShyftConfig {
    pub base_url: String,
    pub api_key: String,
    /// Page size requested from Shyft
    pub page_size: usize,
}

impl ShyftConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: SHYFT_BASE_URL.to_string(),
            api_key: api_key.into(),
            page_size: 20,
        }
    }
}

/// Shyft only returns token identity; market data comes from a DexScreener
/// lookup per token.
pub struct ShyftFetcher {
    client: reqwest::Client,
    dexscreener: DexScreenerClient,
    config: ShyftConfig,
}

impl ShyftFetcher {
    /// Fails with `MissingCredentials` when the API key is blank.
    pub fn new(
        client: reqwest::Client,
        dexscreener: DexScreenerClient,
        config: ShyftConfig,
    ) -> Result<Self, FeedError> {
        if config.api_key.trim().is_empty() {
            return Err(FeedError::MissingCredentials(
                "Shyft requires an API key".to_string(),
            ));
        }
        Ok(Self {
            client,
            dexscreener,
            config,
        })
    }

    async fn enrich(&self, record: TokenRecord) -> TokenRecord {
        match self.dexscreener.lookup_token(&record.address).await {
            Ok(Some(market)) => record.merge_market_data(&market),
            Ok(None) => record,
            Err(e) => {
                debug!(address = %record.address, error = %e, "Shyft: enrichment lookup failed");
                record
            }
        }
    }
}

pub fn parse_token(token: &Value, fetched_at: DateTime<Utc>) -> Option<TokenRecord> {
    let address = json_str(&token["address"])?;
    Some(
        TokenRecord::new(
            address,
            json_str(&token["symbol"]).unwrap_or(""),
            json_str(&token["name"]).unwrap_or(""),
        )
        .with_fetched_at(fetched_at),
    )
}

#[async_trait]
impl SourceFetcher for ShyftFetcher {
    fn name(&self) -> &str {
        "Shyft"
    }

    async fn try_fetch(&self) -> Result<Vec<TokenRecord>, FeedError> {
        let url = format!(
            "{}/sol/v1/token/all_tokens",
            self.config.base_url.trim_end_matches('/')
        );
        let size = self.config.page_size.to_string();
        let request = self
            .client
            .get(&url)
            .header("x-api-key", &self.config.api_key)
            .query(&[("network", "mainnet-beta"), ("page", "1"), ("size", size.as_str())]);

        let json = get_json(request).await?;
        if json["success"] != Value::Bool(true) {
            return Err(FeedError::MalformedPayload(format!(
                "Shyft: request not successful ({})",
                json_str(&json["message"]).unwrap_or("no message")
            )));
        }

        let tokens = json["result"]
            .as_array()
            .ok_or_else(|| FeedError::MalformedPayload("Shyft: no result array".to_string()))?;

        let fetched_at = Utc::now();
        let bare: Vec<TokenRecord> = tokens
            .iter()
            .filter_map(|token| parse_token(token, fetched_at))
            .collect();

        Ok(join_all(bare.into_iter().map(|record| self.enrich(record))).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve, test_client};
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn all_tokens(headers: HeaderMap) -> Response {
        if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("shyft-key") {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Json(json!({
            "success": true,
            "result": [
                { "address": "Listed", "symbol": "LIST", "name": "Listed Token" },
                { "address": "Unlisted", "symbol": "NEW", "name": "New Token" },
                { "address": "Broken", "symbol": "BRK" },
                { "symbol": "NOADDR" }
            ]
        }))
        .into_response()
    }

    async fn dex_tokens(Path(address): Path<String>) -> Response {
        match address.as_str() {
            "Listed" => Json(json!({
                "pairs": [{
                    "baseToken": { "address": "Listed", "symbol": "LIST" },
                    "priceUsd": "0.5",
                    "liquidity": { "usd": 12000 },
                    "volume": { "h24": 30000 },
                    "pairAddress": "Pair1",
                    "dexId": "raydium"
                }]
            }))
            .into_response(),
            "Unlisted" => Json(json!({ "pairs": null })).into_response(),
            _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    fn app() -> Router {
        Router::new()
            .route("/sol/v1/token/all_tokens", get(all_tokens))
            .route("/latest/dex/tokens/:address", get(dex_tokens))
    }

    #[test]
    fn test_blank_key_is_missing_credentials() {
        let result = ShyftFetcher::new(
            test_client(),
            DexScreenerClient::new(test_client(), "http://127.0.0.1:1"),
            ShyftConfig::new("  "),
        );
        assert!(matches!(result, Err(FeedError::MissingCredentials(_))));
    }

    #[tokio::test]
    async fn test_fetch_enriches_from_dexscreener() {
        let base = serve(app()).await;
        let mut config = ShyftConfig::new("shyft-key");
        config.base_url = base.clone();
        let fetcher = ShyftFetcher::new(
            test_client(),
            DexScreenerClient::new(test_client(), base),
            config,
        )
        .unwrap();

        let records = fetcher.try_fetch().await.unwrap();
        let addresses: Vec<&str> = records.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["Listed", "Unlisted", "Broken"]);

        assert_eq!(records[0].liquidity_usd, 12000.0);
        assert_eq!(records[0].price_usd, 0.5);
        assert_eq!(records[0].pair_address.as_deref(), Some("Pair1"));
        assert_eq!(records[0].name, "Listed Token");

        // lookups that find nothing or fail keep the bare record
        assert_eq!(records[1].liquidity_usd, 0.0);
        assert_eq!(records[2].symbol.as_str(), "BRK");
        assert_eq!(records[2].liquidity_usd, 0.0);
    }

    #[tokio::test]
    async fn test_fetch_with_wrong_key_is_unavailable() {
        let base = serve(app()).await;
        let mut config = ShyftConfig::new("wrong");
        config.base_url = base.clone();
        let fetcher = ShyftFetcher::new(
            test_client(),
            DexScreenerClient::new(test_client(), base),
            config,
        )
        .unwrap();

        assert!(matches!(
            fetcher.try_fetch().await,
            Err(FeedError::ProviderUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_success_false_is_malformed() {
        let shyft = Router::new().route(
            "/sol/v1/token/all_tokens",
            get(|| async { Json(json!({ "success": false, "message": "quota exceeded" })) }),
        );
        let base = serve(shyft).await;
        let mut config = ShyftConfig::new("shyft-key");
        config.base_url = base.clone();
        let fetcher = ShyftFetcher::new(
            test_client(),
            DexScreenerClient::new(test_client(), base),
            config,
        )
        .unwrap();

        assert!(matches!(
            fetcher.try_fetch().await,
            Err(FeedError::MalformedPayload(_))
        ));
    }
}
