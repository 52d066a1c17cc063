//! Birdeye token-list fetcher (top tokens by 24h volume).

use crate::error::FeedError;
use crate::http::{get_json, json_f64, json_f64_or_zero, json_str};
use crate::source::SourceFetcher;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use launch_core::{PriceChange, TokenRecord};
use serde_json::Value;

pub const BIRDEYE_BASE_URL: &str = "https://public-api.birdeye.so";

#[derive(Debug, Clone)]
pub struct BirdeyeConfig {
    pub base_url: String,
    /// Sent as `X-API-KEY` when present
    pub api_key: Option<String>,
    pub max_results: usize,
}

impl Default for BirdeyeConfig {
    fn default() -> Self {
        Self {
            base_url: BIRDEYE_BASE_URL.to_string(),
            api_key: None,
            max_results: 3,
        }
    }
}

pub struct BirdeyeFetcher {
    client: reqwest::Client,
    config: BirdeyeConfig,
}

impl BirdeyeFetcher {
    pub fn new(client: reqwest::Client, config: BirdeyeConfig) -> Self {
        Self { client, config }
    }
}

/// Normalize one entry of `data.tokens[]`. The list carries no creation time.
pub fn parse_token(token: &Value, fetched_at: DateTime<Utc>) -> Option<TokenRecord> {
    let address = json_str(&token["address"])?;

    let record = TokenRecord::new(
        address,
        json_str(&token["symbol"]).unwrap_or(""),
        json_str(&token["name"]).unwrap_or(""),
    )
    .with_market(
        json_f64_or_zero(&token["price"]),
        json_f64_or_zero(&token["liquidity"]),
        json_f64_or_zero(&token["v24hUSD"]),
    )
    .with_market_cap(json_f64(&token["mc"]))
    .with_price_change(PriceChange::new(
        0.0,
        0.0,
        json_f64_or_zero(&token["priceChange24hPercent"]),
    ))
    .with_fetched_at(fetched_at);

    Some(record)
}

#[async_trait]
impl SourceFetcher for BirdeyeFetcher {
    fn name(&self) -> &str {
        "Birdeye"
    }

    async fn try_fetch(&self) -> Result<Vec<TokenRecord>, FeedError> {
        let url = format!("{}/defi/tokenlist", self.config.base_url.trim_end_matches('/'));
        let mut request = self
            .client
            .get(&url)
            .query(&[("sort_by", "v24hUSD"), ("sort_type", "desc"), ("limit", "50")])
            .header("x-chain", "solana");
        if let Some(key) = &self.config.api_key {
            request = request.header("X-API-KEY", key);
        }

        let json = get_json(request).await?;
        if json["success"] == Value::Bool(false) {
            return Err(FeedError::MalformedPayload(format!(
                "Birdeye: success=false ({})",
                json_str(&json["message"]).unwrap_or("no message")
            )));
        }

        let tokens = json["data"]["tokens"]
            .as_array()
            .ok_or_else(|| FeedError::MalformedPayload("Birdeye: no data.tokens array".to_string()))?;

        let fetched_at = Utc::now();
        Ok(tokens
            .iter()
            .filter_map(|token| parse_token(token, fetched_at))
            .take(self.config.max_results)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve, test_client};
    use axum::{http::HeaderMap, routing::get, Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_token() {
        let token = json!({
            "address": "Mint111",
            "symbol": "JUP",
            "name": "Jupiter",
            "price": 0.92,
            "liquidity": 1_500_000.0,
            "v24hUSD": "3200000",
            "mc": 1_200_000_000.0,
            "priceChange24hPercent": -4.5
        });

        let record = parse_token(&token, Utc::now()).unwrap();
        assert_eq!(record.symbol.as_str(), "JUP");
        assert_eq!(record.price_usd, 0.92);
        assert_eq!(record.liquidity_usd, 1_500_000.0);
        assert_eq!(record.volume_24h_usd, 3_200_000.0);
        assert_eq!(record.market_cap_usd, Some(1_200_000_000.0));
        assert_eq!(record.created_at, None);
    }

    #[test]
    fn test_parse_token_missing_fields() {
        let record = parse_token(&json!({ "address": "Mint222" }), Utc::now()).unwrap();
        assert_eq!(record.liquidity_usd, 0.0);
        assert_eq!(record.market_cap_usd, None);
        assert!(parse_token(&json!({ "symbol": "X" }), Utc::now()).is_none());
    }

    #[tokio::test]
    async fn test_fetch_sends_key_and_truncates() {
        let app = Router::new().route(
            "/defi/tokenlist",
            get(|headers: HeaderMap| async move {
                let keyed = headers.get("x-api-key").is_some();
                let tokens: Vec<Value> = (0..5)
                    .map(|i| json!({ "address": format!("Mint{}", i), "symbol": if keyed { "KEY" } else { "ANON" } }))
                    .collect();
                Json(json!({ "success": true, "data": { "tokens": tokens } }))
            }),
        );
        let config = BirdeyeConfig {
            base_url: serve(app).await,
            api_key: Some("secret".to_string()),
            ..Default::default()
        };
        let fetcher = BirdeyeFetcher::new(test_client(), config);

        let records = fetcher.try_fetch().await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].address, "Mint0");
        assert!(records.iter().all(|r| r.symbol == "KEY"));
    }

    #[tokio::test]
    async fn test_fetch_success_false_is_malformed() {
        let app = Router::new().route(
            "/defi/tokenlist",
            get(|| async { Json(json!({ "success": false, "message": "Unauthorized" })) }),
        );
        let config = BirdeyeConfig {
            base_url: serve(app).await,
            ..Default::default()
        };
        let fetcher = BirdeyeFetcher::new(test_client(), config);

        assert!(matches!(
            fetcher.try_fetch().await,
            Err(FeedError::MalformedPayload(_))
        ));
        assert!(fetcher.fetch().await.is_empty());
    }
}
