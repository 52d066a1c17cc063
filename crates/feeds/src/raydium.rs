//! Raydium pairs-list fetcher.

use crate::error::FeedError;
use crate::http::{get_json, json_f64, json_f64_or_zero, json_str};
use crate::source::SourceFetcher;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use launch_core::TokenRecord;
use serde_json::Value;

pub const RAYDIUM_BASE_URL: &str = "https://api.raydium.io";

/// Settings for the Raydium source.
#[derive(Debug, Clone)]
pub struct RaydiumConfig {
    pub base_url: String,
    /// Youngest pairs kept per poll
    pub max_results: usize,
}

impl Default for RaydiumConfig {
    fn default() -> Self {
        Self {
            base_url: RAYDIUM_BASE_URL.to_string(),
            max_results: 3,
        }
    }
}

/// Polls the Raydium pair list. The list is large; only pairs that report
/// an age (`timeDiff`, seconds) are considered.
pub struct RaydiumFetcher {
    client: reqwest::Client,
    config: RaydiumConfig,
}

impl RaydiumFetcher {
    pub fn new(client: reqwest::Client, config: RaydiumConfig) -> Self {
        Self { client, config }
    }
}

/// Normalize one Raydium pair object.
pub fn parse_pair(pair: &Value, fetched_at: DateTime<Utc>) -> Option<TokenRecord> {
    let address = json_str(&pair["baseMint"])?;
    let name = json_str(&pair["name"]).unwrap_or("");
    // "BONK/SOL" or "BONK-SOL"
    let symbol = name.split(['/', '-']).next().unwrap_or("").trim();

    let created_at = json_f64(&pair["timeDiff"])
        .filter(|secs| *secs >= 0.0)
        .and_then(|secs| Duration::try_milliseconds((secs * 1000.0) as i64))
        .and_then(|age| fetched_at.checked_sub_signed(age));

    let record = TokenRecord::new(address, symbol, name)
        .with_market(
            json_f64_or_zero(&pair["price"]),
            json_f64_or_zero(&pair["liquidity"]),
            json_f64_or_zero(&pair["volume24h"]),
        )
        .with_created_at(created_at)
        .with_pair(
            json_str(&pair["ammId"]).map(str::to_string),
            Some("raydium".to_string()),
        )
        .with_fetched_at(fetched_at);

    Some(record)
}

#[async_trait]
impl SourceFetcher for RaydiumFetcher {
    fn name(&self) -> &str {
        "Raydium"
    }

    async fn try_fetch(&self) -> Result<Vec<TokenRecord>, FeedError> {
        let url = format!("{}/v2/main/pairs", self.config.base_url.trim_end_matches('/'));
        let json = get_json(self.client.get(&url)).await?;
        let fetched_at = Utc::now();

        let pairs = json
            .as_array()
            .ok_or_else(|| FeedError::MalformedPayload("Raydium: expected a pair array".to_string()))?;

        let mut records: Vec<TokenRecord> = pairs
            .iter()
            .filter_map(|pair| parse_pair(pair, fetched_at))
            .filter(|record| record.created_at.is_some())
            .collect();

        records.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        records.truncate(self.config.max_results);
        Ok(records)
    }
}
