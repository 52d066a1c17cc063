//! DexScreener search fetcher and token lookup.

use crate::error::FeedError;
use crate::http::{from_unix_ms, get_json, json_f64, json_f64_or_zero, json_str};
use crate::source::SourceFetcher;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use launch_core::{PriceChange, TokenRecord};
use serde_json::Value;
use std::cmp::Reverse;
use tracing::debug;

pub const DEXSCREENER_BASE_URL: &str = "https://api.dexscreener.com";

/// Thin client over the public DexScreener REST API.
#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    client: reqwest::Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Search pairs by free-text query and return the raw pair objects.
    pub async fn search_pairs(&self, query: &str) -> Result<Vec<Value>, FeedError> {
        let url = format!("{}/latest/dex/search", self.base_url);
        let mut json = get_json(self.client.get(&url).query(&[("q", query)])).await?;
        match json["pairs"].take() {
            Value::Array(pairs) => Ok(pairs),
            _ => Err(FeedError::MalformedPayload(
                "DexScreener: no pairs array".to_string(),
            )),
        }
    }

    /// Look up every pair for a token and return the one with the deepest liquidity.
    /// Returns `Ok(None)` when DexScreener has no pairs for the token yet.
    pub async fn lookup_token(&self, address: &str) -> Result<Option<TokenRecord>, FeedError> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, address);
        let json = get_json(self.client.get(&url)).await?;
        let fetched_at = Utc::now();

        // "pairs": null is the normal answer for brand new tokens
        if json["pairs"].is_null() {
            return Ok(None);
        }

        let best = pairs_array(&json)?
            .iter()
            .filter_map(|pair| parse_pair(pair, fetched_at))
            .max_by(|a, b| a.liquidity_usd.total_cmp(&b.liquidity_usd));
        Ok(best)
    }
}

fn pairs_array(json: &Value) -> Result<&Vec<Value>, FeedError> {
    json["pairs"]
        .as_array()
        .ok_or_else(|| FeedError::MalformedPayload("DexScreener: no pairs array".to_string()))
}

/// Normalize one DexScreener pair object.
/// Returns None only when the base token address is missing.
pub fn parse_pair(pair: &Value, fetched_at: DateTime<Utc>) -> Option<TokenRecord> {
    let base = &pair["baseToken"];
    let address = json_str(&base["address"])?;
    let symbol = json_str(&base["symbol"]).unwrap_or("");
    let name = json_str(&base["name"]).unwrap_or("");

    let market_cap = json_f64(&pair["marketCap"]).or_else(|| json_f64(&pair["fdv"]));

    let record = TokenRecord::new(address, symbol, name)
        .with_market(
            json_f64_or_zero(&pair["priceUsd"]),
            json_f64_or_zero(&pair["liquidity"]["usd"]),
            json_f64_or_zero(&pair["volume"]["h24"]),
        )
        .with_market_cap(market_cap)
        .with_created_at(from_unix_ms(&pair["pairCreatedAt"]))
        .with_price_change(PriceChange::new(
            json_f64_or_zero(&pair["priceChange"]["m5"]),
            json_f64_or_zero(&pair["priceChange"]["h1"]),
            json_f64_or_zero(&pair["priceChange"]["h24"]),
        ))
        .with_pair(
            json_str(&pair["pairAddress"]).map(str::to_string),
            json_str(&pair["dexId"]).map(str::to_string),
        )
        .with_fetched_at(fetched_at);

    Some(record)
}

/// Settings for the DexScreener search source.
#[derive(Debug, Clone)]
pub struct DexScreenerConfig {
    /// Free-text search query
    pub query: String,
    /// Only pairs on this chain are kept
    pub chain_id: String,
    /// Newest pairs kept per poll
    pub max_results: usize,
}

impl Default for DexScreenerConfig {
    fn default() -> Self {
        Self {
            query: "USDC SOL".to_string(),
            chain_id: "solana".to_string(),
            max_results: 5,
        }
    }
}

/// Polls DexScreener search for recently created pairs.
pub struct DexScreenerFetcher {
    client: DexScreenerClient,
    config: DexScreenerConfig,
}

impl DexScreenerFetcher {
    pub fn new(client: DexScreenerClient, config: DexScreenerConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl SourceFetcher for DexScreenerFetcher {
    fn name(&self) -> &str {
        "DexScreener"
    }

    async fn try_fetch(&self) -> Result<Vec<TokenRecord>, FeedError> {
        let pairs = self.client.search_pairs(&self.config.query).await?;
        let total = pairs.len();
        let fetched_at = Utc::now();

        let mut records: Vec<TokenRecord> = pairs
            .iter()
            .filter(|pair| json_str(&pair["chainId"]) == Some(self.config.chain_id.as_str()))
            .filter_map(|pair| parse_pair(pair, fetched_at))
            .filter(|record| record.created_at.is_some())
            .collect();

        records.sort_by_key(|r| Reverse(r.created_at));
        records.truncate(self.config.max_results);

        debug!(
            total = total,
            kept = records.len(),
            chain = self.config.chain_id,
            "DexScreener: filtered search results"
        );
        Ok(records)
    }
}
