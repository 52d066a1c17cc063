//! Normalized token snapshot shared by every data source.

use chrono::{DateTime, Duration, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Percentage price change over fixed windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    /// Change over the last 5 minutes (%)
    pub m5: f64,
    /// Change over the last hour (%)
    pub h1: f64,
    /// Change over the last 24 hours (%)
    pub h24: f64,
}

impl PriceChange {
    pub fn new(m5: f64, h1: f64, h24: f64) -> Self {
        Self {
            m5: finite_or_zero(m5),
            h1: finite_or_zero(h1),
            h24: finite_or_zero(h24),
        }
    }
}

/// One tradable token/pair snapshot taken at fetch time.
///
/// `address` is the identity key: two records with the same address describe
/// the same token regardless of which provider produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Chain-specific token address (mint on Solana)
    pub address: String,
    /// Ticker symbol (e.g., "BONK")
    pub symbol: CompactString,
    /// Display name
    pub name: String,
    /// Price in USD
    pub price_usd: f64,
    /// USD value locked in the pair's reserves
    pub liquidity_usd: f64,
    /// 24h traded volume in USD
    pub volume_24h_usd: f64,
    /// Market cap in USD, if the provider reports one
    pub market_cap_usd: Option<f64>,
    /// Pair creation time, if known
    pub created_at: Option<DateTime<Utc>>,
    /// Recent price changes
    pub price_change: PriceChange,
    /// When this snapshot was taken
    pub fetched_at: DateTime<Utc>,
    /// Pool / pair address on the DEX
    pub pair_address: Option<String>,
    /// DEX identifier (e.g., "raydium")
    pub dex_id: Option<String>,
}

impl TokenRecord {
    /// Create a record with only identity fields; market data defaults to zero.
    pub fn new(address: impl Into<String>, symbol: &str, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            symbol: CompactString::new(symbol),
            name: name.into(),
            price_usd: 0.0,
            liquidity_usd: 0.0,
            volume_24h_usd: 0.0,
            market_cap_usd: None,
            created_at: None,
            price_change: PriceChange::default(),
            fetched_at: Utc::now(),
            pair_address: None,
            dex_id: None,
        }
    }

    /// Set price, liquidity and 24h volume. Negative or non-finite values become 0.
    pub fn with_market(mut self, price_usd: f64, liquidity_usd: f64, volume_24h_usd: f64) -> Self {
        self.price_usd = non_negative(price_usd);
        self.liquidity_usd = non_negative(liquidity_usd);
        self.volume_24h_usd = non_negative(volume_24h_usd);
        self
    }

    /// Set market cap. Zero, negative or non-finite values are treated as unknown.
    pub fn with_market_cap(mut self, market_cap_usd: Option<f64>) -> Self {
        self.market_cap_usd = market_cap_usd.filter(|v| v.is_finite() && *v > 0.0);
        self
    }

    pub fn with_created_at(mut self, created_at: Option<DateTime<Utc>>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_price_change(mut self, price_change: PriceChange) -> Self {
        self.price_change = price_change;
        self
    }

    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    pub fn with_pair(mut self, pair_address: Option<String>, dex_id: Option<String>) -> Self {
        self.pair_address = pair_address.filter(|s| !s.is_empty());
        self.dex_id = dex_id.filter(|s| !s.is_empty());
        self
    }

    /// Age of the pair at fetch time. Clock skew never yields a negative age.
    pub fn age(&self) -> Option<Duration> {
        self.created_at
            .map(|created| (self.fetched_at - created).max(Duration::zero()))
    }

    /// 24h volume divided by liquidity, or None when liquidity is zero.
    pub fn volume_liquidity_ratio(&self) -> Option<f64> {
        if self.liquidity_usd > 0.0 {
            Some(self.volume_24h_usd / self.liquidity_usd)
        } else {
            None
        }
    }

    /// Fill market fields this record lacks from a richer snapshot of the same token.
    /// Identity (address) is never changed.
    pub fn merge_market_data(mut self, other: &TokenRecord) -> Self {
        if self.symbol.is_empty() {
            self.symbol = other.symbol.clone();
        }
        if self.name.is_empty() {
            self.name = other.name.clone();
        }
        if self.price_usd == 0.0 {
            self.price_usd = other.price_usd;
        }
        if self.liquidity_usd == 0.0 {
            self.liquidity_usd = other.liquidity_usd;
        }
        if self.volume_24h_usd == 0.0 {
            self.volume_24h_usd = other.volume_24h_usd;
        }
        self.market_cap_usd = self.market_cap_usd.or(other.market_cap_usd);
        self.created_at = self.created_at.or(other.created_at);
        if self.price_change == PriceChange::default() {
            self.price_change = other.price_change;
        }
        self.pair_address = self.pair_address.or_else(|| other.pair_address.clone());
        self.dex_id = self.dex_id.or_else(|| other.dex_id.clone());
        self
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
