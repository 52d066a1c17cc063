//! Quality gate applied before a record is claimed.

use crate::scorer::seconds;
use chrono::Duration;
use launch_core::TokenRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub min_liquidity_usd: f64,
    /// Reject records whose price is 0 (missing)
    pub require_price: bool,
    pub min_symbol_len: usize,
    pub max_symbol_len: usize,
    /// Only applied when the market cap is known
    pub max_market_cap_usd: f64,
    /// Only applied when the creation time is known
    pub max_age_secs: i64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_liquidity_usd: 100.0,
            require_price: true,
            min_symbol_len: 2,
            max_symbol_len: 10,
            max_market_cap_usd: 10_000_000.0,
            max_age_secs: 2 * 60 * 60,
        }
    }
}

/// Why a record did not pass the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    LowLiquidity(f64),
    NoPrice,
    SymbolLength(usize),
    MarketCapTooLarge(f64),
    TooOld(Duration),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::LowLiquidity(usd) => write!(f, "liquidity ${:.0} below minimum", usd),
            RejectReason::NoPrice => write!(f, "no price"),
            RejectReason::SymbolLength(len) => write!(f, "symbol length {}", len),
            RejectReason::MarketCapTooLarge(usd) => write!(f, "market cap ${:.0} too large", usd),
            RejectReason::TooOld(age) => write!(f, "{} minutes old", age.num_minutes()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    config: FilterConfig,
}

impl CandidateFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Checks run cheapest first; the first failing check is reported.
    pub fn check(&self, record: &TokenRecord) -> Result<(), RejectReason> {
        let c = &self.config;

        if record.liquidity_usd < c.min_liquidity_usd {
            return Err(RejectReason::LowLiquidity(record.liquidity_usd));
        }
        if c.require_price && record.price_usd <= 0.0 {
            return Err(RejectReason::NoPrice);
        }

        let symbol_len = record.symbol.chars().count();
        if symbol_len < c.min_symbol_len || symbol_len > c.max_symbol_len {
            return Err(RejectReason::SymbolLength(symbol_len));
        }

        if let Some(market_cap) = record.market_cap_usd {
            if market_cap > c.max_market_cap_usd {
                return Err(RejectReason::MarketCapTooLarge(market_cap));
            }
        }
        if let Some(age) = record.age() {
            if age > seconds(c.max_age_secs) {
                return Err(RejectReason::TooOld(age));
            }
        }
        Ok(())
    }

    pub fn accepts(&self, record: &TokenRecord) -> bool {
        self.check(record).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn good() -> TokenRecord {
        let now = Utc::now();
        TokenRecord::new("Mint111", "BONK", "Bonk")
            .with_market(0.0001, 15_000.0, 40_000.0)
            .with_market_cap(Some(250_000.0))
            .with_created_at(Some(now - Duration::minutes(20)))
            .with_fetched_at(now)
    }

    #[test]
    fn test_accepts_fresh_liquid_token() {
        assert_eq!(CandidateFilter::default().check(&good()), Ok(()));
    }

    #[test]
    fn test_rejects_low_liquidity() {
        let record = good().with_market(0.0001, 99.0, 40_000.0);
        assert_eq!(
            CandidateFilter::default().check(&record),
            Err(RejectReason::LowLiquidity(99.0))
        );
    }

    #[test]
    fn test_rejects_missing_price_unless_disabled() {
        let record = good().with_market(0.0, 15_000.0, 40_000.0);
        assert_eq!(CandidateFilter::default().check(&record), Err(RejectReason::NoPrice));

        let lenient = CandidateFilter::new(FilterConfig {
            require_price: false,
            ..Default::default()
        });
        assert!(lenient.accepts(&record));
    }

    #[test]
    fn test_rejects_symbol_length() {
        let filter = CandidateFilter::default();

        let mut short = good();
        short.symbol = "X".into();
        assert_eq!(filter.check(&short), Err(RejectReason::SymbolLength(1)));

        let mut long = good();
        long.symbol = "SUPERLONGTICKER".into();
        assert_eq!(filter.check(&long), Err(RejectReason::SymbolLength(15)));
    }

    #[test]
    fn test_rejects_large_market_cap_only_when_known() {
        let filter = CandidateFilter::default();
        let big = good().with_market_cap(Some(50_000_000.0));
        assert!(matches!(filter.check(&big), Err(RejectReason::MarketCapTooLarge(_))));

        let unknown = good().with_market_cap(None);
        assert!(filter.accepts(&unknown));
    }

    #[test]
    fn test_rejects_old_token_only_when_age_known() {
        let filter = CandidateFilter::default();
        let now = Utc::now();
        let old = good()
            .with_created_at(Some(now - Duration::hours(3)))
            .with_fetched_at(now);
        assert!(matches!(filter.check(&old), Err(RejectReason::TooOld(_))));

        let undated = good().with_created_at(None);
        assert!(filter.accepts(&undated));
    }

    #[test]
    fn test_out_of_range_max_age_saturates() {
        let now = Utc::now();
        let ancient = good()
            .with_created_at(Some(now - Duration::days(3650)))
            .with_fetched_at(now);

        let unbounded = CandidateFilter::new(FilterConfig {
            max_age_secs: i64::MAX,
            ..Default::default()
        });
        assert!(unbounded.accepts(&ancient));

        let nothing_dated = CandidateFilter::new(FilterConfig {
            max_age_secs: i64::MIN,
            ..Default::default()
        });
        assert!(matches!(nothing_dated.check(&good()), Err(RejectReason::TooOld(_))));
    }

    #[test]
    fn test_reject_reason_display() {
        assert_eq!(
            RejectReason::LowLiquidity(42.4).to_string(),
            "liquidity $42 below minimum"
        );
        assert_eq!(RejectReason::TooOld(Duration::minutes(150)).to_string(), "150 minutes old");
    }
}
