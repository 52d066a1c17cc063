//! Follow-up on alerted tokens.
//!
//! Every delivered alert schedules one re-check through the DexScreener token
//! lookup after a delay (an hour by default). The outcome feeds the pumped,
//! rugged and best-performer counters in [`DetectorStats`].

use crate::stats::DetectorStats;
use launch_alerts::{DeliveryError, DispatchObserver};
use launch_core::{RiskAssessment, TokenRecord};
use launch_feeds::DexScreenerClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_FOLLOW_UP_DELAY: Duration = Duration::from_secs(60 * 60);

/// Return above this percentage counts as a pump.
const PUMP_RETURN_PCT: f64 = 100.0;
/// Liquidity below this share of the alert-time value counts as a rug.
const RUG_LIQUIDITY_SHARE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct Performer {
    pub symbol: String,
    pub address: String,
    pub return_pct: f64,
}

/// Outcome of one follow-up check.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUp {
    pub symbol: String,
    pub address: String,
    /// None when the alert-time price was unknown.
    pub return_pct: Option<f64>,
    pub pumped: bool,
    pub rugged: bool,
}

impl FollowUp {
    pub fn evaluate(alerted: &TokenRecord, current: &TokenRecord) -> Self {
        let return_pct = (alerted.price_usd > 0.0)
            .then(|| (current.price_usd - alerted.price_usd) / alerted.price_usd * 100.0);

        Self {
            symbol: alerted.symbol.to_string(),
            address: alerted.address.clone(),
            return_pct,
            pumped: return_pct.is_some_and(|pct| pct > PUMP_RETURN_PCT),
            rugged: current.liquidity_usd < alerted.liquidity_usd * RUG_LIQUIDITY_SHARE,
        }
    }
}

/// Dispatch observer that schedules a follow-up for each delivered alert.
#[derive(Clone)]
pub struct PerformanceTracker {
    lookup: DexScreenerClient,
    stats: Arc<DetectorStats>,
    delay: Duration,
}

impl PerformanceTracker {
    pub fn new(lookup: DexScreenerClient, stats: Arc<DetectorStats>) -> Self {
        Self {
            lookup,
            stats,
            delay: DEFAULT_FOLLOW_UP_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Look the token up now and record the outcome. Lookup failures and
    /// tokens DexScreener no longer lists are logged and not counted.
    pub async fn check(&self, alerted: &TokenRecord) -> Option<FollowUp> {
        let current = match self.lookup.lookup_token(&alerted.address).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                debug!(address = %alerted.address, "Follow-up: token no longer listed");
                return None;
            }
            Err(e) => {
                warn!(address = %alerted.address, error = %e, "Follow-up lookup failed");
                return None;
            }
        };

        let follow_up = FollowUp::evaluate(alerted, &current);
        info!(
            symbol = %follow_up.symbol,
            address = %follow_up.address,
            return_pct = ?follow_up.return_pct.map(|pct| format!("{:+.1}", pct)),
            pumped = follow_up.pumped,
            rugged = follow_up.rugged,
            "📊 Follow-up"
        );
        self.stats.record_follow_up(&follow_up);
        Some(follow_up)
    }
}

impl DispatchObserver for PerformanceTracker {
    fn on_delivered(&self, record: &TokenRecord, _assessment: &RiskAssessment, _source: &str) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(address = %record.address, "No runtime, follow-up skipped");
            return;
        };

        let tracker = self.clone();
        let alerted = record.clone();
        runtime.spawn(async move {
            tokio::time::sleep(tracker.delay).await;
            tracker.check(&alerted).await;
        });
    }

    fn on_failed(&self, _record: &TokenRecord, _source: &str, _error: &DeliveryError) {}
}
