//! Heuristic risk scoring.
//!
//! Scoring is a pure function of the record: age is measured from the
//! record's own `fetched_at`, never from the wall clock, so the same record
//! always yields the same assessment.

use crate::error::PolicyError;
use chrono::Duration;
use launch_core::{Reason, ReasonTag, RiskAssessment, RiskLevel, TokenRecord};
use serde::{Deserialize, Serialize};

/// Minimum score for each level, checked from safest to riskiest.
/// Anything below `high` is [`RiskLevel::Extreme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    pub very_low: u8,
    pub low: u8,
    pub moderate: u8,
    pub high: u8,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            very_low: 90,
            low: 70,
            moderate: 50,
            high: 30,
        }
    }
}

impl LevelThresholds {
    /// Thresholds must be strictly descending and at most 100.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let ordered = self.very_low <= 100
            && self.very_low > self.low
            && self.low > self.moderate
            && self.moderate > self.high;
        if ordered {
            Ok(())
        } else {
            Err(PolicyError::Thresholds(*self))
        }
    }

    pub fn level_for(&self, score: u8) -> RiskLevel {
        if score >= self.very_low {
            RiskLevel::VeryLow
        } else if score >= self.low {
            RiskLevel::Low
        } else if score >= self.moderate {
            RiskLevel::Moderate
        } else if score >= self.high {
            RiskLevel::High
        } else {
            RiskLevel::Extreme
        }
    }
}

/// Every cutoff and weight the scorer uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub base_score: i32,

    /// Liquidity (USD) below this is very low
    pub very_low_liquidity_usd: f64,
    /// Liquidity (USD) below this is low
    pub low_liquidity_usd: f64,
    /// Liquidity (USD) above this is deep
    pub deep_liquidity_usd: f64,
    pub very_low_liquidity_delta: i32,
    pub low_liquidity_delta: i32,
    pub deep_liquidity_delta: i32,

    pub very_new_secs: i64,
    pub new_secs: i64,
    pub very_new_delta: i32,
    pub new_delta: i32,

    /// Volume/liquidity above this is high activity
    pub high_volume_ratio: f64,
    /// Volume/liquidity below this is low activity
    pub low_activity_ratio: f64,
    pub high_volume_delta: i32,
    pub low_activity_delta: i32,

    pub levels: LevelThresholds,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base_score: 50,
            very_low_liquidity_usd: 1_000.0,
            low_liquidity_usd: 5_000.0,
            deep_liquidity_usd: 20_000.0,
            very_low_liquidity_delta: -30,
            low_liquidity_delta: -15,
            deep_liquidity_delta: 20,
            very_new_secs: 3_600,
            new_secs: 7_200,
            very_new_delta: -20,
            new_delta: -10,
            high_volume_ratio: 2.0,
            low_activity_ratio: 0.1,
            high_volume_delta: 15,
            low_activity_delta: -15,
            levels: LevelThresholds::default(),
        }
    }
}

/// Stateless scorer over a fixed policy.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    policy: ScoringPolicy,
}

impl RiskScorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Apply the liquidity, age and activity rules in that order.
    ///
    /// The volume/liquidity rule needs a non-zero liquidity: a pool with no
    /// liquidity gets neither the high-volume bonus nor the low-activity
    /// penalty, even when it reports volume. Such records never pass the
    /// default [`CandidateFilter`](crate::CandidateFilter), so this only
    /// matters when the scorer is used on its own.
    ///
    /// Deltas saturate, so extreme policies still land in `[0, 100]`.
    pub fn score(&self, record: &TokenRecord) -> RiskAssessment {
        let p = &self.policy;
        let mut score: i32 = p.base_score;
        let mut reasons = Vec::new();

        let liquidity = record.liquidity_usd;
        if liquidity < p.very_low_liquidity_usd {
            score = score.saturating_add(p.very_low_liquidity_delta);
            reasons.push(Reason::new(
                ReasonTag::VeryLowLiquidity,
                "Very low liquidity - HIGH RISK",
            ));
        } else if liquidity < p.low_liquidity_usd {
            score = score.saturating_add(p.low_liquidity_delta);
            reasons.push(Reason::new(ReasonTag::LowLiquidity, "Low liquidity - Be careful"));
        } else if liquidity > p.deep_liquidity_usd {
            score = score.saturating_add(p.deep_liquidity_delta);
            reasons.push(Reason::new(ReasonTag::DeepLiquidity, "Good liquidity"));
        }

        // unknown age: rule skipped
        if let Some(age) = record.age() {
            if age < seconds(p.very_new_secs) {
                score = score.saturating_add(p.very_new_delta);
                reasons.push(Reason::new(ReasonTag::VeryNew, "Very new token (<1h)"));
            } else if age < seconds(p.new_secs) {
                score = score.saturating_add(p.new_delta);
                reasons.push(Reason::new(ReasonTag::New, "New token (<2h)"));
            }
        }

        // zero liquidity: rule skipped
        if let Some(ratio) = record.volume_liquidity_ratio() {
            if ratio > p.high_volume_ratio {
                score = score.saturating_add(p.high_volume_delta);
                reasons.push(Reason::new(ReasonTag::HighVolume, "High trading volume"));
            } else if ratio < p.low_activity_ratio {
                score = score.saturating_add(p.low_activity_delta);
                reasons.push(Reason::new(ReasonTag::LowActivity, "Low trading activity"));
            }
        }

        let score = score.clamp(0, 100) as u8;
        RiskAssessment::new(score, p.levels.level_for(score), reasons)
    }
}

/// Seconds as a chrono duration, saturating at the representable range.
pub(crate) fn seconds(secs: i64) -> Duration {
    Duration::try_seconds(secs).unwrap_or(if secs < 0 { Duration::MIN } else { Duration::MAX })
}
