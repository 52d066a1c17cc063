//! Risk assessment types produced by the scorer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorical risk bucket derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    VeryLow,
    Low,
    Moderate,
    High,
    Extreme,
}

impl RiskLevel {
    /// Human-readable label used in alerts.
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "VERY LOW RISK",
            RiskLevel::Low => "LOW RISK",
            RiskLevel::Moderate => "MEDIUM RISK",
            RiskLevel::High => "HIGH RISK",
            RiskLevel::Extreme => "VERY HIGH RISK",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "🟢",
            RiskLevel::Low => "🟢",
            RiskLevel::Moderate => "🟡",
            RiskLevel::High => "🟠",
            RiskLevel::Extreme => "🔴",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifies the scoring rule that produced a reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonTag {
    VeryLowLiquidity,
    LowLiquidity,
    DeepLiquidity,
    VeryNew,
    New,
    HighVolume,
    LowActivity,
}

impl ReasonTag {
    /// Whether this rule raises the score.
    pub fn is_positive(self) -> bool {
        matches!(self, ReasonTag::DeepLiquidity | ReasonTag::HighVolume)
    }
}

/// One triggered rule with its display message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub tag: ReasonTag,
    pub message: String,
}

impl Reason {
    pub fn new(tag: ReasonTag, message: impl Into<String>) -> Self {
        Self {
            tag,
            message: message.into(),
        }
    }
}

/// Result of scoring one token record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Safety score in [0, 100]; higher is safer
    pub score: u8,
    pub level: RiskLevel,
    /// Triggered rules in evaluation order
    pub reasons: Vec<Reason>,
}

impl RiskAssessment {
    pub fn new(score: u8, level: RiskLevel, reasons: Vec<Reason>) -> Self {
        Self {
            score: score.min(100),
            level,
            reasons,
        }
    }

    /// Reasons that raised the score.
    pub fn positives(&self) -> impl Iterator<Item = &Reason> {
        self.reasons.iter().filter(|r| r.tag.is_positive())
    }

    /// Reasons that lowered the score.
    pub fn risks(&self) -> impl Iterator<Item = &Reason> {
        self.reasons.iter().filter(|r| !r.tag.is_positive())
    }
}
