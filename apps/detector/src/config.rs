//! Application configuration.
//!
//! Sources, in increasing precedence: built-in defaults, an optional JSON
//! file, environment variables, CLI flags.

use launch_engine::{FilterConfig, ScoringPolicy};
use launch_feeds::{BIRDEYE_BASE_URL, DEXSCREENER_BASE_URL, RAYDIUM_BASE_URL, SHYFT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub telegram: TelegramSettings,
    pub sources: SourceSettings,
    pub poll: PollSettings,
    pub dedup: DedupSettings,
    pub cache: CacheSettings,
    pub performance: PerformanceSettings,
    pub filter: FilterConfig,
    pub scoring: ScoringPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    /// Without a token alerts go to the log.
    pub bot_token: Option<String>,
    /// Numeric chat id or `@channel` username.
    pub channel_id: String,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel_id: "@ClickShiftAlerts".to_string(),
        }
    }
}

/// Per-provider switches and endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub dexscreener_enabled: bool,
    pub dexscreener_url: String,
    pub dexscreener_query: String,
    pub raydium_enabled: bool,
    pub raydium_url: String,
    pub birdeye_enabled: bool,
    pub birdeye_url: String,
    pub birdeye_api_key: Option<String>,
    /// Shyft only runs when a key is set.
    pub shyft_enabled: bool,
    pub shyft_url: String,
    pub shyft_api_key: Option<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            dexscreener_enabled: true,
            dexscreener_url: DEXSCREENER_BASE_URL.to_string(),
            dexscreener_query: "USDC SOL".to_string(),
            raydium_enabled: true,
            raydium_url: RAYDIUM_BASE_URL.to_string(),
            birdeye_enabled: true,
            birdeye_url: BIRDEYE_BASE_URL.to_string(),
            birdeye_api_key: None,
            shyft_enabled: true,
            shyft_url: SHYFT_BASE_URL.to_string(),
            shyft_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_secs: u64,
    /// Pause after a failed or panicked iteration. Raised to
    /// `interval_secs` when shorter, so failures always back off.
    pub error_cooldown_secs: u64,
    pub request_timeout_secs: u64,
    pub stats_interval_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: 20,
            error_cooldown_secs: 60,
            request_timeout_secs: 10,
            stats_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupSettings {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            capacity: 50_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// No path disables the result cache.
    pub path: Option<PathBuf>,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            path: None,
            ttl_secs: 30 * 60,
        }
    }
}

/// One-time re-check of every alerted token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSettings {
    pub enabled: bool,
    pub follow_up_secs: u64,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            follow_up_secs: 60 * 60,
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with the JSON file at `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&text)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Blank values are ignored.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("TELEGRAM_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(channel) = get("CHANNEL_ID") {
            self.telegram.channel_id = channel;
        }
        if let Some(key) = get("SHYFT_API_KEY") {
            self.sources.shyft_api_key = Some(key);
        }
        if let Some(key) = get("BIRDEYE_API_KEY") {
            self.sources.birdeye_api_key = Some(key);
        }
        if let Some(value) = get("MIN_LIQUIDITY") {
            self.filter.min_liquidity_usd = parse_var("MIN_LIQUIDITY", &value)?;
        }
        if let Some(value) = get("SCAN_INTERVAL_SECS") {
            self.poll.interval_secs = parse_var("SCAN_INTERVAL_SECS", &value)?;
        }
        if let Some(path) = get("RESULT_CACHE_PATH") {
            self.cache.path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::Invalid("poll.interval_secs must be > 0".into()));
        }
        if self.poll.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll.request_timeout_secs must be > 0".into(),
            ));
        }
        if self.dedup.capacity == 0 {
            return Err(ConfigError::Invalid("dedup.capacity must be > 0".into()));
        }
        if !self.filter.min_liquidity_usd.is_finite() || self.filter.min_liquidity_usd < 0.0 {
            return Err(ConfigError::Invalid(
                "filter.min_liquidity_usd must be a non-negative number".into(),
            ));
        }
        self.scoring
            .levels
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// Shyft needs a key; without one it is skipped.
    pub fn shyft_key(&self) -> Option<&str> {
        if !self.sources.shyft_enabled {
            return None;
        }
        self.sources
            .shyft_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} has an invalid value: {:?}", key, value)))
}
