//! On-disk cache of recent alert results.
//!
//! The file is one JSON object keyed by token address. Entries expire after
//! the TTL; expired entries are dropped on load, on lookup and on flush.

use crate::error::CacheError;
use chrono::{DateTime, Utc};
use launch_core::{RiskAssessment, TokenRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    /// Insert time, unix milliseconds
    pub timestamp: i64,
    pub source: String,
    pub record: TokenRecord,
    pub assessment: RiskAssessment,
}

#[derive(Debug)]
pub struct ResultCache {
    path: PathBuf,
    ttl: Duration,
    entries: HashMap<String, CachedResult>,
    dirty: bool,
}

impl ResultCache {
    /// Empty cache that will be written to `path` on flush.
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
            entries: HashMap::new(),
            dirty: false,
        }
    }

    /// Read the cache file. A missing file gives an empty cache, and so does
    /// a file that does not parse (after a warning). Other I/O errors fail.
    pub async fn load(path: impl Into<PathBuf>, ttl: Duration) -> Result<Self, CacheError> {
        let mut cache = Self::new(path, ttl);

        let bytes = match tokio::fs::read(&cache.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %cache.path.display(), "No result cache file yet");
                return Ok(cache);
            }
            Err(e) => return Err(io_error(&cache.path, e)),
        };

        match serde_json::from_slice::<HashMap<String, CachedResult>>(&bytes) {
            Ok(entries) => {
                let total = entries.len();
                cache.entries = entries;
                let expired = cache.prune_expired_at(Utc::now());
                info!(
                    path = %cache.path.display(),
                    loaded = cache.entries.len(),
                    expired,
                    total,
                    "Loaded result cache"
                );
            }
            Err(e) => {
                warn!(path = %cache.path.display(), error = %e, "Result cache is corrupt, starting empty");
                cache.dirty = true;
            }
        }
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Look up an unexpired entry. An expired entry is removed.
    pub fn get(&mut self, address: &str) -> Option<&CachedResult> {
        self.get_at(address, Utc::now())
    }

    pub fn get_at(&mut self, address: &str, now: DateTime<Utc>) -> Option<&CachedResult> {
        let expired = self
            .entries
            .get(address)
            .is_some_and(|entry| self.is_expired(entry, now));
        if expired {
            self.entries.remove(address);
            self.dirty = true;
            return None;
        }
        self.entries.get(address)
    }

    pub fn insert(&mut self, source: &str, record: &TokenRecord, assessment: &RiskAssessment) {
        self.insert_at(source, record, assessment, Utc::now());
    }

    pub fn insert_at(
        &mut self,
        source: &str,
        record: &TokenRecord,
        assessment: &RiskAssessment,
        now: DateTime<Utc>,
    ) {
        self.entries.insert(
            record.address.clone(),
            CachedResult {
                timestamp: now.timestamp_millis(),
                source: source.to_string(),
                record: record.clone(),
                assessment: assessment.clone(),
            },
        );
        self.dirty = true;
    }

    /// Addresses of every unexpired entry.
    pub fn live_addresses(&self) -> Vec<String> {
        let now = Utc::now();
        self.entries
            .iter()
            .filter(|(_, entry)| !self.is_expired(entry, now))
            .map(|(address, _)| address.clone())
            .collect()
    }

    pub fn prune_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let ttl_ms = self.ttl_ms();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.timestamp_millis() - entry.timestamp < ttl_ms);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Write the cache if anything changed since the last flush.
    /// The file is replaced atomically via a temp file and rename.
    /// Returns whether a write happened.
    pub async fn flush(&mut self) -> Result<bool, CacheError> {
        if !self.dirty {
            return Ok(false);
        }
        self.prune_expired_at(Utc::now());

        let json = serde_json::to_vec_pretty(&self.entries)?;
        let tmp = self.tmp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;

        self.dirty = false;
        debug!(path = %self.path.display(), entries = self.entries.len(), "Flushed result cache");
        Ok(true)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "results.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    fn is_expired(&self, entry: &CachedResult, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() - entry.timestamp >= self.ttl_ms()
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}
