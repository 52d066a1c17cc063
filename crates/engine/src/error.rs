use crate::scorer::LevelThresholds;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Level thresholds must be strictly descending and at most 100: {0:?}")]
    Thresholds(LevelThresholds),
}

/// Errors from reading or writing the result cache file.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
