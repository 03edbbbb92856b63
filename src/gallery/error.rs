use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub(super) enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub(super) enum AssetError {
    #[error("font {path} failed to load: {reason}")]
    Font { path: String, reason: String },
    #[error("model {path} failed to load: {reason}")]
    Model { path: String, reason: String },
}
