//! # Configuration Errors
//!
//! Loading is the only fallible operation in this crate, so a single error
//! type covers it.

use std::path::PathBuf;

/// Errors raised while loading or validating a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be opened or read.
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or lacks a required key such as `port`.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The file parsed but a value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
