//! # Service Configuration
//!
//! Purpose: Load the JSON configuration shared by the event server and its
//! clients. Only `port` is required; the server's own keys (`driver`,
//! `options`, ...) are ignored here.
//!
//! ## Example
//!
//! ```text
//! {
//!     "port": 11666,
//!     "driver": "uno",
//!     "rate": 1000,
//!     "num": 10000,
//!     "ack_timeout_ms": 500
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// Default file name looked up by the command-line client.
pub const DEFAULT_CONFIG_FILE: &str = "service.cfg";

/// Client-relevant view of the service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Port the server listens on.
    pub port: u16,
    /// Commands per second for paced runs.
    #[serde(default)]
    pub rate: Option<u32>,
    /// Number of commands for paced runs.
    #[serde(default)]
    pub num: Option<usize>,
    /// Upper bound on waiting for an acknowledgment. Absent means block.
    #[serde(default)]
    pub ack_timeout_ms: Option<u64>,
    /// Upper bound on establishing a stream connection.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
}

impl ServiceConfig {
    /// Builds a config for `port` with every optional key unset.
    pub fn with_port(port: u16) -> Self {
        ServiceConfig {
            port,
            rate: None,
            num: None,
            ack_timeout_ms: None,
            connect_timeout_ms: None,
        }
    }

    /// Reads and validates the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parses and validates a configuration from JSON text.
    pub fn from_json(raw: &str) -> ConfigResult<Self> {
        let config: ServiceConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }
        if self.rate == Some(0) {
            return Err(ConfigError::Invalid("rate must be non-zero".to_string()));
        }
        // Socket timeouts of zero are rejected by the OS.
        if self.ack_timeout_ms == Some(0) || self.connect_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn ack_timeout(&self) -> Option<Duration> {
        self.ack_timeout_ms.map(Duration::from_millis)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_port_only() {
        let config = ServiceConfig::from_json(r#"{"port": 9999}"#).unwrap();
        assert_eq!(config, ServiceConfig::with_port(9999));
    }

    #[test]
    fn ignores_server_keys() {
        let raw = r#"{"port": 11666, "driver": "uno", "options": {"port": "/dev/ttyACM0"}}"#;
        let config = ServiceConfig::from_json(raw).unwrap();
        assert_eq!(config.port, 11666);
    }

    #[test]
    fn reads_optional_keys() {
        let raw = r#"{"port": 1, "rate": 100, "num": 5, "ack_timeout_ms": 250}"#;
        let config = ServiceConfig::from_json(raw).unwrap();
        assert_eq!(config.rate, Some(100));
        assert_eq!(config.num, Some(5));
        assert_eq!(config.ack_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.connect_timeout(), None);
    }

    #[test]
    fn missing_port_is_parse_error() {
        let err = ServiceConfig::from_json(r#"{"driver": "uno"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = ServiceConfig::from_json("{port: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_values_are_rejected() {
        assert!(matches!(
            ServiceConfig::from_json(r#"{"port": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ServiceConfig::from_json(r#"{"port": 1, "rate": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ServiceConfig::from_json(r#"{"port": 1, "ack_timeout_ms": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 9999}}"#).unwrap();
        let config = ServiceConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 9999);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServiceConfig::load(dir.path().join("absent.cfg")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
