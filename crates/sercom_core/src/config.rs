//! # Bridge Configuration
//!
//! Loaded once at startup from TOML.
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! response_timeout_ms = 50
//! drain_timeout_ms = 20
//! producer_thread = "sercom-producer"
//! producer_stack_size = 65536
//! ```
//!
//! Every key is optional; missing keys take the defaults above.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{SercomError, SercomResult};

/// Link speed used by the peer firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default `T1`: time allowed for a complete response.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 50;

/// Default `T2`: time allowed per drained byte.
pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 20;

/// Bridge configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Serial port path (e.g., /dev/ttyUSB0).
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Timeout for the full response, in milliseconds (`T1`).
    pub response_timeout_ms: u64,
    /// Timeout for each drained byte, in milliseconds (`T2`).
    pub drain_timeout_ms: u64,
    /// Name of the producer thread.
    pub producer_thread: String,
    /// Stack size of the producer thread in bytes.
    pub producer_stack_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: String::from("/dev/ttyUSB0"),
            baud_rate: DEFAULT_BAUD_RATE,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT_MS,
            producer_thread: String::from("sercom-producer"),
            producer_stack_size: 64 * 1024,
        }
    }
}

impl BridgeConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SercomError::InvalidConfig`] on malformed TOML, unknown keys
    /// or out-of-range values.
    pub fn from_toml_str(source: &str) -> SercomResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| SercomError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SercomError::InvalidConfig`] if the file cannot be read or
    /// does not hold a valid configuration.
    pub fn load(path: impl AsRef<Path>) -> SercomResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            SercomError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SercomError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> SercomResult<()> {
        if self.baud_rate == 0 {
            return Err(SercomError::InvalidConfig("baud_rate must be non-zero".into()));
        }
        if self.response_timeout_ms == 0 {
            return Err(SercomError::InvalidConfig(
                "response_timeout_ms must be non-zero".into(),
            ));
        }
        if self.drain_timeout_ms == 0 {
            return Err(SercomError::InvalidConfig(
                "drain_timeout_ms must be non-zero".into(),
            ));
        }
        if self.producer_thread.is_empty() {
            return Err(SercomError::InvalidConfig(
                "producer_thread must not be empty".into(),
            ));
        }
        if self.producer_stack_size == 0 {
            return Err(SercomError::InvalidConfig(
                "producer_stack_size must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// `T1` as a duration.
    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// `T2` as a duration.
    #[must_use]
    pub const fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.response_timeout(), Duration::from_millis(50));
        assert_eq!(config.drain_timeout(), Duration::from_millis(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BridgeConfig::from_toml_str(
            r#"
            port = "/dev/ttyACM0"
            drain_timeout_ms = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.drain_timeout_ms, 5);
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.response_timeout_ms, DEFAULT_RESPONSE_TIMEOUT_MS);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = BridgeConfig::from_toml_str("retries = 3").unwrap_err();
        assert!(matches!(err, SercomError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = BridgeConfig::from_toml_str("response_timeout_ms = 0").unwrap_err();
        assert!(err.to_string().contains("response_timeout_ms"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = BridgeConfig::load("/nonexistent/sercom.toml").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
