//! Configuration for regdesk.

use crate::poller::PollConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Console configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Base URL of the registration backend.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Payment-status polling settings.
    #[serde(default)]
    pub poll: PollSettings,

    /// Path of the credentials file (token + role). Defaults to the
    /// platform data directory when unset.
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,

    /// Capacity of the confirmed-payment id cache.
    #[serde(default = "default_cache_capacity")]
    pub confirmed_cache_capacity: usize,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Payment-status polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    /// Delay between verification attempts, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Total attempt budget per poll session.
    #[serde(default = "default_poll_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout(),
            poll: PollSettings::default(),
            credentials_path: None,
            confirmed_cache_capacity: default_cache_capacity(),
            log_level: default_log_level(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_attempts: default_poll_max_attempts(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:3300".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_poll_interval_ms() -> u64 {
    3000
}

const fn default_poll_max_attempts() -> u32 {
    10
}

const fn default_cache_capacity() -> usize {
    1024
}

impl ConsoleConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Poll configuration derived from the settings.
    #[must_use]
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll.interval_ms),
            max_attempts: self.poll.max_attempts,
        }
    }

    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.backend_url, "http://localhost:3300");
        assert_eq!(config.poll.interval_ms, 3000);
        assert_eq!(config.poll.max_attempts, 10);
        assert!(config.credentials_path.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ConsoleConfig =
            toml::from_str("backend_url = \"https://backend.example\"").expect("should parse");
        assert_eq!(config.backend_url, "https://backend.example");
        assert_eq!(config.poll.max_attempts, 10);
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().expect("should create tempdir");
        let path = dir.path().join("config.toml");

        let mut config = ConsoleConfig::default();
        config.poll.max_attempts = 15;
        config.to_file(&path).expect("should write");

        let loaded = ConsoleConfig::from_file(&path).expect("should load");
        assert_eq!(loaded.poll.max_attempts, 15);
        assert_eq!(loaded.backend_url, config.backend_url);
    }

    #[test]
    fn test_poll_config_conversion() {
        let config = ConsoleConfig::default();
        let poll = config.poll_config();
        assert_eq!(poll.interval, Duration::from_millis(3000));
        assert_eq!(poll.max_attempts, 10);
    }
}
