//! Configuration management for the mailvet CLI
//!
//! Server location, data directory and timing settings. Values come from
//! defaults, then environment variables, then command-line flags.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// CLI Configuration Constants
// ============================================================================

/// Default verification service URL.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Default per-request timeout for snapshot, listing and statistics calls.
/// The streaming submission only carries a connect timeout.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Fixed delay between two status fetches of the poll loop.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// An activity line is emitted for every Nth streamed result.
pub const DEFAULT_LOG_EVERY: u64 = 5;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Verification service URL
    pub server_url: String,

    /// Directory holding the batch name directory
    pub data_dir: PathBuf,

    /// Timeout for non-streaming requests
    #[serde(with = "secs")]
    pub request_timeout: Duration,

    /// Delay between status polls
    #[serde(with = "secs")]
    pub poll_interval: Duration,

    /// Activity line cadence while streaming
    pub log_every: u64,
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

impl Config {
    /// Create a new config with default values
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| CliError::config("Could not determine data directory"))?
            .join("mailvet");

        Ok(Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            data_dir,
            request_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            log_every: DEFAULT_LOG_EVERY,
        })
    }

    /// Load config from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MAILVET_SERVER_URL") {
            config.server_url = url;
        }

        if let Ok(dir) = std::env::var("MAILVET_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(secs) = env_secs("MAILVET_API_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(secs) = env_secs("MAILVET_POLL_INTERVAL_SECS")? {
            config.poll_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, server_url: Option<String>, data_dir: Option<PathBuf>) -> Self {
        if let Some(url) = server_url {
            self.server_url = url;
        }
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    /// Get the server URL without a trailing slash
    pub fn server_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }
}

fn env_secs(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| {
                CliError::config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    key, raw
                ))
            }),
        Err(_) => Ok(None),
    }
}

impl Default for Config {
    fn default() -> Self {
        // Fall back to a local directory when the platform has no data dir
        Self::new().unwrap_or_else(|_| Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            data_dir: PathBuf::from(".mailvet"),
            request_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            log_every: DEFAULT_LOG_EVERY,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.server_url(), DEFAULT_SERVER_URL);
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.log_every, 5);
        assert!(config.data_dir.to_string_lossy().contains("mailvet"));
    }

    // Env-driven parsing is exercised in one test so parallel tests never
    // race on the same variables.
    #[test]
    fn test_config_from_env() {
        std::env::set_var("MAILVET_SERVER_URL", "http://verifier.test/");
        std::env::set_var("MAILVET_DATA_DIR", "/tmp/mailvet-test");
        std::env::set_var("MAILVET_POLL_INTERVAL_SECS", "7");

        let config = Config::from_env().unwrap();
        assert_eq!(config.server_url(), "http://verifier.test");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/mailvet-test"));
        assert_eq!(config.poll_interval, Duration::from_secs(7));

        std::env::set_var("MAILVET_POLL_INTERVAL_SECS", "soon");
        assert!(matches!(Config::from_env(), Err(CliError::Config(_))));

        std::env::remove_var("MAILVET_SERVER_URL");
        std::env::remove_var("MAILVET_DATA_DIR");
        std::env::remove_var("MAILVET_POLL_INTERVAL_SECS");
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = Config::default()
            .with_overrides(Some("http://other:9000".to_string()), Some(PathBuf::from("/x")));
        assert_eq!(config.server_url(), "http://other:9000");
        assert_eq!(config.data_dir(), &PathBuf::from("/x"));
    }
}
