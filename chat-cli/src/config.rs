//! Configuration loading for peerchat.
//!
//! Configuration is loaded from a TOML file (default: `peerchat.toml`).
//! Every section and field is optional; a missing file means all defaults.

use peerchat_client::ChatConfig;
use peerchat_core::{HistoryFormat, RetryPolicy, DEFAULT_ATTEMPTS, DEFAULT_DELAY};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for peerchat.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session configuration.
    pub session: SessionConfig,
    /// History file configuration.
    pub history: HistoryConfig,
    /// Discovery retry configuration.
    pub discovery: DiscoveryConfig,
}

/// Session configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// Identity to use when `--name` is not given.
    pub identity: Option<String>,
}

/// History file configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryConfig {
    /// History file path (default: `<data-dir>/<identity>_history.<ext>`).
    pub path: Option<PathBuf>,
    /// File layout, `json` or `flat` (default: json).
    #[serde(default)]
    pub format: HistoryFormat,
}

/// Discovery retry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Total attempts per discovery (default: 3).
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Delay between failed attempts in milliseconds (default: 2000).
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

// Default value functions
fn default_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}

fn default_delay_ms() -> u64 {
    DEFAULT_DELAY.as_millis() as u64
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Like [`from_file`](Self::from_file), but a missing file yields defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Pick the identity: explicit name first, then the config file.
    pub fn identity(&self, name: Option<&str>) -> Option<String> {
        name.map(str::to_string)
            .or_else(|| self.session.identity.clone())
            .filter(|id| !id.is_empty())
    }

    /// Build the library config for `identity`.
    pub fn chat_config(&self, identity: &str, data_dir: &Path) -> ChatConfig {
        let path = self
            .history
            .path
            .clone()
            .unwrap_or_else(|| default_history_path(data_dir, identity, self.history.format));

        ChatConfig::new(identity, path)
            .with_format(self.history.format)
            .with_retry(self.retry_policy())
    }

    /// Discovery retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.discovery.attempts,
            Duration::from_millis(self.discovery.delay_ms),
        )
    }
}

/// Where `identity`'s history lives when the config doesn't say.
pub fn default_history_path(data_dir: &Path, identity: &str, format: HistoryFormat) -> PathBuf {
    let ext = match format {
        HistoryFormat::Json => "json",
        HistoryFormat::Flat => "txt",
    };
    data_dir.join(format!("{}_history.{}", identity, ext))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
