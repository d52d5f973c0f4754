//! Configuration loading from sendbox.toml.

use policy::Policy;
use runtime::DEFAULT_HISTORY_LIMIT;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Capture rules (allow/deny).
    #[serde(default)]
    pub policy: Policy,

    /// Message history store.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct HistoryConfig {
    /// Database path. Defaults to `messages.db` in the data directory.
    pub database: Option<PathBuf>,

    /// Records returned when a query does not pass a limit.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            database: None,
            default_limit: default_limit(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::{DEFAULT_PACKAGES, SourceRequest};

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.policy.allow.packages, DEFAULT_PACKAGES);
        assert!(config.history.database.is_none());
        assert_eq!(config.history.default_limit, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parses_all_sections() {
        let config = Config::parse(
            r#"
            [policy.allow]
            packages = ["com.whatsapp"]

            [policy.deny]
            senders = ["1588-0000"]

            [history]
            database = "/tmp/sms.db"
            default_limit = 20

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert!(config.policy.check(&SourceRequest::notification("com.whatsapp")).is_allowed());
        assert!(!config.policy.check(&SourceRequest::sms("15880000")).is_allowed());
        assert_eq!(config.history.database, Some(PathBuf::from("/tmp/sms.db")));
        assert_eq!(config.history.default_limit, 20);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = Config::parse("[history\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
