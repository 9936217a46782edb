//! Runtime configuration loading.
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Config file (optional): `keygate.toml`
//! 3. Environment variables: `KEYGATE_*`
//!
//! Every table and field is optional in the file; anything missing keeps
//! its default.
//!
//! # Example Config
//!
//! ```toml
//! [storage]
//! dir = "/var/lib/keygate"
//!
//! [poll]
//! status_interval_ms = 2000
//!
//! [access]
//! bypass_code = "1234"   # development only
//! ```
//!
//! Product settings (display name, destination URL, admin credential) are
//! not part of this file; they live in the persisted `settings` record.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Length of one period in seconds.
pub const CYCLE_SECS: u32 = 30;

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION STRUCTURES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeygateConfig {
    pub storage: StorageConfig,
    pub poll: PollConfig,
    pub feed: FeedConfig,
    pub outcome: OutcomeConfig,
    pub access: AccessConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON document per store key.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollConfig {
    pub status_interval_ms: u64,
    pub feed_interval_ms: u64,
    /// Consecutive failed polls tolerated before a loop gives up.
    pub max_errors: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeedConfig {
    /// Seconds at the start of each period during which no outcome is shown.
    pub analysis_window_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutcomeConfig {
    pub salt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AccessConfig {
    /// Login override code. Absent unless explicitly configured.
    pub bypass_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// DEFAULT IMPLEMENTATIONS
// ═══════════════════════════════════════════════════════════════════════════

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".keygate/data"),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            status_interval_ms: 2000,
            feed_interval_ms: 1000,
            max_errors: 10,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            analysis_window_secs: 5,
        }
    }
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            salt: "BOSS_VIP_SECRET_SALT".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PollConfig {
    #[must_use]
    pub const fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    #[must_use]
    pub const fn feed_interval(&self) -> Duration {
        Duration::from_millis(self.feed_interval_ms)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PUBLIC API
// ═══════════════════════════════════════════════════════════════════════════

/// Load configuration from defaults, an optional TOML file and the process
/// environment.
///
/// # Errors
///
/// Returns error if:
/// - The config file exists but cannot be read
/// - The config file is malformed TOML
/// - An environment override has an unparsable value
/// - Config values fail validation
pub fn load_config(path: Option<&Path>) -> Result<KeygateConfig> {
    let mut config = match path {
        Some(p) if p.exists() => load_toml_file(p)?,
        _ => KeygateConfig::default(),
    };

    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;

    tracing::debug!(?config, "Configuration loaded");
    Ok(config)
}

impl KeygateConfig {
    /// Apply `KEYGATE_*` overrides supplied by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns error if a numeric override cannot be parsed.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("KEYGATE_STORAGE_DIR") {
            self.storage.dir = PathBuf::from(dir);
        }
        if let Some(ms) = lookup("KEYGATE_STATUS_INTERVAL_MS") {
            self.poll.status_interval_ms = parse_env("KEYGATE_STATUS_INTERVAL_MS", &ms)?;
        }
        if let Some(ms) = lookup("KEYGATE_FEED_INTERVAL_MS") {
            self.poll.feed_interval_ms = parse_env("KEYGATE_FEED_INTERVAL_MS", &ms)?;
        }
        if let Some(code) = lookup("KEYGATE_BYPASS_CODE") {
            self.access.bypass_code = Some(code).filter(|c| !c.is_empty());
        }
        if let Some(level) = lookup("KEYGATE_LOG") {
            self.log.level = level;
        }
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for zero intervals, an analysis window that
    /// swallows the whole period, an empty salt, or a blank bypass code.
    pub fn validate(&self) -> Result<()> {
        if self.poll.status_interval_ms == 0 || self.poll.feed_interval_ms == 0 {
            return Err(Error::invalid_config("poll intervals must be non-zero"));
        }
        if self.feed.analysis_window_secs >= CYCLE_SECS {
            return Err(Error::invalid_config(format!(
                "analysis window must be shorter than the {CYCLE_SECS}s period"
            )));
        }
        if self.outcome.salt.is_empty() {
            return Err(Error::invalid_config("outcome salt must not be empty"));
        }
        if self
            .access
            .bypass_code
            .as_deref()
            .is_some_and(|code| code.trim().is_empty())
        {
            return Err(Error::invalid_config("bypass code must not be blank"));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════

/// Load a TOML file into a Config
///
/// # Errors
///
/// Returns error if:
/// - File cannot be read
/// - TOML is malformed
fn load_toml_file(path: &Path) -> Result<KeygateConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::file_read_failed(path, e.to_string()))?;

    toml::from_str(&content)
        .map_err(|e| Error::toml_parse_failed(format!("{}: {e}", path.display())))
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_config(format!("{key}={value} is not a valid number")))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = KeygateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll.status_interval(), Duration::from_secs(2));
        assert_eq!(config.poll.feed_interval(), Duration::from_secs(1));
        assert!(config.access.bypass_code.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[poll]\nstatus_interval_ms = 500\n\n[access]\nbypass_code = \"1234\"")?;

        let config = load_toml_file(file.path())?;
        assert_eq!(config.poll.status_interval_ms, 500);
        assert_eq!(config.poll.feed_interval_ms, 1000);
        assert_eq!(config.access.bypass_code.as_deref(), Some("1234"));
        assert_eq!(config.feed.analysis_window_secs, 5);
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_parse_error() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[poll\nstatus_interval_ms = ")?;

        let result = load_toml_file(file.path());
        assert!(matches!(result, Err(Error::TomlParseFailed { .. })));
        Ok(())
    }

    #[test]
    fn test_env_overrides() -> Result<()> {
        let mut config = KeygateConfig::default();
        config.apply_env(|key| match key {
            "KEYGATE_STATUS_INTERVAL_MS" => Some("250".to_string()),
            "KEYGATE_BYPASS_CODE" => Some(String::new()),
            "KEYGATE_LOG" => Some("debug".to_string()),
            _ => None,
        })?;

        assert_eq!(config.poll.status_interval_ms, 250);
        assert!(config.access.bypass_code.is_none());
        assert_eq!(config.log.level, "debug");
        Ok(())
    }

    #[test]
    fn test_bad_env_number_rejected() {
        let mut config = KeygateConfig::default();
        let result = config.apply_env(|key| {
            (key == "KEYGATE_FEED_INTERVAL_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_analysis_window_must_fit_in_period() {
        let mut config = KeygateConfig::default();
        config.feed.analysis_window_secs = CYCLE_SECS;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_bypass_code_in_file_rejected() -> Result<()> {
        for raw in ["\"\"", "\"   \""] {
            let mut file = tempfile::NamedTempFile::new()?;
            writeln!(file, "[access]\nbypass_code = {raw}")?;

            let config = load_toml_file(file.path())?;
            assert!(config.access.bypass_code.is_some());
            assert!(matches!(
                config.validate(),
                Err(Error::InvalidConfig { .. })
            ));
        }
        Ok(())
    }
}
