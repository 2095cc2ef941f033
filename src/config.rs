//! Application configuration
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! environment variables. CLI flags are applied last by the binary.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_DATABASE_PATH: &str = "search_counts.db";

pub const ENV_API_KEY: &str = "TMDB_API_KEY";
pub const ENV_BASE_URL: &str = "TMDB_BASE_URL";
pub const ENV_DATABASE_PATH: &str = "CINESEARCH_DB";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub search: SearchSettings,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// API key, or an error for commands that must reach the catalog.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

/// Which paths may report a successful search to analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsTrigger {
    /// Report after the debounced fetch resolves and again whenever a new
    /// non-empty result set is observed. The same settle may be reported twice.
    #[default]
    AtLeastOnce,
    /// Report only from the post-fetch path.
    ExactlyOnce,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Quiescence window in milliseconds.
    pub debounce_ms: u64,
    pub analytics_trigger: AnalyticsTrigger,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            analytics_trigger: AnalyticsTrigger::default(),
        }
    }
}

impl SearchSettings {
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// SQLite file for search counts. Empty keeps counts in memory.
    pub database_path: String,
    pub poster_base_url: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            poster_base_url: DEFAULT_POSTER_BASE_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load defaults, the optional JSON file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            log::debug!("Using API key from {}", ENV_API_KEY);
            self.api.api_key = Some(key);
        }
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            self.api.base_url = url;
        }
        if let Ok(path) = std::env::var(ENV_DATABASE_PATH) {
            self.analytics.database_path = path;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn clear_env() {
        std::env::remove_var(ENV_API_KEY);
        std::env::remove_var(ENV_BASE_URL);
        std::env::remove_var(ENV_DATABASE_PATH);
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.search.debounce_delay(), Duration::from_millis(500));
        assert_eq!(config.search.analytics_trigger, AnalyticsTrigger::AtLeastOnce);
        assert_eq!(config.analytics.database_path, DEFAULT_DATABASE_PATH);
    }

    #[test]
    #[serial]
    fn test_partial_file_keeps_defaults() -> anyhow::Result<()> {
        clear_env();
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            r#"{{"search": {{"debounce_ms": 250, "analytics_trigger": "exactly_once"}}}}"#
        )?;

        let config = AppConfig::load(Some(file.path()))?;
        assert_eq!(config.search.debounce_ms, 250);
        assert_eq!(config.search.analytics_trigger, AnalyticsTrigger::ExactlyOnce);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout_secs, 10);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() -> anyhow::Result<()> {
        clear_env();
        let mut file = NamedTempFile::new()?;
        writeln!(file, r#"{{"api": {{"api_key": "from-file"}}}}"#)?;
        std::env::set_var(ENV_API_KEY, "from-env");
        std::env::set_var(ENV_DATABASE_PATH, "/tmp/counts.db");

        let config = AppConfig::load(Some(file.path()));
        clear_env();
        let config = config?;

        assert_eq!(config.api.require_api_key()?, "from-env");
        assert_eq!(config.analytics.database_path, "/tmp/counts.db");
        Ok(())
    }

    #[test]
    #[serial]
    fn test_missing_api_key() {
        clear_env();
        let config = AppConfig::load(None).unwrap();
        assert!(matches!(
            config.api.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_unparsable_file() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "not json")?;
        let result = AppConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
        Ok(())
    }
}
