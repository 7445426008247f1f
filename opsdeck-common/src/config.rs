// Centralized configuration for OpsDeck

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::DEFAULT_REFRESH_SECS;
use crate::session::SessionUser;

/// Bounded retry with exponential backoff for panel fetches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per refresh, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry (in milliseconds)
    pub initial_backoff_ms: u64,

    /// Upper bound for any single delay (in milliseconds)
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// No retries: a failed fetch fails the refresh
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after the given failed attempt (1-based), doubling each time
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }
}

/// Dashboard configuration with support for file and environment overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the dashboard API (default: http://localhost:8000)
    pub api_base_url: String,

    /// Bearer token attached to every request
    pub api_token: Option<String>,

    /// Auto-refresh period for live panels (in seconds)
    pub refresh_interval_secs: u64,

    /// Number of activities requested per refresh
    pub feed_limit: u32,

    /// Number of pending backups requested per refresh
    pub pending_per_page: u32,

    /// Per-request timeout (in seconds)
    pub request_timeout_secs: u64,

    /// Retry policy for failed refreshes
    pub retry: RetryConfig,

    /// Operator shown in panel headers
    pub operator: Option<SessionUser>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            api_token: None,
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            feed_limit: 20,
            pending_per_page: 10,
            request_timeout_secs: 15,
            retry: RetryConfig::default(),
            operator: None,
        }
    }
}

impl DashboardConfig {
    /// Create a configuration from the config file plus environment overrides
    ///
    /// The file is `$OPSDECK_CONFIG` if set, else `~/.config/opsdeck/config.toml`.
    /// A missing file is not an error.
    ///
    /// Supported environment variables:
    /// - OPSDECK_API_URL: Override API base URL
    /// - OPSDECK_API_TOKEN: Override bearer token
    /// - OPSDECK_REFRESH_SECS: Override auto-refresh period
    /// - OPSDECK_FEED_LIMIT: Override activities per refresh
    /// - OPSDECK_PENDING_PER_PAGE: Override pending backups per refresh
    pub fn new() -> anyhow::Result<Self> {
        let path = std::env::var_os("OPSDECK_CONFIG")
            .map(PathBuf::from)
            .or_else(Self::default_path);

        let mut config = match path {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Get the default config file path (~/.config/opsdeck/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("opsdeck").join("config.toml"))
    }

    /// Load configuration from file; a missing file yields defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let mut config: Self = toml::from_str(contents)?;
        config.normalize();
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally the process environment)
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OPSDECK_API_URL") {
            self.api_base_url = url;
        }

        if let Some(token) = lookup("OPSDECK_API_TOKEN") {
            self.api_token = Some(token);
        }

        if let Some(secs) = lookup("OPSDECK_REFRESH_SECS").and_then(|v| v.parse().ok()) {
            self.refresh_interval_secs = secs;
        }

        if let Some(limit) = lookup("OPSDECK_FEED_LIMIT").and_then(|v| v.parse().ok()) {
            self.feed_limit = limit;
        }

        if let Some(per_page) = lookup("OPSDECK_PENDING_PER_PAGE").and_then(|v| v.parse().ok()) {
            self.pending_per_page = per_page;
        }

        self.normalize();
    }

    fn normalize(&mut self) {
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        self.api_token = self.api_token.take().filter(|t| !t.trim().is_empty());
        self.refresh_interval_secs = self.refresh_interval_secs.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.feed_limit = self.feed_limit.max(1);
        self.pending_per_page = self.pending_per_page.max(1);
        self.retry.max_attempts = self.retry.max_attempts.max(1);
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.feed_limit, 20);
        assert_eq!(config.pending_per_page, 10);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DashboardConfig::from_toml_str(
            r#"
            api_base_url = "https://ops.example.com/"
            feed_limit = 50

            [retry]
            max_attempts = 5

            [operator]
            name = "Casey"
            roles = ["admin"]
            "#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://ops.example.com");
        assert_eq!(config.feed_limit, 50);
        assert_eq!(config.pending_per_page, 10);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff_ms, 500);
        assert_eq!(config.operator.as_ref().map(|o| o.name.as_str()), Some("Casey"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(DashboardConfig::from_toml_str("feed_limit = \"many\"").is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OPSDECK_API_URL", "http://10.0.0.5:9000/"),
            ("OPSDECK_API_TOKEN", "secret"),
            ("OPSDECK_REFRESH_SECS", "5"),
            ("OPSDECK_FEED_LIMIT", "not-a-number"),
            ("OPSDECK_PENDING_PER_PAGE", "25"),
        ]
        .into_iter()
        .collect();

        let mut config = DashboardConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base_url, "http://10.0.0.5:9000");
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.refresh_interval_secs, 5);
        assert_eq!(config.feed_limit, 20);
        assert_eq!(config.pending_per_page, 25);
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let mut config = DashboardConfig::default();
        config.apply_overrides(|key| match key {
            "OPSDECK_REFRESH_SECS" | "OPSDECK_FEED_LIMIT" => Some("0".to_string()),
            "OPSDECK_API_TOKEN" => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.refresh_interval_secs, 1);
        assert_eq!(config.feed_limit, 1);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_zero_timeout_from_file_is_clamped() {
        let toml = "request_timeout_secs = 0\npending_per_page = 0";
        let config = DashboardConfig::from_toml_str(toml).unwrap();

        assert_eq!(config.request_timeout(), Duration::from_secs(1));
        assert_eq!(config.pending_per_page, 1);
    }

    #[test]
    fn test_load_missing_and_existing_file() {
        let dir = std::env::temp_dir().join(format!("opsdeck-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let missing = dir.join("missing.toml");
        assert_eq!(
            DashboardConfig::load(&missing).unwrap(),
            DashboardConfig::default()
        );

        let path = dir.join("config.toml");
        std::fs::write(&path, "refresh_interval_secs = 12\n").unwrap();
        let config = DashboardConfig::load(&path).unwrap();
        assert_eq!(config.refresh_interval_secs, 12);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff_for(1), Duration::from_millis(500));
        assert_eq!(retry.backoff_for(2), Duration::from_millis(1000));
        assert_eq!(retry.backoff_for(3), Duration::from_millis(2000));
        assert_eq!(retry.backoff_for(5), Duration::from_millis(5000));
        assert_eq!(retry.backoff_for(40), Duration::from_millis(5000));
        assert_eq!(RetryConfig::disabled().max_attempts, 1);
    }
}
