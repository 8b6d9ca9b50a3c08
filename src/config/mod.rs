//! Configuration management.
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional TOML file, and `IMAGE_FINDER_*` environment variables. API
//! keys additionally fall back to the conventional unprefixed variables
//! (`GIPHY_API_KEY`, ...). See [`load_config`].

mod file_config;

pub use file_config::{default_config_path, find_config_file, load_config, ConfigError};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{SafeSearch, SearchMode};
use crate::utils::RetryPolicy;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API keys for keyed providers
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Search behaviour
    #[serde(default)]
    pub search: SearchConfig,

    /// Retry policy for rate-limited providers
    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-provider timeout overrides
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Result cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Render as TOML, e.g. for `config` output or a starter file
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// API keys for external services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default)]
    pub giphy: Option<String>,

    #[serde(default)]
    pub tenor: Option<String>,

    #[serde(default)]
    pub imgur_client_id: Option<String>,

    #[serde(default)]
    pub serpapi: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            giphy: env_key("GIPHY_API_KEY"),
            tenor: env_key("TENOR_API_KEY"),
            imgur_client_id: env_key("IMGUR_CLIENT_ID"),
            serpapi: env_key("SERPAPI_API_KEY"),
        }
    }
}

impl ApiKeys {
    /// Keys with no value at all, used to fill gaps after file loading
    pub fn none() -> Self {
        Self {
            giphy: None,
            tenor: None,
            imgur_client_id: None,
            serpapi: None,
        }
    }

    /// Fill unset keys from the conventional environment variables
    pub fn fill_from_env(&mut self) {
        let defaults = Self::default();
        self.giphy = non_empty(self.giphy.take()).or(defaults.giphy);
        self.tenor = non_empty(self.tenor.take()).or(defaults.tenor);
        self.imgur_client_id = non_empty(self.imgur_client_id.take()).or(defaults.imgur_client_id);
        self.serpapi = non_empty(self.serpapi.take()).or(defaults.serpapi);
    }
}

fn env_key(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Provider order used when `search.providers` is empty
pub const DEFAULT_PROVIDER_ORDER: &[&str] = &[
    "giphy",
    "tenor",
    "imgur",
    "serpapi",
    "duckduckgo",
    "bing",
    "google",
];

/// Search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub mode: SearchMode,

    /// Ordered provider ids; empty means [`DEFAULT_PROVIDER_ORDER`]
    #[serde(default)]
    pub providers: Vec<String>,

    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Rewrite queries before searching
    #[serde(default = "default_true")]
    pub enhance: bool,

    #[serde(default)]
    pub safe_search: SafeSearch,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            providers: Vec::new(),
            limit: default_limit(),
            enhance: true,
            safe_search: SafeSearch::default(),
        }
    }
}

impl SearchConfig {
    /// Configured provider order, falling back to the built-in one
    pub fn provider_order(&self) -> Vec<String> {
        if self.providers.is_empty() {
            DEFAULT_PROVIDER_ORDER.iter().map(|s| s.to_string()).collect()
        } else {
            self.providers.clone()
        }
    }
}

fn default_limit() -> usize {
    24
}

fn default_true() -> bool {
    true
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before retry `n` is `base_delay_ms * n`
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .max_retries(self.max_retries)
            .base_delay(Duration::from_millis(self.base_delay_ms))
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

/// Per-provider timeouts in seconds, keyed by provider id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeoutConfig(pub HashMap<String, u64>);

impl TimeoutConfig {
    /// Override for `provider`, if one is configured and non-zero
    pub fn for_provider(&self, provider: &str) -> Option<Duration> {
        self.0
            .get(provider)
            .copied()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    600 // 10 minutes
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` (default) or `json`
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.limit, 24);
        assert!(config.search.enhance);
        assert_eq!(config.search.mode, SearchMode::FirstSuccess);
        assert_eq!(config.search.safe_search, SafeSearch::Moderate);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_seconds, 600);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryConfig {
            max_retries: 2,
            base_delay_ms: 50,
        }
        .policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for(2), Duration::from_millis(100));
    }

    #[test]
    fn test_provider_order_default() {
        let search = SearchConfig::default();
        assert_eq!(search.provider_order()[0], "giphy");
        assert_eq!(search.provider_order().len(), DEFAULT_PROVIDER_ORDER.len());

        let search = SearchConfig {
            providers: vec!["bing".into(), "google".into()],
            ..SearchConfig::default()
        };
        assert_eq!(search.provider_order(), vec!["bing", "google"]);
    }

    #[test]
    fn test_timeout_override() {
        let mut timeouts = TimeoutConfig::default();
        timeouts.0.insert("bing".into(), 4);
        timeouts.0.insert("google".into(), 0);
        assert_eq!(timeouts.for_provider("bing"), Some(Duration::from_secs(4)));
        assert_eq!(timeouts.for_provider("google"), None);
        assert_eq!(timeouts.for_provider("tenor"), None);
    }

    #[test]
    fn test_logging_format() {
        let mut logging = LoggingConfig::default();
        assert!(!logging.is_json());
        logging.format = Some("JSON".into());
        assert!(logging.is_json());
    }

    #[test]
    fn test_to_toml_contains_sections() {
        let mut config = Config::default();
        config.api_keys = ApiKeys::none();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[search]"));
        assert!(text.contains("mode = \"first_success\""));
        assert!(text.contains("[cache]"));
    }
}
