//! Image provider adapters with a shared trait-based interface.
//!
//! Every upstream image service implements [`Provider`]. An adapter builds
//! one outbound request, parses the native response shape into
//! [`SearchResult`]s and classifies failures into [`ProviderError`]. Adapters
//! never panic; a zero-hit answer is `Ok(vec![])`, not an error.
//!
//! # Available Providers
//!
//! | id           | kind   | needs key            | default timeout |
//! |--------------|--------|----------------------|-----------------|
//! | `giphy`      | API    | `GIPHY_API_KEY`      | 10s             |
//! | `tenor`      | API    | `TENOR_API_KEY`      | 10s             |
//! | `imgur`      | API    | `IMGUR_CLIENT_ID`    | 10s             |
//! | `serpapi`    | API    | `SERPAPI_API_KEY`    | 30s             |
//! | `duckduckgo` | JSON   | -                    | 20s             |
//! | `bing`       | scrape | -                    | 15s             |
//! | `google`     | scrape | -                    | 15s             |
//!
//! Providers that need a key are only registered when the key is
//! configured; see [`ProviderRegistry::from_config`].

mod bing;
mod duckduckgo;
mod giphy;
mod google;
mod imgur;
mod registry;
mod serpapi;
mod tenor;

pub mod mock;

pub use bing::BingProvider;
pub use duckduckgo::DuckDuckGoProvider;
pub use giphy::GiphyProvider;
pub use google::GoogleProvider;
pub use imgur::ImgurProvider;
pub use mock::MockProvider;
pub use registry::{ProviderCapabilities, ProviderRegistry};
pub use serpapi::SerpApiProvider;
pub use tenor::TenorProvider;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::models::SearchResult;

/// Timeout used when a provider does not override [`Provider::timeout`]
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a single provider call: results (possibly empty) or a failure
pub type ProviderOutcome = Result<Vec<SearchResult>, ProviderError>;

/// The Provider trait defines the interface for all image sources.
///
/// # Implementing a New Provider
///
/// 1. Create a struct holding an [`HttpClient`](crate::utils::HttpClient)
/// 2. Implement `id`, `name` and `fetch`
/// 3. Override `capabilities` and `timeout` if the defaults don't fit
/// 4. Add it to [`ProviderRegistry::from_config`]
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Unique identifier (used in config files and CLI flags)
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Describe the capabilities of this provider
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::IMAGES
    }

    /// Per-call timeout; exceeding it is reported as [`ProviderError::Timeout`]
    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    /// Run one search and return at most `limit` normalized results
    async fn fetch(&self, query: &str, limit: usize) -> ProviderOutcome;
}

/// Failures a provider call can end in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProviderError {
    /// The upstream answered 429 or reported an exhausted quota
    #[error("rate limited")]
    RateLimited,

    /// The upstream refused the request (401/403, bad key, bot wall)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The call did not finish within the provider timeout
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure or an unexpected HTTP status
    #[error("network error: {0}")]
    Network(String),

    /// The response did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// The provider is missing required configuration (usually an API key)
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Classify an HTTP status; `None` for success codes
    pub fn from_status(status: reqwest::StatusCode) -> Option<Self> {
        if status.is_success() {
            return None;
        }

        Some(match status {
            reqwest::StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                ProviderError::Forbidden(format!("HTTP {}", status))
            }
            reqwest::StatusCode::REQUEST_TIMEOUT | reqwest::StatusCode::GATEWAY_TIMEOUT => {
                ProviderError::Timeout
            }
            _ => ProviderError::Network(format!("unexpected HTTP status {}", status)),
        })
    }

    /// Only rate limiting is worth retrying against the same provider
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited)
    }

    /// Short advice shown next to the error
    pub fn guidance(&self) -> &'static str {
        match self {
            ProviderError::RateLimited => "wait a minute before retrying",
            ProviderError::Forbidden(_) => "check the API key or try again later",
            ProviderError::Timeout => "the service is slow, try again",
            ProviderError::Network(_) => "check your connection",
            ProviderError::Parse(_) => "the service changed its response format",
            ProviderError::NotConfigured(_) => "add the missing key to the config file",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ProviderError::Timeout;
        }
        if let Some(status) = err.status() {
            if let Some(classified) = ProviderError::from_status(status) {
                return classified;
            }
        }
        if err.is_decode() {
            return ProviderError::Parse(err.to_string());
        }
        ProviderError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(format!("JSON: {}", err))
    }
}

/// Clamp a requested limit to what an API accepts per page
pub(crate) fn page_size(limit: usize, max: usize) -> usize {
    limit.clamp(1, max)
}
