//! Giphy GIF search provider.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{ResultBuilder, SafeSearch, SearchResult};
use crate::providers::{
    page_size, Provider, ProviderCapabilities, ProviderError, ProviderOutcome,
};
use crate::utils::HttpClient;

const GIPHY_API_BASE: &str = "https://api.giphy.com/v1/gifs";

/// Giphy caps `limit` at 50 per request
const GIPHY_MAX_LIMIT: usize = 50;

/// Giphy search provider
///
/// Uses the public REST API; requires an API key.
#[derive(Debug, Clone)]
pub struct GiphyProvider {
    client: Arc<HttpClient>,
    api_key: String,
    base_url: String,
    safe_search: SafeSearch,
    timeout: Duration,
}

impl GiphyProvider {
    /// Create a new Giphy provider
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Arc::new(HttpClient::new()?),
            api_key: api_key.into(),
            base_url: GIPHY_API_BASE.to_string(),
            safe_search: SafeSearch::default(),
            timeout: Duration::from_secs(10),
        })
    }

    /// Point the provider at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the content rating filter
    pub fn with_safe_search(mut self, safe_search: SafeSearch) -> Self {
        self.safe_search = safe_search;
        self
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn rating(&self) -> &'static str {
        match self.safe_search {
            SafeSearch::Strict => "g",
            SafeSearch::Moderate => "pg-13",
            SafeSearch::Off => "r",
        }
    }

    fn parse_gif(gif: GiphyGif) -> Option<SearchResult> {
        let images = gif.images?;
        let image_url = images.original.and_then(|r| r.url)?;

        let thumbnail = images
            .fixed_width
            .or(images.downsized)
            .and_then(|r| r.url)
            .unwrap_or_default();

        Some(
            ResultBuilder::new(image_url, "giphy")
                .title(gif.title)
                .source_url(gif.url.unwrap_or_default())
                .thumbnail_url(thumbnail)
                .build(),
        )
    }
}

#[async_trait]
impl Provider for GiphyProvider {
    fn id(&self) -> &str {
        "giphy"
    }

    fn name(&self) -> &str {
        "Giphy"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::GIFS | ProviderCapabilities::REQUIRES_KEY
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, query: &str, limit: usize) -> ProviderOutcome {
        let url = format!(
            "{}/search?api_key={}&q={}&limit={}&offset=0&rating={}&lang=en",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(query),
            page_size(limit, GIPHY_MAX_LIMIT),
            self.rating()
        );

        let body = self
            .client
            .send_text(self.client.get(&url, self.timeout))
            .await?;

        let data: GiphySearchResponse = serde_json::from_str(&body)?;

        Ok(data
            .data
            .into_iter()
            .filter_map(Self::parse_gif)
            .take(limit)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct GiphySearchResponse {
    data: Vec<GiphyGif>,
}

#[derive(Debug, Deserialize)]
struct GiphyGif {
    #[serde(default)]
    title: String,
    url: Option<String>,
    images: Option<GiphyImages>,
}

#[derive(Debug, Deserialize)]
struct GiphyImages {
    original: Option<GiphyRendition>,
    fixed_width: Option<GiphyRendition>,
    downsized: Option<GiphyRendition>,
}

#[derive(Debug, Deserialize)]
struct GiphyRendition {
    url: Option<String>,
}
