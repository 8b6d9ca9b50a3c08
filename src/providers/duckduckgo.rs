//! DuckDuckGo image search provider.
//!
//! DuckDuckGo has no official image API. The web frontend first loads an
//! HTML page that embeds a `vqd` token, then fetches results as JSON from
//! `i.js` with that token. This adapter replays the same two requests.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{ResultBuilder, SafeSearch, SearchResult};
use crate::providers::{Provider, ProviderCapabilities, ProviderError, ProviderOutcome};
use crate::utils::HttpClient;

const DUCKDUCKGO_BASE: &str = "https://duckduckgo.com";

/// DuckDuckGo image search
#[derive(Debug, Clone)]
pub struct DuckDuckGoProvider {
    client: Arc<HttpClient>,
    base_url: String,
    safe_search: SafeSearch,
    timeout: Duration,
}

impl DuckDuckGoProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: Arc::new(HttpClient::browser()?),
            base_url: DUCKDUCKGO_BASE.to_string(),
            safe_search: SafeSearch::default(),
            timeout: Duration::from_secs(20),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_safe_search(mut self, safe_search: SafeSearch) -> Self {
        self.safe_search = safe_search;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `p` parameter: 1 strict, -1 moderate, -2 off
    fn safe_param(&self) -> &'static str {
        match self.safe_search {
            SafeSearch::Strict => "1",
            SafeSearch::Moderate => "-1",
            SafeSearch::Off => "-2",
        }
    }

    /// Pull the `vqd` token out of the landing page
    fn extract_vqd(html: &str) -> Result<String, ProviderError> {
        let re = regex::Regex::new(r#"vqd=["']?([\d-]+)"#)
            .map_err(|e| ProviderError::Parse(format!("vqd pattern: {}", e)))?;

        re.captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ProviderError::Parse("vqd token not found in landing page".to_string()))
    }

    async fn fetch_vqd(&self, query: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/?q={}&iax=images&ia=images",
            self.base_url,
            urlencoding::encode(query)
        );
        let html = self
            .client
            .send_text(self.client.get(&url, self.timeout))
            .await?;
        Self::extract_vqd(&html)
    }

    fn parse_image(image: DdgImage) -> Option<SearchResult> {
        let image_url = image.image?;
        Some(
            ResultBuilder::new(image_url, "duckduckgo")
                .title(image.title.unwrap_or_default())
                .source_url(image.url.unwrap_or_default())
                .thumbnail_url(image.thumbnail.unwrap_or_default())
                .build(),
        )
    }
}

#[async_trait]
impl Provider for DuckDuckGoProvider {
    fn id(&self) -> &str {
        "duckduckgo"
    }

    fn name(&self) -> &str {
        "DuckDuckGo Images"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::IMAGES | ProviderCapabilities::GIFS
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, query: &str, limit: usize) -> ProviderOutcome {
        let vqd = self.fetch_vqd(query).await?;
        tracing::trace!("DuckDuckGo vqd token: {}", vqd);

        let url = format!(
            "{}/i.js?l=us-en&o=json&q={}&vqd={}&f=,,,,,&p={}",
            self.base_url,
            urlencoding::encode(query),
            vqd,
            self.safe_param()
        );

        let request = self
            .client
            .get(&url, self.timeout)
            .header("Referer", format!("{}/", self.base_url))
            .header("Accept", "application/json, text/javascript, */*; q=0.01");

        let body = self.client.send_text(request).await?;

        // A bot wall answers 200 with an HTML page instead of JSON
        if body.trim_start().starts_with('<') {
            return Err(ProviderError::Forbidden(
                "DuckDuckGo returned a challenge page".to_string(),
            ));
        }

        let data: DdgResponse = serde_json::from_str(&body)?;

        Ok(data
            .results
            .into_iter()
            .filter_map(Self::parse_image)
            .take(limit)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct DdgResponse {
    results: Vec<DdgImage>,
}

#[derive(Debug, Deserialize)]
struct DdgImage {
    image: Option<String>,
    thumbnail: Option<String>,
    title: Option<String>,
    url: Option<String>,
}
