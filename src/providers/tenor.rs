//! Tenor GIF search provider (API v2).

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{ResultBuilder, SafeSearch, SearchResult};
use crate::providers::{
    page_size, Provider, ProviderCapabilities, ProviderError, ProviderOutcome,
};
use crate::utils::HttpClient;

const TENOR_API_BASE: &str = "https://tenor.googleapis.com/v2";
const TENOR_MAX_LIMIT: usize = 50;
const TENOR_CLIENT_KEY: &str = env!("CARGO_PKG_NAME");

/// Tenor search provider
#[derive(Debug, Clone)]
pub struct TenorProvider {
    client: Arc<HttpClient>,
    api_key: String,
    base_url: String,
    safe_search: SafeSearch,
    timeout: Duration,
}

impl TenorProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Arc::new(HttpClient::new()?),
            api_key: api_key.into(),
            base_url: TENOR_API_BASE.to_string(),
            safe_search: SafeSearch::default(),
            timeout: Duration::from_secs(10),
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

    fn content_filter(&self) -> &'static str {
        match self.safe_search {
            SafeSearch::Strict => "high",
            SafeSearch::Moderate => "medium",
            SafeSearch::Off => "off",
        }
    }

    fn parse_item(item: TenorItem) -> Option<SearchResult> {
        let mut formats = item.media_formats;
        let image_url = formats
            .remove("gif")
            .or_else(|| formats.remove("mediumgif"))
            .map(|m| m.url)?;
        let thumbnail = formats.remove("tinygif").map(|m| m.url).unwrap_or_default();

        Some(
            ResultBuilder::new(image_url, "tenor")
                .title(item.content_description)
                .source_url(item.itemurl.or(item.url).unwrap_or_default())
                .thumbnail_url(thumbnail)
                .build(),
        )
    }
}

#[async_trait]
impl Provider for TenorProvider {
    fn id(&self) -> &str {
        "tenor"
    }

    fn name(&self) -> &str {
        "Tenor"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::GIFS | ProviderCapabilities::REQUIRES_KEY
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, query: &str, limit: usize) -> ProviderOutcome {
        let url = format!(
            "{}/search?q={}&key={}&client_key={}&limit={}&contentfilter={}&media_filter=gif,tinygif,mediumgif",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.api_key),
            TENOR_CLIENT_KEY,
            page_size(limit, TENOR_MAX_LIMIT),
            self.content_filter()
        );

        let body = self
            .client
            .send_text(self.client.get(&url, self.timeout))
            .await?;

        let data: TenorSearchResponse = serde_json::from_str(&body)?;

        Ok(data
            .results
            .into_iter()
            .filter_map(Self::parse_item)
            .take(limit)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct TenorSearchResponse {
    results: Vec<TenorItem>,
}

#[derive(Debug, Deserialize)]
struct TenorItem {
    #[serde(default)]
    content_description: String,
    itemurl: Option<String>,
    url: Option<String>,
    #[serde(default)]
    media_formats: HashMap<String, TenorMedia>,
}

#[derive(Debug, Deserialize)]
struct TenorMedia {
    url: String,
}
