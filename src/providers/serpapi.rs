//! SerpApi Google Images provider.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{ResultBuilder, SafeSearch, SearchResult};
use crate::providers::{Provider, ProviderCapabilities, ProviderError, ProviderOutcome};
use crate::utils::HttpClient;

const SERPAPI_BASE: &str = "https://serpapi.com";

/// Message SerpApi returns instead of an empty `images_results` array
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

/// Google Images through SerpApi
///
/// Paid service with a structured JSON API. SerpApi reports soft failures
/// (bad key, exhausted plan, zero hits) with HTTP 200 and an `error` field,
/// which are classified here.
#[derive(Debug, Clone)]
pub struct SerpApiProvider {
    client: Arc<HttpClient>,
    api_key: String,
    base_url: String,
    safe_search: SafeSearch,
    timeout: Duration,
}

impl SerpApiProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Arc::new(HttpClient::new()?),
            api_key: api_key.into(),
            base_url: SERPAPI_BASE.to_string(),
            safe_search: SafeSearch::default(),
            timeout: Duration::from_secs(30),
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

    fn safe_param(&self) -> &'static str {
        match self.safe_search {
            SafeSearch::Off => "off",
            SafeSearch::Strict | SafeSearch::Moderate => "active",
        }
    }

    fn classify_error(message: String) -> Result<(), ProviderError> {
        let lower = message.to_lowercase();
        if lower.contains(NO_RESULTS_MARKER) {
            return Ok(());
        }
        // Monthly quota exhaustion is an account problem, not throttling
        if lower.contains("run out of searches") || lower.contains("invalid api key") {
            return Err(ProviderError::Forbidden(message));
        }
        if lower.contains("rate limit") {
            return Err(ProviderError::RateLimited);
        }
        Err(ProviderError::Parse(format!("SerpApi error: {}", message)))
    }

    fn parse_image(image: SerpApiImage) -> Option<SearchResult> {
        let image_url = image.original?;
        Some(
            ResultBuilder::new(image_url, "serpapi")
                .title(image.title.unwrap_or_default())
                .source_url(image.link.unwrap_or_default())
                .thumbnail_url(image.thumbnail.unwrap_or_default())
                .build(),
        )
    }
}

#[async_trait]
impl Provider for SerpApiProvider {
    fn id(&self) -> &str {
        "serpapi"
    }

    fn name(&self) -> &str {
        "SerpApi (Google Images)"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::IMAGES | ProviderCapabilities::REQUIRES_KEY
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, query: &str, limit: usize) -> ProviderOutcome {
        let url = format!(
            "{}/search.json?engine=google_images&q={}&api_key={}&safe={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.api_key),
            self.safe_param()
        );

        let body = self
            .client
            .send_text(self.client.get(&url, self.timeout))
            .await?;

        let data: SerpApiResponse = serde_json::from_str(&body)?;

        if let Some(message) = data.error {
            Self::classify_error(message)?;
            return Ok(Vec::new());
        }

        Ok(data
            .images_results
            .into_iter()
            .filter_map(Self::parse_image)
            .take(limit)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    error: Option<String>,
    #[serde(default)]
    images_results: Vec<SerpApiImage>,
}

#[derive(Debug, Deserialize)]
struct SerpApiImage {
    original: Option<String>,
    thumbnail: Option<String>,
    title: Option<String>,
    link: Option<String>,
}
