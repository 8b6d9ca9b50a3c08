//! Bing Images provider (HTML scraping).

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{ResultBuilder, SafeSearch, SearchResult};
use crate::providers::{
    page_size, Provider, ProviderCapabilities, ProviderError, ProviderOutcome,
};
use crate::utils::HttpClient;

const BING_BASE: &str = "https://www.bing.com";
const BING_MAX_COUNT: usize = 150;

/// Bing Images scraper
///
/// Each result tile is an `a.iusc` anchor whose `m` attribute carries a JSON
/// blob with the full-size URL (`murl`), thumbnail (`turl`), page (`purl`)
/// and title (`t`).
#[derive(Debug, Clone)]
pub struct BingProvider {
    client: Arc<HttpClient>,
    base_url: String,
    safe_search: SafeSearch,
    timeout: Duration,
}

impl BingProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: Arc::new(HttpClient::browser()?),
            base_url: BING_BASE.to_string(),
            safe_search: SafeSearch::default(),
            timeout: Duration::from_secs(15),
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

    fn adult_param(&self) -> &'static str {
        match self.safe_search {
            SafeSearch::Strict => "strict",
            SafeSearch::Moderate => "moderate",
            SafeSearch::Off => "off",
        }
    }

    /// Extract result tiles from a results page
    fn parse_page(html: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("a.iusc")
            .map_err(|e| ProviderError::Parse(format!("selector: {:?}", e)))?;

        let mut results = Vec::new();
        for tile in document.select(&selector) {
            let Some(meta) = tile.value().attr("m") else {
                continue;
            };
            let meta: BingTileMeta = match serde_json::from_str(meta) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::trace!("Skipping Bing tile with unreadable metadata: {}", e);
                    continue;
                }
            };
            let Some(image_url) = meta.murl else {
                continue;
            };

            results.push(
                ResultBuilder::new(image_url, "bing")
                    .title(meta.t.unwrap_or_default())
                    .source_url(meta.purl.unwrap_or_default())
                    .thumbnail_url(meta.turl.unwrap_or_default())
                    .build(),
            );
        }

        Ok(results)
    }
}

#[async_trait]
impl Provider for BingProvider {
    fn id(&self) -> &str {
        "bing"
    }

    fn name(&self) -> &str {
        "Bing Images"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::IMAGES | ProviderCapabilities::GIFS | ProviderCapabilities::SCRAPE
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, query: &str, limit: usize) -> ProviderOutcome {
        let url = format!(
            "{}/images/search?q={}&form=HDRSC2&first=1&count={}&adlt={}",
            self.base_url,
            urlencoding::encode(query),
            page_size(limit, BING_MAX_COUNT),
            self.adult_param()
        );

        let request = self
            .client
            .get(&url, self.timeout)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "en-US,en;q=0.9");

        let html = self.client.send_text(request).await?;

        let mut results = Self::parse_page(&html)?;
        results.truncate(limit);
        Ok(results)
    }
}

#[derive(Debug, Deserialize)]
struct BingTileMeta {
    murl: Option<String>,
    turl: Option<String>,
    purl: Option<String>,
    t: Option<String>,
}
