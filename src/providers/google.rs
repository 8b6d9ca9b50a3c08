//! Google Images provider (HTML scraping).
//!
//! The results page embeds full-size image URLs inside inline script data as
//! `["https://...jpg",height,width]` triples. Those are preferred; when the
//! markup changes and none are found, the adapter falls back to plain
//! `<img>` tags, which only carry thumbnails.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{ResultBuilder, SafeSearch, SearchResult};
use crate::providers::{Provider, ProviderCapabilities, ProviderError, ProviderOutcome};
use crate::utils::{absolutize_url, HttpClient};

const GOOGLE_BASE: &str = "https://www.google.com";

/// Full-size entries in the inline result data
const FULL_SIZE_PATTERN: &str =
    r#"\["(https?://[^"]+?\.(?:jpg|jpeg|png|gif|webp)(?:\?[^"]*)?)",(\d+),(\d+)\]"#;

/// Google Images scraper
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client: Arc<HttpClient>,
    base_url: String,
    safe_search: SafeSearch,
    timeout: Duration,
}

impl GoogleProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: Arc::new(HttpClient::browser()?),
            base_url: GOOGLE_BASE.to_string(),
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

    fn safe_param(&self) -> &'static str {
        match self.safe_search {
            SafeSearch::Off => "off",
            SafeSearch::Strict | SafeSearch::Moderate => "active",
        }
    }

    /// Full-size URLs from inline script data, skipping Google's own thumbnails
    fn parse_full_size(html: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let re = regex::Regex::new(FULL_SIZE_PATTERN)
            .map_err(|e| ProviderError::Parse(format!("image pattern: {}", e)))?;

        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for caps in re.captures_iter(html) {
            let Some(raw) = caps.get(1) else { continue };
            if raw.as_str().contains("gstatic.com") {
                continue;
            }
            let url = unescape_js(raw.as_str());
            if seen.insert(url.clone()) {
                results.push(ResultBuilder::new(url, "google").build());
            }
        }

        Ok(results)
    }

    /// Thumbnail `<img>` tags; used only when no full-size data was found
    fn parse_img_tags(html: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("img")
            .map_err(|e| ProviderError::Parse(format!("selector: {:?}", e)))?;

        let mut results = Vec::new();
        for img in document.select(&selector) {
            let element = img.value();
            let src = absolutize_url(
                element
                    .attr("data-src")
                    .or_else(|| element.attr("src"))
                    .unwrap_or_default(),
            );

            if !src.starts_with("http") || is_branding(&src) {
                continue;
            }

            results.push(
                ResultBuilder::new(src, "google")
                    .title(element.attr("alt").unwrap_or_default())
                    .build(),
            );
        }

        Ok(results)
    }
}

/// Undo the `=` / `&` escaping used inside script strings
fn unescape_js(raw: &str) -> String {
    raw.replace("\\u003d", "=").replace("\\u0026", "&")
}

fn is_branding(src: &str) -> bool {
    src.contains("/images/branding/") || src.contains("googlelogo")
}

#[async_trait]
impl Provider for GoogleProvider {
    fn id(&self) -> &str {
        "google"
    }

    fn name(&self) -> &str {
        "Google Images"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::IMAGES | ProviderCapabilities::SCRAPE
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, query: &str, limit: usize) -> ProviderOutcome {
        let url = format!(
            "{}/search?q={}&tbm=isch&safe={}&hl=en",
            self.base_url,
            urlencoding::encode(query),
            self.safe_param()
        );

        let request = self
            .client
            .get(&url, self.timeout)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "en-US,en;q=0.9");

        let html = self.client.send_text(request).await?;

        if html.contains("/sorry/index") || html.contains("unusual traffic") {
            return Err(ProviderError::RateLimited);
        }

        let mut results = Self::parse_full_size(&html)?;
        if results.is_empty() {
            tracing::debug!("No inline image data on Google page, falling back to <img> tags");
            results = Self::parse_img_tags(&html)?;
        }

        results.truncate(limit);
        Ok(results)
    }
}
