//! Image result model shared by every provider.

use serde::{Deserialize, Serialize};

use crate::utils::is_http_url;

/// A single image hit, normalized across providers
///
/// `source_url` and `thumbnail_url` always hold a value: when the provider
/// has nothing better they fall back to `image_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Direct link to the full-size image or GIF
    pub image_url: String,

    /// Display title (may be empty)
    pub title: String,

    /// Page the image was found on, or its canonical link
    pub source_url: String,

    /// Smaller rendition for grids
    pub thumbnail_url: String,

    /// Id of the provider that produced this result
    pub provider: String,
}

impl SearchResult {
    /// Create a result from an image URL alone
    pub fn new(image_url: impl Into<String>, provider: impl Into<String>) -> Self {
        let image_url = image_url.into();
        Self {
            title: String::new(),
            source_url: image_url.clone(),
            thumbnail_url: image_url.clone(),
            image_url,
            provider: provider.into(),
        }
    }

    /// Whether the image URL is absolute and uses an HTTP(S) scheme
    pub fn is_valid(&self) -> bool {
        is_http_url(&self.image_url)
    }
}

/// Builder for constructing SearchResult objects
///
/// Empty optional fields are ignored so the defaults from
/// [`SearchResult::new`] stay in place.
#[derive(Debug, Clone)]
pub struct ResultBuilder {
    result: SearchResult,
}

impl ResultBuilder {
    /// Create a new builder with required fields
    pub fn new(image_url: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            result: SearchResult::new(image_url, provider),
        }
    }

    /// Set title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.result.title = title.into().trim().to_string();
        self
    }

    /// Set source page URL
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.trim().is_empty() {
            self.result.source_url = url;
        }
        self
    }

    /// Set thumbnail URL
    pub fn thumbnail_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.trim().is_empty() {
            self.result.thumbnail_url = url;
        }
        self
    }

    /// Build the SearchResult
    pub fn build(self) -> SearchResult {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_image_url() {
        let result = SearchResult::new("https://example.com/a.gif", "giphy");

        assert_eq!(result.source_url, "https://example.com/a.gif");
        assert_eq!(result.thumbnail_url, "https://example.com/a.gif");
        assert!(result.title.is_empty());
    }

    #[test]
    fn test_builder_ignores_empty_links() {
        let result = ResultBuilder::new("https://example.com/a.gif", "tenor")
            .title("  dancing cat ")
            .source_url("")
            .thumbnail_url("https://example.com/a-small.gif")
            .build();

        assert_eq!(result.title, "dancing cat");
        assert_eq!(result.source_url, "https://example.com/a.gif");
        assert_eq!(result.thumbnail_url, "https://example.com/a-small.gif");
    }

    #[test]
    fn test_validity() {
        assert!(SearchResult::new("https://example.com/a.png", "x").is_valid());
        assert!(SearchResult::new("http://example.com/a.png", "x").is_valid());
        assert!(!SearchResult::new("", "x").is_valid());
        assert!(!SearchResult::new("ftp://example.com/a.png", "x").is_valid());
        assert!(!SearchResult::new("data:image/png;base64,AAAA", "x").is_valid());
        assert!(!SearchResult::new("/images/a.png", "x").is_valid());
    }
}
