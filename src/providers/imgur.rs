//! Imgur gallery search provider.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{ResultBuilder, SafeSearch, SearchResult};
use crate::providers::{Provider, ProviderCapabilities, ProviderError, ProviderOutcome};
use crate::utils::HttpClient;

const IMGUR_API_BASE: &str = "https://api.imgur.com/3";

/// Imgur search provider
///
/// Authenticates with an application Client-ID. Albums are reduced to their
/// first image; mature posts are skipped unless safe search is off.
#[derive(Debug, Clone)]
pub struct ImgurProvider {
    client: Arc<HttpClient>,
    client_id: String,
    base_url: String,
    safe_search: SafeSearch,
    timeout: Duration,
}

impl ImgurProvider {
    pub fn new(client_id: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Arc::new(HttpClient::new()?),
            client_id: client_id.into(),
            base_url: IMGUR_API_BASE.to_string(),
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

    fn parse_post(post: ImgurPost, allow_mature: bool) -> Option<SearchResult> {
        if post.nsfw.unwrap_or(false) && !allow_mature {
            return None;
        }

        let image_url = if post.is_album {
            post.images
                .into_iter()
                .find(|img| is_still_or_gif(img.mime.as_deref()))
                .map(|img| img.link)?
        } else {
            if !is_still_or_gif(post.mime.as_deref()) {
                return None;
            }
            post.link.clone()
        };

        let source_url = if post.is_album {
            post.link
        } else {
            format!("https://imgur.com/{}", post.id)
        };

        let thumbnail = thumbnail_for(&image_url).unwrap_or_default();

        Some(
            ResultBuilder::new(image_url, "imgur")
                .title(post.title.unwrap_or_default())
                .source_url(source_url)
                .thumbnail_url(thumbnail)
                .build(),
        )
    }
}

/// Imgur serves videos through the same API; only image types are usable
fn is_still_or_gif(mime: Option<&str>) -> bool {
    match mime {
        Some(m) => m.starts_with("image/"),
        None => true,
    }
}

/// Imgur exposes a medium thumbnail by appending `m` to the image hash
///
/// `https://i.imgur.com/abc.jpg` -> `https://i.imgur.com/abcm.jpg`
fn thumbnail_for(image_url: &str) -> Option<String> {
    if !image_url.contains("i.imgur.com/") {
        return None;
    }
    let dot = image_url.rfind('.')?;
    let slash = image_url.rfind('/')?;
    if dot <= slash + 1 {
        return None;
    }
    Some(format!("{}m{}", &image_url[..dot], &image_url[dot..]))
}

#[async_trait]
impl Provider for ImgurProvider {
    fn id(&self) -> &str {
        "imgur"
    }

    fn name(&self) -> &str {
        "Imgur"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::IMAGES | ProviderCapabilities::GIFS | ProviderCapabilities::REQUIRES_KEY
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, query: &str, limit: usize) -> ProviderOutcome {
        let url = format!(
            "{}/gallery/search/top/all/0?q={}",
            self.base_url,
            urlencoding::encode(query)
        );

        let request = self
            .client
            .get(&url, self.timeout)
            .header("Authorization", format!("Client-ID {}", self.client_id));

        let body = self.client.send_text(request).await?;
        let data: ImgurSearchResponse = serde_json::from_str(&body)?;

        let allow_mature = self.safe_search == SafeSearch::Off;

        Ok(data
            .data
            .into_iter()
            .filter_map(|post| Self::parse_post(post, allow_mature))
            .take(limit)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ImgurSearchResponse {
    data: Vec<ImgurPost>,
}

#[derive(Debug, Deserialize)]
struct ImgurPost {
    id: String,
    title: Option<String>,
    link: String,
    #[serde(default)]
    is_album: bool,
    #[serde(rename = "type")]
    mime: Option<String>,
    nsfw: Option<bool>,
    #[serde(default)]
    images: Vec<ImgurImage>,
}

#[derive(Debug, Deserialize)]
struct ImgurImage {
    link: String,
    #[serde(rename = "type")]
    mime: Option<String>,
}
