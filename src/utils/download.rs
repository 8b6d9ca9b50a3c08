//! Fetching image bytes for the "download" action.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::providers::ProviderError;
use crate::utils::{sanitize_filename, validate_url, HttpClient, ValidationError};

/// Image downloads are small; give up quickly
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur while downloading an image
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("invalid image URL: {0}")]
    InvalidUrl(#[from] ValidationError),

    #[error("request failed: {0}")]
    Request(#[from] ProviderError),

    #[error("not an image (content type {0})")]
    NotAnImage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bytes of a downloaded image plus what we know about them
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    pub url: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub filename: String,
}

/// Fetches images by URL
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: HttpClient,
    timeout: Duration,
    allow_private_hosts: bool,
}

impl ImageDownloader {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: HttpClient::new()?,
            timeout: DOWNLOAD_TIMEOUT,
            allow_private_hosts: false,
        })
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Permit loopback and private-network hosts (needed for local test servers)
    pub fn allow_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    /// Download the image at `url`
    pub async fn fetch(&self, url: &str) -> Result<DownloadedImage, DownloadError> {
        let url = validate_url(url, self.allow_private_hosts)?;

        let response = self
            .client
            .send(self.client.get(&url, self.timeout))
            .await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_lowercase());

        if let Some(ref ct) = content_type {
            if !ct.starts_with("image/") && ct != "application/octet-stream" {
                return Err(DownloadError::NotAnImage(ct.clone()));
            }
        }

        let bytes = response.bytes().await.map_err(ProviderError::from)?.to_vec();
        let filename = filename_for(&url, content_type.as_deref());

        tracing::debug!("Downloaded {} bytes from {}", bytes.len(), url);

        Ok(DownloadedImage {
            url,
            bytes,
            content_type,
            filename,
        })
    }

    /// Download `url` and write it to `destination`
    ///
    /// When `destination` is an existing directory the inferred filename is
    /// appended to it.
    pub async fn save(&self, url: &str, destination: &Path) -> Result<PathBuf, DownloadError> {
        let image = self.fetch(url).await?;

        let path = if destination.is_dir() {
            destination.join(&image.filename)
        } else {
            destination.to_path_buf()
        };

        tokio::fs::write(&path, &image.bytes).await?;
        tracing::info!("Saved {} ({} bytes)", path.display(), image.bytes.len());
        Ok(path)
    }
}

/// Infer a safe filename from the URL path, falling back to the content type
pub fn filename_for(url: &str, content_type: Option<&str>) -> String {
    let from_path = url::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .filter(|s| !s.is_empty())
    });

    let extension = content_type.and_then(extension_for);

    match from_path.and_then(|name| sanitize_filename(&name).ok()) {
        Some(name) if name.contains('.') => name,
        Some(name) => format!("{}.{}", name, extension.unwrap_or("jpg")),
        None => format!("image.{}", extension.unwrap_or("jpg")),
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "image/bmp" => Some("bmp"),
        _ => None,
    }
}
