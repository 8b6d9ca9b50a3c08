//! HTTP client utilities.

use reqwest::{Client, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;

use crate::providers::ProviderError;

/// User agent sent to scraped HTML endpoints, which reject obvious bots
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client identifying as this crate
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
    }

    /// Create a client that looks like a desktop browser
    pub fn browser() -> Result<Self, ProviderError> {
        Self::with_user_agent(BROWSER_USER_AGENT)
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(user_agent: &str) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Start a GET request bounded by `timeout`
    pub fn get(&self, url: &str, timeout: Duration) -> RequestBuilder {
        self.client.get(url).timeout(timeout)
    }

    /// Send a request and turn failing statuses into [`ProviderError`]s
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = request.send().await?;
        let status = response.status();

        if let Some(err) = ProviderError::from_status(status) {
            tracing::debug!("Request to {} failed with {}", response.url(), status);
            return Err(err);
        }

        Ok(response)
    }

    /// Send a request and read the body as text
    pub async fn send_text(&self, request: RequestBuilder) -> Result<String, ProviderError> {
        let response = self.send(request).await?;
        response.text().await.map_err(ProviderError::from)
    }
}
