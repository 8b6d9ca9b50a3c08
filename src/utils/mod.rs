//! Utility modules supporting the search pipeline.
//!
//! - [`deduplicate_results`]: Drop repeated image URLs, keeping first occurrences
//! - [`HttpClient`]: Shared HTTP client that classifies failing statuses
//! - [`RetryPolicy`] / [`with_retry`]: Linear backoff for rate-limited providers
//! - [`MemoryCache`]: TTL cache for aggregated results
//! - [`ImageDownloader`]: Fetch image bytes for saving
//! - [`is_http_url`] / [`validate_url`]: Link validation
//! - [`results_table`] / [`truncate_with_ellipsis`]: Terminal rendering
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use image_finder::providers::ProviderError;
//! use image_finder::utils::{with_retry, RetryPolicy};
//!
//! # async fn fetch_data() -> Result<String, ProviderError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), ProviderError> {
//! let policy = RetryPolicy::default().max_retries(3);
//! let data = with_retry(policy, "example", || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod dedup;
mod display;
mod download;
mod http;
mod retry;
mod validate;

pub use cache::{CacheResult, MemoryCache, ResultCache};
pub use dedup::{deduplicate_results, duplicate_indices};
pub use display::{plain_lines, results_table, truncate_with_ellipsis, TITLE_WIDTH};
pub use download::{filename_for, DownloadError, DownloadedImage, ImageDownloader};
pub use http::{HttpClient, BROWSER_USER_AGENT};
pub use retry::{with_retry, RetryPolicy};
pub use validate::{absolutize_url, is_http_url, sanitize_filename, validate_url, ValidationError};
