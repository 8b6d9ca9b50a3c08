//! # image-finder
//!
//! Image and meme search across several upstream services, with query
//! enhancement, ordered fallback and result normalization.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`enhancer`]: Rule-based query rewriting (meme table, trend and art hints)
//! - [`providers`]: Provider adapters behind one trait, plus the ordered registry
//! - [`aggregator`]: First-success / concatenate search with retry, dedup and caching
//! - [`models`]: Result and response data structures
//! - [`utils`]: HTTP client, retry, cache, validation, download and display helpers
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use image_finder::{Aggregator, Config, ProviderRegistry};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = Config::default();
//! let registry = ProviderRegistry::from_config(&config);
//! let aggregator = Aggregator::from_config(&config, &registry);
//!
//! let result = aggregator.search("distracted boyfriend", 24).await;
//! println!("Searching for: {}", result.enhanced_query);
//! for image in &result.results {
//!     println!("{}", image.image_url);
//! }
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod enhancer;
pub mod models;
pub mod providers;
pub mod utils;

// Re-export commonly used types
pub use aggregator::{AggregateError, Aggregator, ProviderFailure};
pub use config::Config;
pub use enhancer::{enhance, QueryEnhancer};
pub use models::{AggregatedResult, SafeSearch, SearchMode, SearchResult};
pub use providers::{Provider, ProviderError, ProviderRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
