//! Multi-provider search with fallback.
//!
//! [`Aggregator::search`] runs one search pass:
//!
//! 1. blank queries (or a zero limit) return an empty result without calling
//!    anything;
//! 2. the query is rewritten by the [`QueryEnhancer`] unless enhancement is
//!    disabled;
//! 3. an injected [`ResultCache`] is consulted with the enhanced query;
//! 4. providers are called one after another in registry order, either until
//!    one yields valid results ([`SearchMode::FirstSuccess`]) or all of them
//!    ([`SearchMode::Concatenate`]);
//! 5. results with a non-HTTP(S) image URL are dropped, duplicates removed
//!    (first occurrence wins) and the list truncated to `limit`.
//!
//! Each provider call is bounded by [`Provider::timeout`] and retried on
//! [`ProviderError::RateLimited`] according to the [`RetryPolicy`]. Failures
//! of individual providers are logged and only surface as an
//! [`AggregateError`] when nothing usable came back.

use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::enhancer::QueryEnhancer;
use crate::models::{AggregatedResult, SearchMode, SearchResult};
use crate::providers::{Provider, ProviderError, ProviderRegistry};
use crate::utils::{
    deduplicate_results, duplicate_indices, with_retry, CacheResult, MemoryCache, ResultCache,
    RetryPolicy,
};

/// One provider that ended in failure during a search pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderFailure {
    /// Human-readable provider name
    pub provider: String,

    /// Final error after retries
    pub error: ProviderError,

    /// Number of calls made, including retries
    pub attempts: u32,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.provider,
            self.error,
            self.error.guidance()
        )
    }
}

/// Overall failure of a search pass
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateError {
    /// Every provider returned an error
    #[error("all providers failed: {}", join_failures(.failures))]
    AllProvidersFailed { failures: Vec<ProviderFailure> },

    /// Providers answered, but every candidate had an unusable image URL
    #[error("no valid results: {dropped} candidates had invalid image URLs")]
    NoValidResults { dropped: usize },

    /// The aggregator has no provider to call
    #[error("no providers configured; add an API key or enable a keyless provider")]
    NoProviders,
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Running totals for one search pass
#[derive(Debug, Default)]
struct Tally {
    valid: Vec<SearchResult>,
    dropped: usize,
    succeeded: usize,
    failures: Vec<ProviderFailure>,
}

impl Tally {
    /// Record a provider outcome; returns how many valid results it added
    fn record(
        &mut self,
        provider: &dyn Provider,
        outcome: Result<Vec<SearchResult>, ProviderFailure>,
    ) -> usize {
        match outcome {
            Ok(results) => {
                self.succeeded += 1;
                let total = results.len();
                let (valid, invalid): (Vec<_>, Vec<_>) =
                    results.into_iter().partition(SearchResult::is_valid);

                if !invalid.is_empty() {
                    tracing::debug!(
                        "Dropped {} of {} results from {} with invalid image URLs",
                        invalid.len(),
                        total,
                        provider.name()
                    );
                }

                let added = valid.len();
                self.dropped += invalid.len();
                self.valid.extend(valid);
                added
            }
            Err(failure) => {
                tracing::warn!(
                    "{} failed after {} attempt(s): {}",
                    failure.provider,
                    failure.attempts,
                    failure.error
                );
                self.failures.push(failure);
                0
            }
        }
    }
}

/// Searches an ordered list of providers with retry, validation, dedup and caching
#[derive(Debug, Clone)]
pub struct Aggregator {
    providers: Vec<Arc<dyn Provider>>,
    mode: SearchMode,
    retry: RetryPolicy,
    enhancer: Option<QueryEnhancer>,
    cache: Option<Arc<dyn ResultCache>>,
}

impl Aggregator {
    /// Aggregator over `providers` (called in the given order), first-success
    /// mode, default retry policy, enhancement on and no cache
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            providers,
            mode: SearchMode::default(),
            retry: RetryPolicy::default(),
            enhancer: Some(QueryEnhancer::default()),
            cache: None,
        }
    }

    /// Aggregator over every provider in `registry`, configured from `config`
    pub fn from_config(config: &Config, registry: &ProviderRegistry) -> Self {
        let mut aggregator = Self::new(registry.all().cloned().collect())
            .with_mode(config.search.mode)
            .with_retry_policy(config.retry.policy());

        if !config.search.enhance {
            aggregator = aggregator.without_enhancement();
        }

        if let Some(cache) = MemoryCache::from_config(&config.cache) {
            aggregator = aggregator.with_cache(Arc::new(cache));
        }

        aggregator
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Use a custom enhancer instead of the built-in tables
    pub fn with_enhancer(mut self, enhancer: QueryEnhancer) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Send queries to providers exactly as given
    pub fn without_enhancement(mut self) -> Self {
        self.enhancer = None;
        self
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// The query that a search for `raw_query` would send to providers
    pub fn enhanced_query(&self, raw_query: &str) -> String {
        match &self.enhancer {
            Some(enhancer) => enhancer.enhance(raw_query),
            None => raw_query.to_string(),
        }
    }

    /// Run one search pass and return at most `limit` results
    pub async fn search(&self, raw_query: &str, limit: usize) -> AggregatedResult {
        if raw_query.trim().is_empty() || limit == 0 {
            tracing::debug!("Skipping search for blank query or zero limit");
            return AggregatedResult::empty(raw_query);
        }

        let enhanced = self.enhanced_query(raw_query);
        if enhanced != raw_query {
            tracing::debug!("Enhanced query '{}' -> '{}'", raw_query, enhanced);
        }

        // Providers were asked for the earlier caller's limit, so a shorter
        // entry cannot answer a larger request.
        if let Some(cache) = &self.cache {
            match cache.get(&enhanced) {
                CacheResult::Hit(mut cached) if cached.results.len() >= limit => {
                    cached.query = raw_query.to_string();
                    cached.results.truncate(limit);
                    return cached;
                }
                CacheResult::Hit(cached) => tracing::debug!(
                    "Cached entry for '{}' has {} results, {} requested; refetching",
                    enhanced,
                    cached.results.len(),
                    limit
                ),
                _ => {}
            }
        }

        let mut result = AggregatedResult::empty(raw_query);
        result.enhanced_query = enhanced.clone();

        if self.providers.is_empty() {
            tracing::warn!("Search requested with no providers configured");
            result.error = Some(AggregateError::NoProviders);
            return result;
        }

        let tally = match self.mode {
            SearchMode::FirstSuccess => self.first_success(&enhanced, limit).await,
            SearchMode::Concatenate => self.concatenate(&enhanced, limit).await,
        };

        let duplicates = duplicate_indices(&tally.valid).len();
        if duplicates > 0 {
            tracing::debug!("Removed {} duplicate results", duplicates);
        }

        let mut results = deduplicate_results(tally.valid);
        results.truncate(limit);
        result.results = results;

        if tally.succeeded == 0 {
            result.error = Some(AggregateError::AllProvidersFailed {
                failures: tally.failures,
            });
        } else if result.results.is_empty() && tally.dropped > 0 {
            result.error = Some(AggregateError::NoValidResults {
                dropped: tally.dropped,
            });
        }

        match &result.error {
            Some(error) => tracing::warn!("Search for '{}' failed: {}", enhanced, error),
            None => tracing::info!(
                "Search for '{}' returned {} results",
                enhanced,
                result.results.len()
            ),
        }

        if let Some(cache) = &self.cache {
            if result.error.is_none() && !result.results.is_empty() {
                cache.put(&enhanced, &result);
            }
        }

        result
    }

    async fn first_success(&self, query: &str, limit: usize) -> Tally {
        let mut tally = Tally::default();

        for provider in &self.providers {
            let outcome = self.call_provider(provider, query, limit).await;
            if tally.record(provider.as_ref(), outcome) > 0 {
                tracing::debug!("Using results from {}", provider.name());
                break;
            }
        }

        tally
    }

    async fn concatenate(&self, query: &str, limit: usize) -> Tally {
        let mut tally = Tally::default();

        for provider in &self.providers {
            let outcome = self.call_provider(provider, query, limit).await;
            tally.record(provider.as_ref(), outcome);
        }

        tally
    }

    /// One provider, bounded by its timeout and retried while rate limited
    async fn call_provider(
        &self,
        provider: &Arc<dyn Provider>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, ProviderFailure> {
        let mut attempts: u32 = 0;
        let timeout = provider.timeout();

        let outcome = with_retry(self.retry, provider.name(), || {
            attempts += 1;
            let provider = Arc::clone(provider);
            async move {
                match tokio::time::timeout(timeout, provider.fetch(query, limit)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ProviderError::Timeout),
                }
            }
        })
        .await;

        outcome.map_err(|error| ProviderFailure {
            provider: provider.name().to_string(),
            error,
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::make_result;
    use crate::providers::MockProvider;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::default().base_delay(Duration::from_millis(1))
    }

    fn results(provider: &str, count: usize) -> Vec<SearchResult> {
        (0..count)
            .map(|i| make_result(&format!("https://{}.example/{}.gif", provider, i), provider))
            .collect()
    }

    fn aggregator(providers: &[&Arc<MockProvider>]) -> Aggregator {
        Aggregator::new(
            providers
                .iter()
                .map(|p| Arc::clone(*p) as Arc<dyn Provider>)
                .collect(),
        )
        .with_retry_policy(fast_retry())
    }

    #[tokio::test]
    async fn test_first_success_retries_rate_limit() {
        let a = Arc::new(
            MockProvider::new("a")
                .push_outcome(Err(ProviderError::RateLimited))
                .push_outcome(Err(ProviderError::RateLimited))
                .with_results(results("a", 5)),
        );
        let b = Arc::new(MockProvider::new("b").with_results(results("b", 5)));

        let result = aggregator(&[&a, &b]).search("pepe", 24).await;

        assert_eq!(result.enhanced_query, "pepe the frog meme");
        assert_eq!(result.results, results("a", 5));
        assert_eq!(result.error, None);
        assert_eq!(a.calls(), 3);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_first_success_falls_through_failures_and_empty() {
        let a = Arc::new(MockProvider::new("a").with_fallback(Err(ProviderError::Forbidden(
            "HTTP 403".into(),
        ))));
        let b = Arc::new(MockProvider::new("b"));
        let c = Arc::new(MockProvider::new("c").with_results(results("c", 2)));

        let result = aggregator(&[&a, &b, &c]).search("a quiet mountain lake", 24).await;

        assert_eq!(result.results, results("c", 2));
        // Forbidden is not retried
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
        assert_eq!(c.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted_moves_on() {
        let a = Arc::new(MockProvider::new("a").with_fallback(Err(ProviderError::RateLimited)));
        let b = Arc::new(MockProvider::new("b").with_results(results("b", 1)));

        let result = aggregator(&[&a, &b]).search("cat", 24).await;

        assert_eq!(a.calls(), 4);
        assert_eq!(result.results, results("b", 1));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_concatenate_with_timeout() {
        let a = Arc::new(MockProvider::new("a").with_results(results("a", 3)));
        let b = Arc::new(
            MockProvider::new("b")
                .with_results(results("b", 3))
                .with_delay(Duration::from_millis(200))
                .with_timeout(Duration::from_millis(20)),
        );

        let result = aggregator(&[&a, &b])
            .with_mode(SearchMode::Concatenate)
            .search("cat", 24)
            .await;

        assert_eq!(result.results, results("a", 3));
        assert_eq!(result.error, None);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_concatenate_keeps_provider_order_and_dedups() {
        let shared = make_result("https://shared.example/x.gif", "a");
        let a = Arc::new(MockProvider::new("a").with_results(vec![
            shared.clone(),
            make_result("https://a.example/1.gif", "a"),
        ]));
        let b = Arc::new(MockProvider::new("b").with_results(vec![
            make_result("https://b.example/1.gif", "b"),
            make_result("https://shared.example/x.gif", "b"),
        ]));

        let result = aggregator(&[&a, &b])
            .with_mode(SearchMode::Concatenate)
            .search("cat", 24)
            .await;

        let urls: Vec<&str> = result.results.iter().map(|r| r.image_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://shared.example/x.gif",
                "https://a.example/1.gif",
                "https://b.example/1.gif"
            ]
        );
        assert_eq!(result.results[0].provider, "a");
    }

    #[tokio::test]
    async fn test_all_network_failures_composite_error() {
        let a = Arc::new(
            MockProvider::new("a")
                .with_name("Giphy")
                .with_fallback(Err(ProviderError::Network("connection refused".into()))),
        );
        let b = Arc::new(
            MockProvider::new("b")
                .with_name("Bing Images")
                .with_fallback(Err(ProviderError::Network("reset".into()))),
        );

        let result = aggregator(&[&a, &b]).search("cat", 24).await;

        assert!(result.results.is_empty());
        let error = result.error.expect("composite error");
        match &error {
            AggregateError::AllProvidersFailed { failures } => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].attempts, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
        let message = error.to_string();
        assert!(message.contains("Giphy: network error: connection refused"));
        assert!(message.contains("Bing Images: network error: reset"));
        assert!(message.contains("check your connection"));
    }

    #[tokio::test]
    async fn test_rate_limit_guidance_in_message() {
        let a = Arc::new(MockProvider::new("a").with_fallback(Err(ProviderError::RateLimited)));

        let result = aggregator(&[&a])
            .with_retry_policy(RetryPolicy::none())
            .search("cat", 24)
            .await;

        let message = result.error.map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("wait a minute before retrying"));
        assert_eq!(a.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_urls_never_returned() {
        let a = Arc::new(MockProvider::new("a").with_results(vec![
            make_result("ftp://a.example/1.gif", "a"),
            make_result("/relative/2.gif", "a"),
            make_result("https://a.example/ok.gif", "a"),
        ]));

        let result = aggregator(&[&a]).search("cat", 24).await;

        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].image_url, "https://a.example/ok.gif");
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_all_invalid_is_error() {
        let a = Arc::new(MockProvider::new("a").with_results(vec![
            make_result("data:image/gif;base64,AAAA", "a"),
            make_result("javascript:alert(1)", "a"),
        ]));
        let b = Arc::new(MockProvider::new("b").with_fallback(Err(ProviderError::Timeout)));

        let result = aggregator(&[&a, &b]).search("cat", 24).await;

        assert!(result.results.is_empty());
        assert_eq!(result.error, Some(AggregateError::NoValidResults { dropped: 2 }));
        // a had no valid results, so first-success moves on to b
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_success_is_not_error() {
        let a = Arc::new(MockProvider::new("a").with_fallback(Err(ProviderError::Timeout)));
        let b = Arc::new(MockProvider::new("b"));

        let result = aggregator(&[&a, &b]).search("zzzz qqqq xxxx", 24).await;

        assert!(result.results.is_empty());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_blank_query_and_zero_limit() {
        let a = Arc::new(MockProvider::new("a").with_results(results("a", 2)));
        let aggregator = aggregator(&[&a]);

        let result = aggregator.search("   ", 24).await;
        assert!(result.results.is_empty());
        assert!(result.error.is_none());

        let result = aggregator.search("cat", 0).await;
        assert!(result.results.is_empty());

        assert_eq!(a.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_providers() {
        let result = Aggregator::new(Vec::new()).search("cat", 24).await;
        assert_eq!(result.error, Some(AggregateError::NoProviders));
    }

    #[tokio::test]
    async fn test_truncates_to_limit() {
        let a = Arc::new(MockProvider::new("a").with_results(results("a", 3)));
        let b = Arc::new(MockProvider::new("b").with_results(results("b", 3)));

        let result = aggregator(&[&a, &b])
            .with_mode(SearchMode::Concatenate)
            .search("cat", 4)
            .await;

        assert_eq!(result.results.len(), 4);
        assert_eq!(result.results[3].provider, "b");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_providers() {
        let a = Arc::new(MockProvider::new("a").with_results(results("a", 5)));
        let cache = Arc::new(MemoryCache::new(Duration::from_secs(60)));
        let aggregator = aggregator(&[&a]).with_cache(cache.clone());

        let first = aggregator.search("cat", 24).await;
        assert_eq!(first.len(), 5);
        assert_eq!(cache.len(), 1);

        // "my cat" enhances to the same query, so it is served from the cache
        let second = aggregator.search("my cat", 2).await;
        assert_eq!(second.query, "my cat");
        assert_eq!(second.enhanced_query, "cat meme");
        assert_eq!(second.len(), 2);
        assert_eq!(a.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_entry_smaller_than_limit_is_refetched() {
        let a = Arc::new(MockProvider::new("a").with_results(results("a", 5)));
        let cache = Arc::new(MemoryCache::new(Duration::from_secs(60)));
        let aggregator = aggregator(&[&a]).with_cache(cache.clone());

        assert_eq!(aggregator.search("cat", 2).await.len(), 2);

        let larger = aggregator.search("cat", 24).await;
        assert_eq!(larger.len(), 5);
        assert_eq!(a.calls(), 2);

        // The refetched entry replaced the short one and now covers smaller limits
        assert_eq!(aggregator.search("cat", 3).await.len(), 3);
        assert_eq!(a.calls(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let a = Arc::new(
            MockProvider::new("a")
                .push_outcome(Err(ProviderError::Timeout))
                .with_results(results("a", 1)),
        );
        let cache = Arc::new(MemoryCache::new(Duration::from_secs(60)));
        let aggregator = aggregator(&[&a]).with_cache(cache.clone());

        assert!(aggregator.search("cat", 24).await.is_error());
        assert!(cache.is_empty());

        assert_eq!(aggregator.search("cat", 24).await.len(), 1);
        assert_eq!(a.calls(), 2);
    }

    #[tokio::test]
    async fn test_without_enhancement() {
        let a = Arc::new(MockProvider::new("a").with_results(results("a", 1)));
        let result = aggregator(&[&a])
            .without_enhancement()
            .search("cat", 24)
            .await;

        assert_eq!(result.enhanced_query, "cat");
        assert!(!result.is_enhanced());
    }

    #[test]
    fn test_error_serialization() {
        let error = AggregateError::AllProvidersFailed {
            failures: vec![ProviderFailure {
                provider: "Tenor".into(),
                error: ProviderError::RateLimited,
                attempts: 4,
            }],
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["kind"], "all_providers_failed");
        assert_eq!(json["failures"][0]["attempts"], 4);
        assert_eq!(json["failures"][0]["error"]["kind"], "rate_limited");
    }
}
