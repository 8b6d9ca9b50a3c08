//! Mock provider for testing purposes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::models::{ResultBuilder, SearchResult};
use crate::providers::{Provider, ProviderCapabilities, ProviderOutcome, DEFAULT_TIMEOUT};

/// A provider that replays scripted outcomes.
///
/// Each call pops the next queued outcome; once the queue is empty every
/// call returns the fallback outcome (`Ok(vec![])` unless set with
/// [`MockProvider::with_results`]). Calls are counted.
#[derive(Debug)]
pub struct MockProvider {
    id: String,
    name: String,
    script: Mutex<VecDeque<ProviderOutcome>>,
    fallback: ProviderOutcome,
    delay: Option<Duration>,
    timeout: Duration,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a mock provider that returns no results.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: format!("Mock {}", id),
            id,
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(Vec::new()),
            delay: None,
            timeout: DEFAULT_TIMEOUT,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Queue an outcome for the next unscripted call.
    pub fn push_outcome(self, outcome: ProviderOutcome) -> Self {
        self.lock_script().push_back(outcome);
        self
    }

    /// Set the outcome returned once the script is exhausted.
    pub fn with_fallback(mut self, outcome: ProviderOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Return `results` whenever the script is exhausted.
    pub fn with_results(self, results: Vec<SearchResult>) -> Self {
        self.with_fallback(Ok(results))
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of times `fetch` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock_script(&self) -> MutexGuard<'_, VecDeque<ProviderOutcome>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::IMAGES
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, _query: &str, limit: usize) -> ProviderOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.lock_script().pop_front();
        let outcome = next.unwrap_or_else(|| self.fallback.clone());
        outcome.map(|mut results| {
            results.truncate(limit);
            results
        })
    }
}

/// Helper function to create a result for testing.
pub fn make_result(image_url: &str, provider: &str) -> SearchResult {
    ResultBuilder::new(image_url, provider)
        .title(format!("image from {}", provider))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;

    #[tokio::test]
    async fn test_script_then_fallback() {
        let provider = MockProvider::new("m")
            .push_outcome(Err(ProviderError::RateLimited))
            .with_results(vec![make_result("https://example.com/a.png", "m")]);

        assert_eq!(provider.fetch("q", 5).await, Err(ProviderError::RateLimited));
        assert_eq!(provider.fetch("q", 5).await.unwrap().len(), 1);
        assert_eq!(provider.fetch("q", 5).await.unwrap().len(), 1);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_limit_applied() {
        let provider = MockProvider::new("m").with_results(vec![
            make_result("https://example.com/1.png", "m"),
            make_result("https://example.com/2.png", "m"),
        ]);
        assert_eq!(provider.fetch("q", 1).await.unwrap().len(), 1);
    }
}
