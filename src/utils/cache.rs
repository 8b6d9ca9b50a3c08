//! In-process result cache keyed by the enhanced query.
//!
//! The aggregator consults the cache before calling any provider and stores
//! successful results afterwards. Entries live for the lifetime of the
//! process and expire after a fixed TTL.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::models::AggregatedResult;

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResult<T> {
    /// Item was found and is valid
    Hit(T),

    /// Item was not found
    Miss,

    /// Item was found but has expired (and has been evicted)
    Expired,
}

/// Storage for aggregated results, injected into the aggregator
pub trait ResultCache: Send + Sync + std::fmt::Debug {
    /// Look up a previously stored result
    fn get(&self, key: &str) -> CacheResult<AggregatedResult>;

    /// Store a result under `key`, replacing any previous entry
    fn put(&self, key: &str, value: &AggregatedResult);

    /// Drop every entry
    fn clear(&self);
}

#[derive(Debug)]
struct CacheEntry {
    stored_at: Instant,
    value: AggregatedResult,
}

/// Mutex-guarded map with TTL expiry
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl MemoryCache {
    /// Create a cache whose entries expire after `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Create a cache from configuration; `None` when caching is disabled
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        if !config.enabled {
            tracing::debug!("Cache is disabled");
            return None;
        }
        Some(Self::new(Duration::from_secs(config.ttl_seconds)))
    }

    /// Configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, including ones that expired but were not looked up yet
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-written, so
    // a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<AggregatedResult> {
        let mut entries = self.lock();

        let expired = match entries.get(key) {
            None => {
                tracing::debug!("Cache MISS for query: {}", key);
                return CacheResult::Miss;
            }
            Some(entry) => entry.stored_at.elapsed() >= self.ttl,
        };

        if expired {
            tracing::debug!("Cache expired for query: {}", key);
            entries.remove(key);
            return CacheResult::Expired;
        }

        tracing::debug!("Cache HIT for query: {}", key);
        match entries.get(key) {
            Some(entry) => CacheResult::Hit(entry.value.clone()),
            None => CacheResult::Miss,
        }
    }

    fn put(&self, key: &str, value: &AggregatedResult) {
        self.lock().insert(
            key.to_string(),
            CacheEntry {
                stored_at: Instant::now(),
                value: value.clone(),
            },
        );
        tracing::debug!("Cached {} results for query: {}", value.len(), key);
    }

    fn clear(&self) {
        self.lock().clear();
        tracing::debug!("Cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchResult;

    fn sample(query: &str) -> AggregatedResult {
        let mut result = AggregatedResult::empty(query);
        result.enhanced_query = format!("{} meme", query);
        result
            .results
            .push(SearchResult::new("https://example.com/a.gif", "mock"));
        result
    }

    #[test]
    fn test_cache_hit_and_miss() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.put("cat meme", &sample("cat"));

        match cache.get("cat meme") {
            CacheResult::Hit(r) => {
                assert_eq!(r.query, "cat");
                assert_eq!(r.len(), 1);
            }
            other => panic!("Expected cache hit, got {:?}", other),
        }

        assert_eq!(cache.get("dog meme"), CacheResult::Miss);
    }

    #[test]
    fn test_key_is_exact() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.put("cat meme", &sample("cat"));

        assert_eq!(cache.get("Cat meme"), CacheResult::Miss);
        assert_eq!(cache.get("cat meme "), CacheResult::Miss);
    }

    #[test]
    fn test_cache_expiration() {
        let cache = MemoryCache::new(Duration::ZERO);
        cache.put("cat meme", &sample("cat"));

        assert_eq!(cache.get("cat meme"), CacheResult::Expired);
        // Expired entries are evicted on lookup
        assert_eq!(cache.get("cat meme"), CacheResult::Miss);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.put("a", &sample("a"));
        cache.put("b", &sample("b"));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_from_config() {
        let disabled = CacheConfig {
            enabled: false,
            ttl_seconds: 60,
        };
        assert!(MemoryCache::from_config(&disabled).is_none());

        let enabled = CacheConfig {
            enabled: true,
            ttl_seconds: 90,
        };
        let cache = MemoryCache::from_config(&enabled).unwrap();
        assert_eq!(cache.ttl(), Duration::from_secs(90));
    }
}
