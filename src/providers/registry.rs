//! Registry for image provider adapters.

use std::sync::Arc;

use super::{
    BingProvider, DuckDuckGoProvider, GiphyProvider, GoogleProvider, ImgurProvider, Provider,
    ProviderError, SerpApiProvider, TenorProvider,
};
use crate::config::Config;

bitflags::bitflags! {
    /// Capabilities that a provider can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProviderCapabilities: u32 {
        const IMAGES = 1 << 0;
        const GIFS = 1 << 1;
        const SCRAPE = 1 << 2;
        const REQUIRES_KEY = 1 << 3;
    }
}

impl ProviderCapabilities {
    /// Short labels for display, e.g. `images, gifs`
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.contains(Self::IMAGES) {
            labels.push("images");
        }
        if self.contains(Self::GIFS) {
            labels.push("gifs");
        }
        if self.contains(Self::SCRAPE) {
            labels.push("scrape");
        }
        if self.contains(Self::REQUIRES_KEY) {
            labels.push("key");
        }
        labels
    }
}

/// Ordered collection of providers
///
/// Order matters: the aggregator calls providers in registry order, so the
/// first-success mode tries them front to back.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every provider the configuration allows, in configured order
    ///
    /// Keyed providers without a key are skipped. Timeout overrides and the
    /// safe-search level are applied to each adapter.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        for id in config.search.provider_order() {
            match build_provider(&id, config) {
                Ok(Some(provider)) => registry.register(provider),
                Ok(None) => {
                    tracing::debug!("Skipping provider '{}': no API key configured", id)
                }
                Err(e) => tracing::warn!("Failed to initialize provider '{}': {}", id, e),
            }
        }

        registry
    }

    /// Register a provider; an existing provider with the same id is replaced in place
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        match self.providers.iter().position(|p| p.id() == provider.id()) {
            Some(index) => self.providers[index] = provider,
            None => self.providers.push(provider),
        }
    }

    /// Get a provider by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.id() == id)
    }

    /// Get a provider by ID, returning an error if not found
    pub fn get_required(&self, id: &str) -> Result<&Arc<dyn Provider>, ProviderError> {
        self.get(id).ok_or_else(|| {
            ProviderError::NotConfigured(format!("provider '{}' is not registered", id))
        })
    }

    /// All providers in order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.iter()
    }

    /// All provider IDs in order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.id())
    }

    /// Providers that support a specific capability
    pub fn with_capability(&self, capability: ProviderCapabilities) -> Vec<&Arc<dyn Provider>> {
        self.all()
            .filter(|p| p.capabilities().contains(capability))
            .collect()
    }

    /// Providers matching `ids`, in the order given
    ///
    /// Unknown ids are logged and skipped.
    pub fn select(&self, ids: &[String]) -> Vec<Arc<dyn Provider>> {
        ids.iter()
            .filter_map(|id| {
                let provider = self.get(id.trim());
                if provider.is_none() {
                    tracing::warn!("Unknown or unconfigured provider '{}' ignored", id);
                }
                provider.cloned()
            })
            .collect()
    }

    /// Check if a provider exists
    pub fn has(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Get the number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Construct one adapter; `Ok(None)` when its key is missing
fn build_provider(id: &str, config: &Config) -> Result<Option<Arc<dyn Provider>>, ProviderError> {
    let keys = &config.api_keys;
    let safe = config.search.safe_search;
    let timeout = config.timeouts.for_provider(id);

    macro_rules! finish {
        ($provider:expr) => {{
            let provider = $provider.with_safe_search(safe);
            let provider = match timeout {
                Some(t) => provider.with_timeout(t),
                None => provider,
            };
            Ok(Some(Arc::new(provider) as Arc<dyn Provider>))
        }};
    }

    match id {
        "giphy" => match &keys.giphy {
            Some(key) => finish!(GiphyProvider::new(key.clone())?),
            None => Ok(None),
        },
        "tenor" => match &keys.tenor {
            Some(key) => finish!(TenorProvider::new(key.clone())?),
            None => Ok(None),
        },
        "imgur" => match &keys.imgur_client_id {
            Some(key) => finish!(ImgurProvider::new(key.clone())?),
            None => Ok(None),
        },
        "serpapi" => match &keys.serpapi {
            Some(key) => finish!(SerpApiProvider::new(key.clone())?),
            None => Ok(None),
        },
        "duckduckgo" => finish!(DuckDuckGoProvider::new()?),
        "bing" => finish!(BingProvider::new()?),
        "google" => finish!(GoogleProvider::new()?),
        other => Err(ProviderError::NotConfigured(format!(
            "unknown provider '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKeys;
    use crate::providers::MockProvider;
    use std::time::Duration;

    fn keyless_config() -> Config {
        Config {
            api_keys: ApiKeys::none(),
            ..Config::default()
        }
    }

    #[test]
    fn test_from_config_without_keys() {
        let registry = ProviderRegistry::from_config(&keyless_config());

        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(ids, vec!["duckduckgo", "bing", "google"]);
        assert!(registry.with_capability(ProviderCapabilities::REQUIRES_KEY).is_empty());
    }

    #[test]
    fn test_from_config_with_keys_and_order() {
        let mut config = keyless_config();
        config.api_keys.giphy = Some("g".into());
        config.api_keys.serpapi = Some("s".into());
        config.search.providers = vec!["bing".into(), "serpapi".into(), "giphy".into(), "tenor".into()];
        config.timeouts.0.insert("bing".into(), 3);

        let registry = ProviderRegistry::from_config(&config);
        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(ids, vec!["bing", "serpapi", "giphy"]);
        assert_eq!(
            registry.get("bing").unwrap().timeout(),
            Duration::from_secs(3)
        );
        assert_eq!(
            registry.get("serpapi").unwrap().timeout(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_unknown_configured_provider_skipped() {
        let mut config = keyless_config();
        config.search.providers = vec!["flickr".into(), "google".into()];

        let registry = ProviderRegistry::from_config(&config);
        assert_eq!(registry.len(), 1);
        assert!(registry.has("google"));
    }

    #[test]
    fn test_register_and_select() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(MockProvider::new("a")));
        registry.register(Arc::new(MockProvider::new("b")));
        registry.register(Arc::new(MockProvider::new("c")));
        registry.register(Arc::new(MockProvider::new("b").with_name("B2")));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("b").unwrap().name(), "B2");

        let selected = registry.select(&["c".into(), "missing".into(), "a".into()]);
        let ids: Vec<&str> = selected.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["c", "a"]);

        assert!(registry.get_required("a").is_ok());
        assert!(matches!(
            registry.get_required("zzz"),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_capability_labels() {
        let caps = ProviderCapabilities::GIFS | ProviderCapabilities::REQUIRES_KEY;
        assert_eq!(caps.labels(), vec!["gifs", "key"]);
    }
}
