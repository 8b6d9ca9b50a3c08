//! Search policy and aggregated response models.

use serde::{Deserialize, Serialize};

use crate::aggregator::AggregateError;
use crate::models::SearchResult;

/// How the aggregator combines its providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Stop at the first provider that yields at least one valid result
    #[default]
    FirstSuccess,
    /// Call every provider and concatenate their results in call order
    Concatenate,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::FirstSuccess => write!(f, "first_success"),
            SearchMode::Concatenate => write!(f, "concatenate"),
        }
    }
}

/// Content filter level forwarded to providers that support one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    Strict,
    #[default]
    Moderate,
    Off,
}

/// Outcome of one aggregation pass
///
/// `error` is only set when nothing usable came back: every provider failed,
/// every candidate was invalid, or no provider was configured. A search where
/// providers answered with zero hits is reported as an empty list with no
/// error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResult {
    /// Query exactly as the caller supplied it
    pub query: String,

    /// Query that was actually sent to providers
    pub enhanced_query: String,

    /// Ordered, deduplicated results
    pub results: Vec<SearchResult>,

    /// Overall failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AggregateError>,
}

impl AggregatedResult {
    /// An empty result with no error
    pub fn empty(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            enhanced_query: query.clone(),
            query,
            results: Vec::new(),
            error: None,
        }
    }

    /// Whether the enhancer rewrote the query
    pub fn is_enhanced(&self) -> bool {
        self.query != self.enhanced_query
    }

    /// Number of results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if there are no results
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Check if the search failed as a whole
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
