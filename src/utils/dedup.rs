//! Deduplication of image results across providers.

use std::collections::HashSet;

use crate::models::SearchResult;

/// Remove results whose `image_url` was already seen
///
/// The first occurrence wins and keeps its position; relative order of the
/// remaining results is preserved. URLs are compared exactly.
pub fn deduplicate_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen: HashSet<String> = HashSet::with_capacity(results.len());

    results
        .into_iter()
        .filter(|r| seen.insert(r.image_url.clone()))
        .collect()
}

/// Indices of results that repeat an earlier `image_url`
pub fn duplicate_indices(results: &[SearchResult]) -> Vec<usize> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(results.len());

    results
        .iter()
        .enumerate()
        .filter(|(_, r)| !seen.insert(r.image_url.as_str()))
        .map(|(i, _)| i)
        .collect()
}
