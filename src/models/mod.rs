//! Core data models for image results and aggregated searches.

mod result;
mod search;

pub use result::{ResultBuilder, SearchResult};
pub use search::{AggregatedResult, SafeSearch, SearchMode};
