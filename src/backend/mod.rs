//! Search backend interface
//!
//! The core depends only on `SearchBackend`. A request bundles the compiled
//! predicate, the sort, the page and every aggregation into a single call, and
//! the response carries hits, the total count and the aggregation buckets.

mod memory;

pub use memory::InMemoryBackend;

use crate::aggregation::{AggregationRequest, AggregationResult};
use crate::query::{Predicate, SortClause};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A stored document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    pub source: Value,
}

impl Document {
    pub fn new(id: u64, source: Value) -> Self {
        Self { id, source }
    }
}

/// One search round trip
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BackendRequest {
    pub predicate: Predicate,
    /// Empty means relevance order
    pub sort: Vec<SortClause>,
    /// Zero-based page number
    pub page: usize,
    pub size: usize,
    pub aggregations: Vec<AggregationRequest>,
}

impl BackendRequest {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            sort: Vec::new(),
            page: 0,
            size: 10,
            aggregations: Vec::new(),
        }
    }

    pub fn with_sort(mut self, sort: Vec<SortClause>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page(mut self, page: usize, size: usize) -> Self {
        self.page = page;
        self.size = size;
        self
    }

    pub fn with_aggregations(mut self, aggregations: Vec<AggregationRequest>) -> Self {
        self.aggregations.extend(aggregations);
        self
    }

    /// Number of hits to skip
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// Result of one search round trip
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    /// Hits of the requested page
    pub hits: Vec<Document>,
    /// Matches across all pages
    pub total_count: u64,
    /// Aggregation results keyed by request name
    pub aggregations: HashMap<String, AggregationResult>,
}

/// Executes compiled searches
///
/// Failures to reach the backend are reported as `BackendUnavailable`.
pub trait SearchBackend: Send + Sync {
    /// Run one search
    fn execute(&self, request: &BackendRequest) -> Result<BackendResponse>;

    /// Short name for logging
    fn name(&self) -> &'static str {
        "backend"
    }
}

impl<T: SearchBackend + ?Sized> SearchBackend for Arc<T> {
    fn execute(&self, request: &BackendRequest) -> Result<BackendResponse> {
        (**self).execute(request)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
