//! Facet and statistics aggregation
//!
//! Both facets and stats are served by bounded terms aggregations. Facets
//! report the bucket counts as-is; stats are computed from the same kind of
//! distribution.

mod mapper;
mod stats;

pub use mapper::{AggregationMapper, FacetCounts, StatsResults, STATS_PREFIX};
pub use stats::NumericStats;

use crate::query::Literal;
use crate::schema::DataType;
use serde::{Deserialize, Serialize};

/// A bounded terms aggregation over one physical path
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregationRequest {
    /// Name the backend reports the result under
    pub name: String,
    /// Logical key the caller asked for
    pub key: String,
    pub path: String,
    /// Declared type, `None` for raw paths
    pub data_type: Option<DataType>,
    pub max_buckets: usize,
}

/// One `(value, doc count)` pair
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub key: Literal,
    pub doc_count: u64,
}

/// Buckets returned for one aggregation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub buckets: Vec<Bucket>,
    /// Documents whose value fell outside the returned buckets
    #[serde(default)]
    pub other_doc_count: u64,
}
