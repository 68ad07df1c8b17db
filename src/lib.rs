pub mod aggregation;
pub mod backend;
pub mod config;
pub mod error;
pub mod metrics;
pub mod query;
pub mod schema;
pub mod security;
pub mod service;

pub use aggregation::{AggregationMapper, FacetCounts, NumericStats, StatsResults};
pub use backend::{BackendRequest, BackendResponse, Document, InMemoryBackend, SearchBackend};
pub use config::SearchSettings;
pub use error::{QueryGateError, Result};
pub use metrics::SearchMetrics;
pub use query::{ConditionParser, Literal, Predicate, QueryCompiler, QueryContext, SearchCondition};
pub use schema::{DataType, EntityCfg, MetadataSnapshot, MetadataStore, PropertyCfg};
pub use security::{DacCfg, PolicyEngine, SecuredFilter};
pub use service::{SearchRequest, SearchResponse, SearchService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
