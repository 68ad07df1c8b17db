//! Per-request compilation context
//!
//! The `QueryContext` carries everything one request needs to compile its
//! filter: the metadata snapshot loaded at the start of the request, the
//! root entity, and request-scoped limits. It is passed explicitly down the
//! compile call chain and dropped with the request.

use crate::config::SearchSettings;
use crate::error::Result;
use crate::schema::{EntityCfg, MetadataSnapshot};
use std::sync::Arc;

/// Query compilation context for one request
#[derive(Clone, Debug)]
pub struct QueryContext {
    /// Snapshot every resolution in this request uses
    snapshot: Arc<MetadataSnapshot>,

    /// Name of the root entity, as supplied by the caller
    entity: String,

    /// Maximum nesting depth of a filter condition
    max_depth: usize,

    /// Identifier used in log spans
    request_id: u64,
}

impl QueryContext {
    /// Create a context with default limits
    pub fn new(snapshot: Arc<MetadataSnapshot>, entity: impl Into<String>) -> Self {
        Self {
            snapshot,
            entity: entity.into(),
            max_depth: SearchSettings::default().max_condition_depth,
            request_id: 0,
        }
    }

    /// Create a context builder
    pub fn builder(snapshot: Arc<MetadataSnapshot>, entity: impl Into<String>) -> QueryContextBuilder {
        QueryContextBuilder {
            context: Self::new(snapshot, entity),
        }
    }

    pub fn snapshot(&self) -> &MetadataSnapshot {
        &self.snapshot
    }

    pub fn entity_name(&self) -> &str {
        &self.entity
    }

    /// Get the root entity, failing with `EntityNotFound`
    pub fn root(&self) -> Result<&EntityCfg> {
        self.snapshot.require_entity(&self.entity)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }
}

/// Builder for `QueryContext`
pub struct QueryContextBuilder {
    context: QueryContext,
}

impl QueryContextBuilder {
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.context.max_depth = depth;
        self
    }

    pub fn request_id(mut self, id: u64) -> Self {
        self.context.request_id = id;
        self
    }

    /// Apply the limits from `settings`
    pub fn settings(self, settings: &SearchSettings) -> Self {
        self.max_depth(settings.max_condition_depth)
    }

    pub fn build(self) -> QueryContext {
        self.context
    }
}
