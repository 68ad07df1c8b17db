//! Search orchestration
//!
//! One `search` call:
//! 1. loads the current metadata snapshot once,
//! 2. appends the entity's access policy to the caller's filter,
//! 3. compiles filter, free text, sort and aggregations against that snapshot,
//! 4. makes a single backend call,
//! 5. maps buckets back to facets and statistics.
//!
//! Any failure fails the whole request; nothing partial is returned.

use crate::aggregation::{AggregationMapper, FacetCounts, StatsResults};
use crate::backend::{BackendRequest, SearchBackend};
use crate::config::SearchSettings;
use crate::error::{QueryGateError, Result};
use crate::metrics::SearchMetrics;
use crate::query::{BoolPredicate, Predicate, QueryCompiler, QueryContext, SearchCondition, SortSpec};
use crate::schema::{MetadataSnapshot, MetadataStore, PropertyMetadata};
use crate::security::PolicyEngine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, warn};

/// Search request against one entity
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    /// Free text, matched against every string field
    pub text: Option<String>,
    pub filter: Vec<SearchCondition>,
    pub facet_keys: Vec<String>,
    pub stats_keys: Vec<String>,
    pub sort: Vec<SortSpec>,
    /// Zero-based
    pub page: Option<usize>,
    pub size: Option<usize>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_filter(mut self, condition: SearchCondition) -> Self {
        self.filter.push(condition);
        self
    }

    pub fn with_facet(mut self, key: impl Into<String>) -> Self {
        self.facet_keys.push(key.into());
        self
    }

    pub fn with_stats(mut self, key: impl Into<String>) -> Self {
        self.stats_keys.push(key.into());
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_page(mut self, page: usize, size: usize) -> Self {
        self.page = Some(page);
        self.size = Some(size);
        self
    }
}

/// Search response
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Document sources of the requested page
    pub results: Vec<Value>,
    pub facets: FacetCounts,
    pub stats: StatsResults,
    pub total_elements: u64,
    pub total_pages: u64,
}

/// Entry point tying metadata, policy, compiler and backend together
pub struct SearchService<B> {
    store: Arc<MetadataStore>,
    backend: B,
    settings: SearchSettings,
    metrics: Option<SearchMetrics>,
    next_request_id: AtomicU64,
}

impl<B: SearchBackend> SearchService<B> {
    pub fn new(store: Arc<MetadataStore>, backend: B) -> Self {
        Self {
            store,
            backend,
            settings: SearchSettings::default(),
            metrics: None,
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_metrics(mut self, metrics: SearchMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn metrics(&self) -> Option<&SearchMetrics> {
        self.metrics.as_ref()
    }

    /// Run a search against `entity`
    pub fn search(&self, entity: &str, request: SearchRequest) -> Result<SearchResponse> {
        let start = Instant::now();
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let span = info_span!("search", entity, request_id);
        let _enter = span.enter();

        let snapshot = self.store.load();
        let result = self.execute(entity, request, &snapshot, request_id);

        match &result {
            Ok(response) => {
                debug!(total = response.total_elements, "search completed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_search(entity, snapshot.generation(), start.elapsed().as_secs_f64());
                }
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "search failed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_search_error(e.kind());
                }
            }
        }
        result
    }

    fn execute(
        &self,
        entity: &str,
        request: SearchRequest,
        snapshot: &Arc<MetadataSnapshot>,
        request_id: u64,
    ) -> Result<SearchResponse> {
        snapshot.require_entity(entity)?;
        let (page, size) = self.settings.paging(request.page, request.size)?;

        let ctx = QueryContext::builder(Arc::clone(snapshot), entity)
            .settings(&self.settings)
            .request_id(request_id)
            .build();

        let secured = PolicyEngine::secure(request.filter, snapshot, entity)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_dac_conditions(secured.policy_conditions());
        }

        let mut predicate = QueryCompiler::compile_secured(&secured, &ctx)?;
        if let Some(text) = request.text.as_deref() {
            if let Some(full_text) = QueryCompiler::compile_text(text, &ctx)? {
                predicate = match predicate {
                    Predicate::MatchAll => full_text,
                    filter => BoolPredicate::new().must(filter).must(full_text).build(),
                };
            }
        }

        let sort = QueryCompiler::compile_sort(&request.sort, &ctx)?;
        let facet_requests =
            AggregationMapper::facet_requests(&request.facet_keys, &ctx, self.settings.facet_bucket_cap)?;
        let stats_requests =
            AggregationMapper::stats_requests(&request.stats_keys, &ctx, self.settings.stats_bucket_cap)?;
        if let Some(clash) = facet_requests
            .iter()
            .find(|f| stats_requests.iter().any(|s| s.name == f.name))
        {
            return Err(QueryGateError::InvalidRequest(format!(
                "facet key '{}' collides with a stats aggregation name",
                clash.key
            )));
        }

        let backend_request = BackendRequest::new(predicate)
            .with_sort(sort)
            .with_page(page, size)
            .with_aggregations(facet_requests.clone())
            .with_aggregations(stats_requests.clone());

        debug!(
            backend = self.backend.name(),
            clauses = backend_request.predicate.node_count(),
            aggregations = backend_request.aggregations.len(),
            "calling search backend"
        );
        let response = self.backend.execute(&backend_request)?;

        Ok(SearchResponse {
            facets: AggregationMapper::map_facets(&facet_requests, &response.aggregations),
            stats: AggregationMapper::map_stats(&stats_requests, &response.aggregations),
            total_elements: response.total_count,
            total_pages: response.total_count.div_ceil(size as u64),
            results: response.hits.into_iter().map(|doc| doc.source).collect(),
        })
    }

    /// List the properties of `entity` with their physical paths
    pub fn describe(&self, entity: &str) -> Result<Vec<PropertyMetadata>> {
        self.store.load().describe(entity)
    }

    /// Access-rule conditions currently in force for `entity`
    pub fn security_conditions(&self, entity: &str) -> Result<Vec<SearchCondition>> {
        PolicyEngine::security_conditions(&self.store.load(), entity)
    }
}
