//! Facet and stats request mapping
//!
//! Facet and stats keys are logical field names. They are resolved through
//! the same snapshot as the filter, sent to the backend as bounded terms
//! aggregations, and the returned buckets are mapped back onto the logical
//! keys.

use super::stats::NumericStats;
use super::{AggregationRequest, AggregationResult};
use crate::error::{QueryGateError, Result};
use crate::query::QueryContext;
use crate::schema::{DataType, FieldPaths, ResolvedField};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Prefix of stats aggregation names
pub const STATS_PREFIX: &str = "stats_";

/// `{logical key: {value: doc count}}`
pub type FacetCounts = BTreeMap<String, BTreeMap<String, u64>>;

/// `{logical key: statistics}`
pub type StatsResults = BTreeMap<String, NumericStats>;

/// Maps logical facet/stats keys to backend aggregations and back
pub struct AggregationMapper;

impl AggregationMapper {
    /// Build one terms aggregation per distinct facet key
    pub fn facet_requests(keys: &[String], ctx: &QueryContext, cap: usize) -> Result<Vec<AggregationRequest>> {
        let mut requests: Vec<AggregationRequest> = Vec::with_capacity(keys.len());
        for key in keys {
            if requests.iter().any(|r| r.key == *key) {
                continue;
            }
            let (path, data_type) = Self::resolve(key, ctx)?;
            if data_type == Some(DataType::Entity) {
                return Err(QueryGateError::InvalidRequest(format!(
                    "cannot facet on entity property '{}'",
                    key
                )));
            }
            requests.push(AggregationRequest {
                name: key.clone(),
                key: key.clone(),
                path,
                data_type,
                max_buckets: cap,
            });
        }
        Ok(requests)
    }

    /// Build one terms aggregation per distinct stats key
    ///
    /// Stats keys must name INT or DOUBLE properties.
    pub fn stats_requests(keys: &[String], ctx: &QueryContext, cap: usize) -> Result<Vec<AggregationRequest>> {
        let mut requests: Vec<AggregationRequest> = Vec::with_capacity(keys.len());
        for key in keys {
            if requests.iter().any(|r| r.key == *key) {
                continue;
            }
            let (path, data_type) = Self::resolve(key, ctx)?;
            if let Some(data_type) = data_type.filter(|t| !t.is_numeric()) {
                return Err(QueryGateError::type_mismatch(key.as_str(), DataType::Double, data_type));
            }
            requests.push(AggregationRequest {
                name: format!("{STATS_PREFIX}{key}"),
                key: key.clone(),
                path,
                data_type,
                max_buckets: cap,
            });
        }
        Ok(requests)
    }

    fn resolve(key: &str, ctx: &QueryContext) -> Result<(String, Option<DataType>)> {
        let root = ctx.root()?;
        let snapshot = ctx.snapshot();
        match snapshot.resolve_field(key, root)? {
            ResolvedField::Property(property) => {
                let FieldPaths { exact, .. } = snapshot.resolve_paths(property, root)?;
                debug!(key, path = %exact, "resolved aggregation key");
                Ok((exact, Some(property.data_type())))
            }
            ResolvedField::RawPath(path) => Ok((path, None)),
        }
    }

    /// Map facet buckets onto their logical keys
    ///
    /// A facet with no result from the backend maps to an empty distribution.
    pub fn map_facets(requests: &[AggregationRequest], results: &HashMap<String, AggregationResult>) -> FacetCounts {
        requests
            .iter()
            .map(|request| {
                let counts: BTreeMap<String, u64> = results
                    .get(&request.name)
                    .map(|result| {
                        result
                            .buckets
                            .iter()
                            .map(|b| (b.key.to_plain_string(), b.doc_count))
                            .collect()
                    })
                    .unwrap_or_default();
                (request.key.clone(), counts)
            })
            .collect()
    }

    /// Compute statistics for each stats request
    pub fn map_stats(requests: &[AggregationRequest], results: &HashMap<String, AggregationResult>) -> StatsResults {
        requests
            .iter()
            .map(|request| {
                let stats = results
                    .get(&request.name)
                    .map(|result| NumericStats::from_buckets(&result.buckets, result.other_doc_count))
                    .unwrap_or_default();
                (request.key.clone(), stats)
            })
            .collect()
    }
}
