//! Numeric statistics derived from a term distribution
//!
//! The backend returns at most `cap` buckets per field. When a field has more
//! distinct values than that, the tail is missing from the distribution and
//! the statistics only describe the returned buckets; `approximate` is set
//! whenever the backend reported documents beyond the cap.

use super::Bucket;
use serde::{Deserialize, Serialize};

/// Summary statistics of one numeric field
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub sum: f64,
    pub count: u64,
    /// True when buckets beyond the cap were not counted
    pub approximate: bool,
}

impl NumericStats {
    /// Compute statistics from `(value, doc_count)` buckets
    ///
    /// Buckets whose key is not numeric are skipped. An empty distribution
    /// gives all-zero statistics.
    pub fn from_buckets(buckets: &[Bucket], other_doc_count: u64) -> Self {
        let mut stats = NumericStats {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            approximate: other_doc_count > 0,
            ..Default::default()
        };

        for bucket in buckets {
            let Some(value) = bucket.key.as_f64() else {
                continue;
            };
            if bucket.doc_count == 0 {
                continue;
            }
            stats.min = stats.min.min(value);
            stats.max = stats.max.max(value);
            stats.sum += value * bucket.doc_count as f64;
            stats.count += bucket.doc_count;
        }

        if stats.count == 0 {
            stats.min = 0.0;
            stats.max = 0.0;
        } else {
            stats.avg = stats.sum / stats.count as f64;
        }
        stats
    }
}
