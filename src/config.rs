use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{QueryGateError, Result};

/// Search request settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Maximum number of buckets per facet
    pub facet_bucket_cap: usize,
    /// Maximum number of buckets per stats distribution
    pub stats_bucket_cap: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Maximum nesting depth of a filter condition
    pub max_condition_depth: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            facet_bucket_cap: 20,
            stats_bucket_cap: 20,
            default_page_size: 10,
            max_page_size: 1000,
            max_condition_depth: 32,
        }
    }
}

impl SearchSettings {
    /// Load settings from a JSON file; missing keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the limits are usable
    pub fn validate(&self) -> Result<()> {
        if self.facet_bucket_cap == 0 || self.stats_bucket_cap == 0 {
            return Err(QueryGateError::Configuration(
                "bucket caps must be at least 1".to_string(),
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(QueryGateError::Configuration(format!(
                "default page size {} must be between 1 and {}",
                self.default_page_size, self.max_page_size
            )));
        }
        if self.max_condition_depth == 0 {
            return Err(QueryGateError::Configuration(
                "max condition depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply defaults and limits to a requested page
    ///
    /// Returns `(page, size)`.
    pub fn paging(&self, page: Option<usize>, size: Option<usize>) -> Result<(usize, usize)> {
        let size = size.unwrap_or(self.default_page_size);
        if size == 0 || size > self.max_page_size {
            return Err(QueryGateError::InvalidRequest(format!(
                "page size must be between 1 and {}, got {}",
                self.max_page_size, size
            )));
        }
        Ok((page.unwrap_or(0), size))
    }

    /// Set the facet bucket cap
    pub fn with_facet_bucket_cap(mut self, cap: usize) -> Self {
        self.facet_bucket_cap = cap;
        self
    }

    /// Set the stats bucket cap
    pub fn with_stats_bucket_cap(mut self, cap: usize) -> Self {
        self.stats_bucket_cap = cap;
        self
    }

    /// Set the page size used when a request does not give one
    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    /// Set the largest accepted page size
    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }

    /// Set the maximum filter nesting depth
    pub fn with_max_condition_depth(mut self, depth: usize) -> Self {
        self.max_condition_depth = depth;
        self
    }
}
