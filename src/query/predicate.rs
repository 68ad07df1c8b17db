//! Backend-neutral predicate tree
//!
//! This is the compiled form of a filter. All names in it are physical paths,
//! all values are already coerced to the target property's type. Backends
//! translate it into their own query language, or evaluate it directly.
//!
//! # Example
//!
//! ```json
//! {
//!   "bool": {
//!     "must": [
//!       { "term": { "path": "addresses.country_keyword", "value": "USA" } }
//!     ],
//!     "must_not": [
//!       { "range": { "path": "price", "bounds": { "gte": 100.0 } } }
//!     ]
//!   }
//! }
//! ```

use super::literal::Literal;
use super::types::RangeBounds;
use serde::Serialize;

/// Compiled boolean query over physical paths
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Matches every document
    MatchAll,
    Bool(BoolPredicate),
    /// Exact value at `path`
    Term { path: String, value: Literal },
    /// Any of `values` at `path`
    Terms { path: String, values: Vec<Literal> },
    /// Case-insensitive prefix; `prefix` is already lowercased
    Prefix { path: String, prefix: String },
    /// Case-insensitive substring; `substring` is already lowercased
    Contains { path: String, substring: String },
    Range { path: String, bounds: RangeBounds },
    /// Free text matched against any of `fields`
    FullText { fields: Vec<String>, query: String },
}

impl Predicate {
    pub fn term(path: impl Into<String>, value: Literal) -> Self {
        Predicate::Term {
            path: path.into(),
            value,
        }
    }

    pub fn terms(path: impl Into<String>, values: Vec<Literal>) -> Self {
        Predicate::Terms {
            path: path.into(),
            values,
        }
    }

    pub fn prefix(path: impl Into<String>, prefix: &str) -> Self {
        Predicate::Prefix {
            path: path.into(),
            prefix: prefix.to_lowercase(),
        }
    }

    pub fn contains(path: impl Into<String>, substring: &str) -> Self {
        Predicate::Contains {
            path: path.into(),
            substring: substring.to_lowercase(),
        }
    }

    pub fn range(path: impl Into<String>, bounds: RangeBounds) -> Self {
        Predicate::Range {
            path: path.into(),
            bounds,
        }
    }

    /// Get the predicate type name for debugging and logging
    pub fn query_type(&self) -> &'static str {
        match self {
            Predicate::MatchAll => "match_all",
            Predicate::Bool(_) => "bool",
            Predicate::Term { .. } => "term",
            Predicate::Terms { .. } => "terms",
            Predicate::Prefix { .. } => "prefix",
            Predicate::Contains { .. } => "contains",
            Predicate::Range { .. } => "range",
            Predicate::FullText { .. } => "full_text",
        }
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        match self {
            Predicate::Bool(b) => {
                1 + b
                    .must
                    .iter()
                    .chain(&b.should)
                    .chain(&b.must_not)
                    .map(Predicate::node_count)
                    .sum::<usize>()
            }
            _ => 1,
        }
    }
}

/// Boolean combination of predicates
///
/// - `must`: all clauses must match
/// - `should`: at least `minimum_should_match` clauses must match
/// - `must_not`: no clause may match
///
/// A document matches an empty `BoolPredicate`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BoolPredicate {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Predicate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Predicate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Predicate>,
    /// Ignored when `should` is empty
    pub minimum_should_match: usize,
}

impl BoolPredicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a must clause
    pub fn must(mut self, predicate: Predicate) -> Self {
        self.must.push(predicate);
        self
    }

    /// Add a should clause
    pub fn should(mut self, predicate: Predicate) -> Self {
        self.should.push(predicate);
        self
    }

    /// Add a must_not clause
    pub fn must_not(mut self, predicate: Predicate) -> Self {
        self.must_not.push(predicate);
        self
    }

    /// Set minimum should match
    pub fn with_minimum_should_match(mut self, msm: usize) -> Self {
        self.minimum_should_match = msm;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }

    pub fn clause_count(&self) -> usize {
        self.must.len() + self.should.len() + self.must_not.len()
    }

    pub fn build(self) -> Predicate {
        Predicate::Bool(self)
    }
}
