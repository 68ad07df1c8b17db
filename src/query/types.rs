//! Core types shared by the compiler and backends

use super::literal::Literal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Range bounds for range predicates
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    /// Greater than or equal to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Literal>,
    /// Greater than
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<Literal>,
    /// Less than or equal to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Literal>,
    /// Less than
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<Literal>,
}

impl RangeBounds {
    /// Check if no bound is set
    pub fn is_empty(&self) -> bool {
        self.gte.is_none() && self.gt.is_none() && self.lte.is_none() && self.lt.is_none()
    }

    /// Check a value against every bound, given a comparison function
    ///
    /// `compare(bound)` returns the ordering of the candidate value relative
    /// to `bound`, or `None` when the two are not comparable (which fails the
    /// bound).
    pub fn contains_by<F>(&self, compare: F) -> bool
    where
        F: Fn(&Literal) -> Option<Ordering>,
    {
        let check = |bound: &Option<Literal>, accept: fn(Ordering) -> bool| match bound {
            Some(b) => compare(b).is_some_and(accept),
            None => true,
        };
        check(&self.gte, |o| o != Ordering::Less)
            && check(&self.gt, |o| o == Ordering::Greater)
            && check(&self.lte, |o| o != Ordering::Greater)
            && check(&self.lt, |o| o == Ordering::Less)
    }

    /// Check if a float value is within this range
    pub fn contains_f64(&self, value: f64) -> bool {
        self.contains_by(|bound| bound.as_f64().and_then(|b| value.partial_cmp(&b)))
    }
}

/// Sort direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "asc")]
    Asc,
    #[serde(alias = "desc")]
    Desc,
}

/// Client sort request on a logical field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Sort on a resolved physical path
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortClause {
    pub path: String,
    pub direction: SortDirection,
}
