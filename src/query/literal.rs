//! Typed literal values
//!
//! Client values are parsed into a `Literal` once, at deserialization time.
//! Coercion to a property's declared type happens during compilation.

use crate::error::{QueryGateError, Result};
use crate::schema::DataType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A scalar value in a filter or predicate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Date(DateTime<Utc>),
}

impl Literal {
    /// Numeric view, parsing strings if needed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(v) => Some(*v as f64),
            Literal::Float(v) => Some(*v),
            Literal::String(s) => s.trim().parse().ok(),
            Literal::Bool(_) | Literal::Date(_) => None,
        }
    }

    /// Date view, parsing strings and epoch milliseconds if needed
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Literal::Date(d) => Some(*d),
            Literal::String(s) => parse_date(s),
            Literal::Int(millis) => DateTime::from_timestamp_millis(*millis),
            Literal::Float(_) | Literal::Bool(_) => None,
        }
    }

    /// Coerce this literal to `data_type`
    ///
    /// `field` is only used for error reporting.
    pub fn coerce(&self, data_type: DataType, field: &str) -> Result<Literal> {
        let mismatch = || QueryGateError::type_mismatch(field, data_type, self);
        match data_type {
            DataType::String => Ok(match self {
                Literal::String(s) => Literal::String(s.clone()),
                Literal::Int(v) => Literal::String(v.to_string()),
                Literal::Float(v) => Literal::String(v.to_string()),
                Literal::Bool(v) => Literal::String(v.to_string()),
                Literal::Date(d) => Literal::String(d.to_rfc3339()),
            }),
            DataType::Int => match self {
                Literal::Int(v) => Ok(Literal::Int(*v)),
                Literal::Float(v) => integral(*v).map(Literal::Int).ok_or_else(mismatch),
                Literal::String(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .ok()
                        .or_else(|| s.parse::<f64>().ok().and_then(integral))
                        .map(Literal::Int)
                        .ok_or_else(mismatch)
                }
                Literal::Bool(_) | Literal::Date(_) => Err(mismatch()),
            },
            DataType::Double => match self {
                Literal::Bool(_) | Literal::Date(_) => Err(mismatch()),
                other => other
                    .as_f64()
                    .filter(|v| v.is_finite())
                    .map(Literal::Float)
                    .ok_or_else(mismatch),
            },
            DataType::Boolean => match self {
                Literal::Bool(v) => Ok(Literal::Bool(*v)),
                Literal::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(Literal::Bool(true)),
                Literal::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(Literal::Bool(false)),
                _ => Err(mismatch()),
            },
            DataType::Date => self.as_date().map(Literal::Date).ok_or_else(mismatch),
            DataType::Entity => Err(mismatch()),
        }
    }

    /// Render as plain text (no quoting), as used for bucket keys and text operators
    pub fn to_plain_string(&self) -> String {
        match self {
            Literal::String(s) => s.clone(),
            Literal::Int(v) => v.to_string(),
            Literal::Float(v) => v.to_string(),
            Literal::Bool(v) => v.to_string(),
            Literal::Date(d) => d.to_rfc3339(),
        }
    }
}

/// Parse an ISO date (`YYYY-MM-DD`) or an RFC 3339 timestamp
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn integral(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

impl TryFrom<Value> for Literal {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(Literal::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Literal::Int(i)),
                None => n
                    .as_f64()
                    .map(Literal::Float)
                    .ok_or_else(|| format!("unsupported number {n}")),
            },
            Value::String(s) => Ok(Literal::String(s)),
            other => Err(format!("expected a scalar value, got {other}")),
        }
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Int(v) => Value::from(v),
            Literal::Float(v) => Value::from(v),
            Literal::Bool(v) => Value::Bool(v),
            Literal::String(s) => Value::String(s),
            Literal::Date(d) => Value::String(d.to_rfc3339()),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "\"{s}\""),
            other => f.write_str(&other.to_plain_string()),
        }
    }
}
