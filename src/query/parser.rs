//! Filter DSL parser
//!
//! Parses the JSON filter grammar into `SearchCondition` trees. Structural
//! problems (unknown attributes, non-scalar values, operators without a
//! field) are reported as `InvalidRequest`; field names are not checked here.

use crate::error::QueryGateError;
use crate::query::condition::SearchCondition;
use crate::Result;
use serde_json::Value;

/// Parser for the JSON filter grammar
pub struct ConditionParser;

impl ConditionParser {
    /// Parse one condition node
    ///
    /// # Example
    ///
    /// ```json
    /// {
    ///   "or": [
    ///     { "field": "category", "eq": "Electronics" },
    ///     { "field": "price", "lt": 30 }
    ///   ]
    /// }
    /// ```
    pub fn parse(json: &Value) -> Result<SearchCondition> {
        if !json.is_object() {
            return Err(QueryGateError::InvalidRequest(
                "Condition must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(json.clone())
            .map_err(|e| QueryGateError::InvalidRequest(format!("Invalid condition: {}", e)))
    }

    /// Parse a top-level filter: an array of conditions, a single condition,
    /// or `null` for no filter
    pub fn parse_list(json: &Value) -> Result<Vec<SearchCondition>> {
        match json {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items.iter().map(Self::parse).collect(),
            Value::Object(_) => Ok(vec![Self::parse(json)?]),
            _ => Err(QueryGateError::InvalidRequest(
                "Filter must be an array of conditions".to_string(),
            )),
        }
    }

    /// Parse a JSON string holding a top-level filter
    pub fn parse_str(json_str: &str) -> Result<Vec<SearchCondition>> {
        let value: Value = serde_json::from_str(json_str)
            .map_err(|e| QueryGateError::InvalidRequest(format!("Invalid JSON: {}", e)))?;
        Self::parse_list(&value)
    }
}
