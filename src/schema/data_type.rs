//! Property data types
//!
//! Determines how a property's literals are coerced and which operators and
//! aggregations make sense for it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared type of a property
///
/// Parsing is case-insensitive and lenient: `INTEGER` and `FLOAT` are accepted
/// as aliases, and anything unrecognized (or absent) falls back to `String`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    #[default]
    String,
    Int,
    Double,
    Boolean,
    Date,
    /// Relationship ("bridge") to another entity
    Entity,
}

impl DataType {
    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "STRING",
            DataType::Int => "INT",
            DataType::Double => "DOUBLE",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Entity => "ENTITY",
        }
    }

    /// Whether this type holds numbers
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Double)
    }

    /// Check if this type supports range operators
    pub fn supports_range(&self) -> bool {
        matches!(self, DataType::Int | DataType::Double | DataType::Date)
    }

    /// Check if this type supports text operators (`contains`, `startsWith`)
    pub fn supports_text(&self) -> bool {
        matches!(self, DataType::String)
    }

    /// Check if this property can be filtered, sorted or aggregated at all
    pub fn is_searchable(&self) -> bool {
        !matches!(self, DataType::Entity)
    }
}

impl FromStr for DataType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "INT" | "INTEGER" | "LONG" => DataType::Int,
            "DOUBLE" | "FLOAT" => DataType::Double,
            "BOOLEAN" | "BOOL" => DataType::Boolean,
            "DATE" => DataType::Date,
            "ENTITY" => DataType::Entity,
            _ => DataType::String,
        })
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("int".parse::<DataType>().unwrap(), DataType::Int);
        assert_eq!("Integer".parse::<DataType>().unwrap(), DataType::Int);
        assert_eq!("FLOAT".parse::<DataType>().unwrap(), DataType::Double);
        assert_eq!("boolean".parse::<DataType>().unwrap(), DataType::Boolean);
        assert_eq!("ENTITY".parse::<DataType>().unwrap(), DataType::Entity);
    }

    #[test]
    fn test_unknown_defaults_to_string() {
        assert_eq!("geo_point".parse::<DataType>().unwrap(), DataType::String);
        assert_eq!("".parse::<DataType>().unwrap(), DataType::String);
        assert_eq!(DataType::default(), DataType::String);
    }

    #[test]
    fn test_capabilities() {
        assert!(DataType::Int.supports_range());
        assert!(DataType::Date.supports_range());
        assert!(!DataType::String.supports_range());
        assert!(DataType::String.supports_text());
        assert!(!DataType::Entity.is_searchable());
        assert!(DataType::Double.is_numeric());
        assert!(!DataType::Date.is_numeric());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&DataType::Double).unwrap();
        assert_eq!(json, "\"DOUBLE\"");

        let parsed: DataType = serde_json::from_str("\"integer\"").unwrap();
        assert_eq!(parsed, DataType::Int);
    }
}
