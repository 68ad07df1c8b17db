//! Declarative row-level access rules

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator of a rule condition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DacOperator {
    #[serde(alias = "eq")]
    Eq,
    #[serde(alias = "gt")]
    Gt,
    #[serde(alias = "gte")]
    Gte,
    #[serde(alias = "lt")]
    Lt,
    #[serde(alias = "lte")]
    Lte,
    #[serde(alias = "in")]
    In,
}

impl DacOperator {
    /// Operators other than `In` take exactly one value
    pub fn is_scalar(&self) -> bool {
        !matches!(self, DacOperator::In)
    }
}

impl fmt::Display for DacOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DacOperator::Eq => "EQ",
            DacOperator::Gt => "GT",
            DacOperator::Gte => "GTE",
            DacOperator::Lt => "LT",
            DacOperator::Lte => "LTE",
            DacOperator::In => "IN",
        };
        f.write_str(name)
    }
}

/// Reference to a property by owning entity and logical name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyKey {
    pub entity: String,
    pub property: String,
}

impl PropertyKey {
    pub fn new(entity: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            property: property.into(),
        }
    }
}

/// A single predicate contributed by a rule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DacConditionCfg {
    pub property: PropertyKey,
    pub operator: DacOperator,
    #[serde(default, alias = "conditionValues")]
    pub values: Vec<String>,
}

impl DacConditionCfg {
    pub fn new(property: PropertyKey, operator: DacOperator, values: Vec<String>) -> Self {
        Self {
            property,
            operator,
            values,
        }
    }
}

/// One named access-control policy scoped to one entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DacCfg {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    pub target_entity: String,
    #[serde(default)]
    pub conditions: Vec<DacConditionCfg>,
}

impl DacCfg {
    /// Create an active rule with no conditions
    pub fn new(id: u64, name: impl Into<String>, target_entity: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            active: true,
            target_entity: target_entity.into(),
            conditions: Vec::new(),
        }
    }

    /// Toggle the rule
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Add a condition
    pub fn with_condition(mut self, condition: DacConditionCfg) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Whether the rule is active and scoped to `entity_name`
    pub fn applies_to(&self, entity_name: &str) -> bool {
        self.active && self.target_entity.eq_ignore_ascii_case(entity_name)
    }
}
