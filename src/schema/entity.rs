//! Entity and property descriptors
//!
//! These are configuration data: created when metadata is loaded and never
//! mutated while requests are in flight.

use super::data_type::DataType;
use serde::{Deserialize, Serialize};

/// Suffix of the exact-match (keyword) form of a string field
pub const KEYWORD_SUFFIX: &str = "_keyword";
/// Suffix of the analyzed (text) form of a string field
pub const TEXT_SUFFIX: &str = "_text";

/// One searchable entity type, e.g. `Person` or `Product`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCfg {
    #[serde(default)]
    pub id: u64,
    /// Unique, case-insensitive
    pub name: String,
    #[serde(default)]
    pub aggregate_root: bool,
    #[serde(default)]
    pub properties: Vec<PropertyCfg>,
}

impl EntityCfg {
    /// Create an entity with no properties
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            aggregate_root: false,
            properties: Vec::new(),
        }
    }

    /// Mark the entity as an aggregate root
    pub fn aggregate_root(mut self) -> Self {
        self.aggregate_root = true;
        self
    }

    /// Add a property
    pub fn with_property(mut self, property: PropertyCfg) -> Self {
        self.properties.push(property);
        self
    }

    /// Case-insensitive name comparison
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Find an own property by logical name (case-insensitive)
    pub fn property(&self, name: &str) -> Option<&PropertyCfg> {
        self.properties
            .iter()
            .find(|p| p.property_name.eq_ignore_ascii_case(name))
    }

    /// Find the bridge property that links this entity to `entity_name`
    pub fn bridge_to(&self, entity_name: &str) -> Option<&PropertyCfg> {
        self.bridges().find(|p| {
            p.represented_entity_name
                .as_deref()
                .is_some_and(|target| target.eq_ignore_ascii_case(entity_name))
        })
    }

    /// Iterate over the bridge properties in declaration order
    pub fn bridges(&self) -> impl Iterator<Item = &PropertyCfg> {
        self.properties.iter().filter(|p| p.is_bridge())
    }
}

/// One field, or one relationship to another entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyCfg {
    #[serde(default)]
    pub id: u64,
    /// Unique within the parent entity, case-insensitive
    pub property_name: String,
    #[serde(default)]
    pub data_type: DataType,
    /// Physical path used instead of the property name
    #[serde(default, alias = "dotPath", skip_serializing_if = "Option::is_none")]
    pub dot_path_override: Option<String>,
    /// Related entity, set only for `ENTITY` properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub represented_entity_name: Option<String>,
}

impl PropertyCfg {
    /// Create a plain field
    pub fn new(id: u64, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id,
            property_name: name.into(),
            data_type,
            dot_path_override: None,
            represented_entity_name: None,
        }
    }

    /// Create a bridge property pointing at another entity
    pub fn bridge(id: u64, name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            represented_entity_name: Some(entity.into()),
            ..Self::new(id, name, DataType::Entity)
        }
    }

    /// Set the physical path override
    pub fn with_dot_path(mut self, path: impl Into<String>) -> Self {
        self.dot_path_override = Some(path.into());
        self
    }

    /// Whether this property links to another entity
    pub fn is_bridge(&self) -> bool {
        self.data_type == DataType::Entity && self.represented_entity_name.is_some()
    }

    /// Path of this property relative to its own entity
    pub fn technical_path(&self) -> &str {
        match self.dot_path_override.as_deref() {
            Some(path) if !path.is_empty() => path,
            _ => &self.property_name,
        }
    }
}

/// A property together with the entity that owns it
#[derive(Clone, Copy, Debug)]
pub struct PropertyRef<'a> {
    pub entity: &'a EntityCfg,
    pub property: &'a PropertyCfg,
}

impl<'a> PropertyRef<'a> {
    pub fn new(entity: &'a EntityCfg, property: &'a PropertyCfg) -> Self {
        Self { entity, property }
    }

    pub fn name(&self) -> &'a str {
        &self.property.property_name
    }

    pub fn data_type(&self) -> DataType {
        self.property.data_type
    }
}

/// Physical sub-paths of one resolved field
///
/// Exact-match operators and aggregations target `exact`; analyzed text
/// operators target `text`. They differ only for `_keyword` paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPaths {
    pub exact: String,
    pub text: String,
}

impl FieldPaths {
    pub fn from_path(path: impl Into<String>) -> Self {
        let exact = path.into();
        let text = match exact.strip_suffix(KEYWORD_SUFFIX) {
            Some(stem) => format!("{stem}{TEXT_SUFFIX}"),
            None => exact.clone(),
        };
        Self { exact, text }
    }
}
