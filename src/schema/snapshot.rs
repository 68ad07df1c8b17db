//! Immutable metadata snapshot and path resolution
//!
//! A `MetadataSnapshot` is validated once when it is built and then only read.
//! Resolution is pure: it never performs I/O and never mutates the snapshot,
//! so any number of requests can share one snapshot without locking.

use super::data_type::DataType;
use super::entity::{EntityCfg, FieldPaths, PropertyCfg, PropertyRef};
use crate::error::{QueryGateError, Result};
use crate::security::DacCfg;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Result of resolving a logical field name
#[derive(Clone, Debug)]
pub enum ResolvedField<'a> {
    /// A modeled property, reachable from the root entity
    Property(PropertyRef<'a>),
    /// A dotted name that matched no property and is used verbatim as a
    /// physical path
    RawPath(String),
}

/// Description of one property as seen from its own entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMetadata {
    pub name: String,
    pub data_type: DataType,
    pub path: String,
}

/// Validated, read-only view of all entity metadata and access rules
#[derive(Clone, Debug, Default)]
pub struct MetadataSnapshot {
    entities: Vec<EntityCfg>,
    /// Lower-cased entity name -> index into `entities`
    by_name: HashMap<String, usize>,
    rules: Vec<DacCfg>,
    generation: u64,
}

impl MetadataSnapshot {
    /// Create an empty snapshot
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build and validate a snapshot
    ///
    /// Fails with `Configuration` if the entity graph or the rules are
    /// inconsistent.
    pub fn build(entities: Vec<EntityCfg>, rules: Vec<DacCfg>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(entities.len());
        for (idx, entity) in entities.iter().enumerate() {
            if by_name.insert(entity.name.to_lowercase(), idx).is_some() {
                return Err(QueryGateError::Configuration(format!(
                    "duplicate entity name '{}'",
                    entity.name
                )));
            }
        }

        let snapshot = Self {
            entities,
            by_name,
            rules,
            generation: 0,
        };
        snapshot.validate_entities()?;
        snapshot.validate_rules()?;
        Ok(snapshot)
    }

    fn validate_entities(&self) -> Result<()> {
        for entity in &self.entities {
            let mut names = HashSet::new();
            let mut targets = HashSet::new();
            for property in &entity.properties {
                if !names.insert(property.property_name.to_lowercase()) {
                    return Err(QueryGateError::Configuration(format!(
                        "duplicate property '{}' on entity '{}'",
                        property.property_name, entity.name
                    )));
                }
                if property.data_type != DataType::Entity {
                    continue;
                }
                let target = property.represented_entity_name.as_deref().ok_or_else(|| {
                    QueryGateError::Configuration(format!(
                        "property '{}.{}' is an ENTITY without a represented entity",
                        entity.name, property.property_name
                    ))
                })?;
                if self.entity(target).is_none() {
                    return Err(QueryGateError::Configuration(format!(
                        "bridge '{}.{}' points at unknown entity '{}'",
                        entity.name, property.property_name, target
                    )));
                }
                if !targets.insert(target.to_lowercase()) {
                    return Err(QueryGateError::Configuration(format!(
                        "entity '{}' declares more than one bridge to '{}'",
                        entity.name, target
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_rules(&self) -> Result<()> {
        for rule in &self.rules {
            if self.entity(&rule.target_entity).is_none() {
                return Err(QueryGateError::Configuration(format!(
                    "rule '{}' targets unknown entity '{}'",
                    rule.name, rule.target_entity
                )));
            }
            for condition in &rule.conditions {
                let key = &condition.property;
                let owner = self.entity(&key.entity).ok_or_else(|| {
                    QueryGateError::Configuration(format!(
                        "rule '{}' references unknown entity '{}'",
                        rule.name, key.entity
                    ))
                })?;
                if owner.property(&key.property).is_none() {
                    return Err(QueryGateError::Configuration(format!(
                        "rule '{}' references unknown property '{}.{}'",
                        rule.name, key.entity, key.property
                    )));
                }
                let arity_ok = if condition.operator.is_scalar() {
                    condition.values.len() == 1
                } else {
                    !condition.values.is_empty()
                };
                if !arity_ok {
                    return Err(QueryGateError::Configuration(format!(
                        "rule '{}' has {} values for operator {}",
                        rule.name,
                        condition.values.len(),
                        condition.operator
                    )));
                }
            }
        }
        Ok(())
    }

    /// Publication counter, bumped by the store on every swap
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// All entities in load order
    pub fn entities(&self) -> &[EntityCfg] {
        &self.entities
    }

    /// All rules, active or not
    pub fn rules(&self) -> &[DacCfg] {
        &self.rules
    }

    /// Active rules scoped to `entity_name`, in load order
    pub fn active_rules_for<'a>(&'a self, entity_name: &'a str) -> impl Iterator<Item = &'a DacCfg> {
        self.rules.iter().filter(move |r| r.applies_to(entity_name))
    }

    /// Look up an entity by name (case-insensitive)
    pub fn entity(&self, name: &str) -> Option<&EntityCfg> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&idx| &self.entities[idx])
    }

    /// Look up an entity, failing with `EntityNotFound`
    pub fn require_entity(&self, name: &str) -> Result<&EntityCfg> {
        self.entity(name)
            .ok_or_else(|| QueryGateError::EntityNotFound(name.to_string()))
    }

    /// Entities reachable from `root` through one bridge, in bridge order
    pub fn bridged_entities<'a>(&'a self, root: &'a EntityCfg) -> impl Iterator<Item = &'a EntityCfg> {
        root.bridges().filter_map(move |bridge| {
            bridge
                .represented_entity_name
                .as_deref()
                .and_then(|name| self.entity(name))
        })
    }

    /// Find a property by logical name, reachable from `root`
    ///
    /// The root's own properties always win over a one-hop child property
    /// with the same name.
    pub fn find_property<'a>(&'a self, logical_name: &str, root: &'a EntityCfg) -> Result<PropertyRef<'a>> {
        if let Some(property) = root.property(logical_name) {
            return Ok(PropertyRef::new(root, property));
        }
        self.bridged_entities(root)
            .find_map(|child| {
                child
                    .property(logical_name)
                    .map(|property| PropertyRef::new(child, property))
            })
            .ok_or_else(|| QueryGateError::field_not_found(logical_name, &root.name))
    }

    /// Resolve a logical field, falling back to a raw physical path when the
    /// name contains a dot and matches no property
    pub fn resolve_field<'a>(&'a self, logical_name: &str, root: &'a EntityCfg) -> Result<ResolvedField<'a>> {
        match self.find_property(logical_name, root) {
            Ok(property) => Ok(ResolvedField::Property(property)),
            Err(QueryGateError::FieldNotFound { .. }) if logical_name.contains('.') => {
                debug!(field = logical_name, "using direct path");
                Ok(ResolvedField::RawPath(logical_name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Physical path of `property` as seen from `root`
    ///
    /// Only one hop is traversed: the property must belong to `root` or to an
    /// entity that `root` bridges to directly.
    pub fn resolve_path(&self, property: PropertyRef<'_>, root: &EntityCfg) -> Result<String> {
        let technical = property.property.technical_path();
        if property.entity.is_named(&root.name) {
            return Ok(technical.to_string());
        }
        let bridge = root
            .bridge_to(&property.entity.name)
            .ok_or_else(|| QueryGateError::field_not_found(property.name(), &root.name))?;
        Ok(format!("{}.{}", bridge.technical_path(), technical))
    }

    /// Exact and text sub-paths of `property` as seen from `root`
    pub fn resolve_paths(&self, property: PropertyRef<'_>, root: &EntityCfg) -> Result<FieldPaths> {
        self.resolve_path(property, root).map(FieldPaths::from_path)
    }

    /// Declared type of a property
    pub fn property_type(property: &PropertyCfg) -> DataType {
        property.data_type
    }

    /// List the properties of an entity with their paths
    pub fn describe(&self, entity_name: &str) -> Result<Vec<PropertyMetadata>> {
        let entity = self.require_entity(entity_name)?;
        entity
            .properties
            .iter()
            .map(|property| -> Result<PropertyMetadata> {
                let path = self.resolve_path(PropertyRef::new(entity, property), entity)?;
                Ok(PropertyMetadata {
                    name: property.property_name.clone(),
                    data_type: property.data_type,
                    path,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{DacConditionCfg, DacOperator, PropertyKey};

    fn product_entities() -> Vec<EntityCfg> {
        vec![
            EntityCfg::new(1, "Product")
                .aggregate_root()
                .with_property(PropertyCfg::new(1, "name", DataType::String).with_dot_path("name_keyword"))
                .with_property(PropertyCfg::new(2, "price", DataType::Double))
                .with_property(PropertyCfg::bridge(3, "reviews", "Review")),
            EntityCfg::new(2, "Review")
                .with_property(PropertyCfg::new(4, "rating", DataType::Int))
                .with_property(PropertyCfg::new(5, "name", DataType::String)),
        ]
    }

    fn snapshot() -> MetadataSnapshot {
        MetadataSnapshot::build(product_entities(), Vec::new()).unwrap()
    }

    #[test]
    fn test_resolve_own_property() {
        let snapshot = snapshot();
        let root = snapshot.entity("product").unwrap();
        let property = snapshot.find_property("name", root).unwrap();
        assert_eq!(snapshot.resolve_path(property, root).unwrap(), "name_keyword");
    }

    #[test]
    fn test_resolve_one_hop_property() {
        let snapshot = snapshot();
        let root = snapshot.entity("Product").unwrap();
        let rating = snapshot.find_property("rating", root).unwrap();
        assert!(rating.entity.is_named("Review"));
        assert_eq!(snapshot.resolve_path(rating, root).unwrap(), "reviews.rating");
    }

    #[test]
    fn test_root_property_wins() {
        let snapshot = snapshot();
        let root = snapshot.entity("Product").unwrap();
        let property = snapshot.find_property("NAME", root).unwrap();
        assert!(property.entity.is_named("Product"));
    }

    #[test]
    fn test_unknown_field() {
        let snapshot = snapshot();
        let root = snapshot.entity("Product").unwrap();
        let err = snapshot.find_property("doesNotExist", root).unwrap_err();
        assert!(matches!(err, QueryGateError::FieldNotFound { .. }));
        let err = snapshot.resolve_field("doesNotExist", root).unwrap_err();
        assert!(matches!(err, QueryGateError::FieldNotFound { .. }));
    }

    #[test]
    fn test_dotted_name_falls_back_to_raw_path() {
        let snapshot = snapshot();
        let root = snapshot.entity("Product").unwrap();
        match snapshot.resolve_field("brand.name_keyword", root).unwrap() {
            ResolvedField::RawPath(path) => assert_eq!(path, "brand.name_keyword"),
            other => panic!("expected raw path, got {:?}", other),
        }
    }

    #[test]
    fn test_unreachable_property_fails() {
        let snapshot = snapshot();
        let review = snapshot.entity("Review").unwrap();
        let product = snapshot.entity("Product").unwrap();
        // Review has no bridge back to Product
        let price = PropertyRef::new(product, product.property("price").unwrap());
        assert!(matches!(
            snapshot.resolve_path(price, review),
            Err(QueryGateError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let snapshot = snapshot();
        let root = snapshot.entity("Product").unwrap();
        let rating = snapshot.find_property("rating", root).unwrap();
        let first = snapshot.resolve_path(rating, root).unwrap();
        let second = snapshot.resolve_path(rating, root).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut entities = product_entities();
        entities.push(EntityCfg::new(3, "PRODUCT"));
        assert!(matches!(
            MetadataSnapshot::build(entities, Vec::new()),
            Err(QueryGateError::Configuration(_))
        ));
    }

    #[test]
    fn test_duplicate_bridge_rejected() {
        let mut entities = product_entities();
        entities[0]
            .properties
            .push(PropertyCfg::bridge(9, "moreReviews", "Review"));
        assert!(matches!(
            MetadataSnapshot::build(entities, Vec::new()),
            Err(QueryGateError::Configuration(_))
        ));
    }

    #[test]
    fn test_dangling_bridge_rejected() {
        let mut entities = product_entities();
        entities[0]
            .properties
            .push(PropertyCfg::bridge(9, "brand", "Brand"));
        assert!(matches!(
            MetadataSnapshot::build(entities, Vec::new()),
            Err(QueryGateError::Configuration(_))
        ));
    }

    #[test]
    fn test_rule_with_deleted_property_rejected() {
        let rule = DacCfg::new(1, "broken", "Product").with_condition(DacConditionCfg::new(
            PropertyKey::new("Product", "category"),
            DacOperator::Eq,
            vec!["Electronics".to_string()],
        ));
        assert!(matches!(
            MetadataSnapshot::build(product_entities(), vec![rule]),
            Err(QueryGateError::Configuration(_))
        ));
    }

    #[test]
    fn test_rule_value_arity() {
        let rule = DacCfg::new(1, "no values", "Product").with_condition(DacConditionCfg::new(
            PropertyKey::new("Product", "price"),
            DacOperator::Gte,
            Vec::new(),
        ));
        assert!(MetadataSnapshot::build(product_entities(), vec![rule]).is_err());
    }

    #[test]
    fn test_describe() {
        let snapshot = snapshot();
        let described = snapshot.describe("review").unwrap();
        assert_eq!(described.len(), 2);
        assert_eq!(described[0].name, "rating");
        assert_eq!(described[0].data_type, DataType::Int);
        assert_eq!(described[0].path, "rating");
        assert!(matches!(
            snapshot.describe("Ghost"),
            Err(QueryGateError::EntityNotFound(_))
        ));
    }
}
