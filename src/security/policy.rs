//! Row-level access policy
//!
//! The engine turns the active rules of an entity into ordinary filter
//! conditions on logical field names. Those conditions are appended to the
//! caller's filter and compiled with it, so they resolve through the same
//! metadata as any client condition and fail the request the same way.

use super::rule::{DacConditionCfg, DacOperator};
use crate::error::{QueryGateError, Result};
use crate::query::{FieldOperator, Literal, SearchCondition};
use crate::schema::MetadataSnapshot;
use tracing::debug;

/// A caller filter with every active rule of its entity appended
///
/// Only `PolicyEngine::secure` can build one, so a value of this type always
/// carries the policy that was in force for its snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct SecuredFilter {
    entity: String,
    conditions: Vec<SearchCondition>,
    policy_conditions: usize,
}

impl SecuredFilter {
    /// Entity the policy was applied for
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Caller conditions followed by policy conditions
    pub fn conditions(&self) -> &[SearchCondition] {
        &self.conditions
    }

    /// Number of conditions contributed by rules
    pub fn policy_conditions(&self) -> usize {
        self.policy_conditions
    }
}

/// Access policy engine
pub struct PolicyEngine;

impl PolicyEngine {
    /// Conditions currently in force for `entity_name`
    ///
    /// One leaf per rule condition, in rule order. An entity with no active
    /// rules, or an unknown entity, yields an empty list.
    pub fn security_conditions(snapshot: &MetadataSnapshot, entity_name: &str) -> Result<Vec<SearchCondition>> {
        let mut conditions = Vec::new();
        for rule in snapshot.active_rules_for(entity_name) {
            for condition in &rule.conditions {
                conditions.push(Self::to_condition(&rule.name, condition)?);
            }
        }
        Ok(conditions)
    }

    /// Append the policy for `entity_name` to a caller filter
    pub fn secure(
        user_filter: Vec<SearchCondition>,
        snapshot: &MetadataSnapshot,
        entity_name: &str,
    ) -> Result<SecuredFilter> {
        let policy = Self::security_conditions(snapshot, entity_name)?;
        let policy_conditions = policy.len();
        debug!(entity = entity_name, policy_conditions, "applying access policy");

        let mut conditions = user_filter;
        conditions.extend(policy);
        Ok(SecuredFilter {
            entity: entity_name.to_string(),
            conditions,
            policy_conditions,
        })
    }

    fn to_condition(rule: &str, condition: &DacConditionCfg) -> Result<SearchCondition> {
        let field = condition.property.property.clone();
        let single = || {
            condition
                .values
                .first()
                .map(|v| Literal::String(v.clone()))
                .ok_or_else(|| {
                    QueryGateError::Configuration(format!(
                        "rule '{}' has no value for operator {}",
                        rule, condition.operator
                    ))
                })
        };

        let operator = match condition.operator {
            DacOperator::Eq => FieldOperator::Eq(single()?),
            DacOperator::Gt => FieldOperator::Gt(single()?),
            DacOperator::Gte => FieldOperator::Gte(single()?),
            DacOperator::Lt => FieldOperator::Lt(single()?),
            DacOperator::Lte => FieldOperator::Lte(single()?),
            DacOperator::In => FieldOperator::In(
                condition
                    .values
                    .iter()
                    .map(|v| Literal::String(v.clone()))
                    .collect(),
            ),
        };
        Ok(SearchCondition::field(field, operator))
    }
}
