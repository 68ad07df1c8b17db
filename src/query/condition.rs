//! Client filter AST
//!
//! The wire grammar lets one JSON object carry `and`, `or`, `not` and a field
//! condition at the same time. On deserialization such a node becomes an
//! explicit `And` of its populated parts, so the compiler only ever matches
//! on one variant per node.

use super::literal::Literal;
use serde::{Deserialize, Serialize};

/// One operator applied to a field
#[derive(Clone, Debug, PartialEq)]
pub enum FieldOperator {
    Eq(Literal),
    Contains(String),
    StartsWith(String),
    In(Vec<Literal>),
    Gt(Literal),
    Gte(Literal),
    Lt(Literal),
    Lte(Literal),
}

impl FieldOperator {
    pub fn name(&self) -> &'static str {
        match self {
            FieldOperator::Eq(_) => "eq",
            FieldOperator::Contains(_) => "contains",
            FieldOperator::StartsWith(_) => "startsWith",
            FieldOperator::In(_) => "in",
            FieldOperator::Gt(_) => "gt",
            FieldOperator::Gte(_) => "gte",
            FieldOperator::Lt(_) => "lt",
            FieldOperator::Lte(_) => "lte",
        }
    }
}

/// Leaf condition: one logical field and the operators applied to it
///
/// Operators on the same leaf are ANDed.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub operators: Vec<FieldOperator>,
}

impl FieldCondition {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operators: Vec::new(),
        }
    }

    pub fn with(mut self, operator: FieldOperator) -> Self {
        self.operators.push(operator);
        self
    }
}

/// Recursive boolean filter expression
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub enum SearchCondition {
    /// Every child must match; an empty list matches everything
    And(Vec<SearchCondition>),
    /// At least one child must match; an empty list matches everything
    Or(Vec<SearchCondition>),
    /// The child must not match
    Not(Box<SearchCondition>),
    Field(FieldCondition),
}

impl SearchCondition {
    pub fn and(children: Vec<SearchCondition>) -> Self {
        SearchCondition::And(children)
    }

    pub fn or(children: Vec<SearchCondition>) -> Self {
        SearchCondition::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: SearchCondition) -> Self {
        SearchCondition::Not(Box::new(child))
    }

    pub fn field(field: impl Into<String>, operator: FieldOperator) -> Self {
        SearchCondition::Field(FieldCondition::new(field).with(operator))
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::field(field, FieldOperator::Eq(value.into()))
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::field(field, FieldOperator::Contains(value.into()))
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::field(field, FieldOperator::StartsWith(value.into()))
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Literal>) -> Self {
        Self::field(field, FieldOperator::In(values))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::field(field, FieldOperator::Gt(value.into()))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::field(field, FieldOperator::Gte(value.into()))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::field(field, FieldOperator::Lt(value.into()))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::field(field, FieldOperator::Lte(value.into()))
    }

    /// Nesting depth; a leaf has depth 1
    pub fn depth(&self) -> usize {
        match self {
            SearchCondition::And(children) | SearchCondition::Or(children) => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
            SearchCondition::Not(child) => 1 + child.depth(),
            SearchCondition::Field(_) => 1,
        }
    }
}

/// JSON shape of a condition node
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_with: Option<String>,
    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_values: Option<Vec<Literal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<SearchCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<SearchCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<SearchCondition>>,
}

impl RawCondition {
    fn operators(&mut self) -> Vec<FieldOperator> {
        let mut operators = Vec::new();
        if let Some(v) = self.eq.take() {
            operators.push(FieldOperator::Eq(v));
        }
        if let Some(v) = self.contains.take() {
            operators.push(FieldOperator::Contains(v));
        }
        if let Some(v) = self.starts_with.take() {
            operators.push(FieldOperator::StartsWith(v));
        }
        if let Some(v) = self.in_values.take() {
            operators.push(FieldOperator::In(v));
        }
        if let Some(v) = self.gt.take() {
            operators.push(FieldOperator::Gt(v));
        }
        if let Some(v) = self.gte.take() {
            operators.push(FieldOperator::Gte(v));
        }
        if let Some(v) = self.lt.take() {
            operators.push(FieldOperator::Lt(v));
        }
        if let Some(v) = self.lte.take() {
            operators.push(FieldOperator::Lte(v));
        }
        operators
    }
}

impl TryFrom<RawCondition> for SearchCondition {
    type Error = String;

    fn try_from(mut raw: RawCondition) -> Result<Self, Self::Error> {
        let operators = raw.operators();
        let mut parts = Vec::new();

        if let Some(children) = raw.and.take() {
            parts.push(SearchCondition::And(children));
        }
        if let Some(children) = raw.or.take() {
            parts.push(SearchCondition::Or(children));
        }
        if let Some(child) = raw.not.take() {
            parts.push(SearchCondition::Not(child));
        }
        match raw.field.take() {
            Some(field) => parts.push(SearchCondition::Field(FieldCondition { field, operators })),
            None if !operators.is_empty() => {
                return Err(format!(
                    "operator '{}' requires a 'field'",
                    operators[0].name()
                ))
            }
            None => {}
        }

        Ok(match parts.len() {
            1 => parts.remove(0),
            _ => SearchCondition::And(parts),
        })
    }
}

impl From<SearchCondition> for RawCondition {
    fn from(condition: SearchCondition) -> Self {
        let mut raw = RawCondition::default();
        match condition {
            SearchCondition::And(children) => raw.and = Some(children),
            SearchCondition::Or(children) => raw.or = Some(children),
            SearchCondition::Not(child) => raw.not = Some(child),
            SearchCondition::Field(leaf) => {
                raw.field = Some(leaf.field);
                for operator in leaf.operators {
                    match operator {
                        FieldOperator::Eq(v) => raw.eq = Some(v),
                        FieldOperator::Contains(v) => raw.contains = Some(v),
                        FieldOperator::StartsWith(v) => raw.starts_with = Some(v),
                        FieldOperator::In(v) => raw.in_values = Some(v),
                        FieldOperator::Gt(v) => raw.gt = Some(v),
                        FieldOperator::Gte(v) => raw.gte = Some(v),
                        FieldOperator::Lt(v) => raw.lt = Some(v),
                        FieldOperator::Lte(v) => raw.lte = Some(v),
                    }
                }
            }
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_node() {
        let cond: SearchCondition = serde_json::from_str(r#"{ "field": "country", "eq": "USA" }"#).unwrap();
        assert_eq!(cond, SearchCondition::eq("country", "USA"));
    }

    #[test]
    fn test_multiple_operators_on_one_leaf() {
        let cond: SearchCondition =
            serde_json::from_str(r#"{ "field": "price", "gte": 10, "lt": 100 }"#).unwrap();
        match cond {
            SearchCondition::Field(leaf) => {
                assert_eq!(leaf.operators.len(), 2);
                assert_eq!(leaf.operators[0], FieldOperator::Gte(Literal::Int(10)));
                assert_eq!(leaf.operators[1], FieldOperator::Lt(Literal::Int(100)));
            }
            other => panic!("expected field condition, got {:?}", other),
        }
    }

    #[test]
    fn test_composite_node() {
        let cond: SearchCondition = serde_json::from_str(
            r#"{ "or": [ { "field": "category", "eq": "Electronics" }, { "field": "price", "lt": 30 } ] }"#,
        )
        .unwrap();
        assert!(matches!(cond, SearchCondition::Or(ref c) if c.len() == 2));
    }

    #[test]
    fn test_mixed_node_becomes_and() {
        let cond: SearchCondition = serde_json::from_str(
            r#"{ "field": "name", "startsWith": "Gr", "not": { "field": "country", "eq": "France" } }"#,
        )
        .unwrap();
        assert_eq!(
            cond,
            SearchCondition::and(vec![
                SearchCondition::not(SearchCondition::eq("country", "France")),
                SearchCondition::starts_with("name", "Gr"),
            ])
        );
    }

    #[test]
    fn test_empty_node() {
        let cond: SearchCondition = serde_json::from_str("{}").unwrap();
        assert_eq!(cond, SearchCondition::And(Vec::new()));
    }

    #[test]
    fn test_operator_without_field_rejected() {
        let err = serde_json::from_str::<SearchCondition>(r#"{ "eq": "x" }"#).unwrap_err();
        assert!(err.to_string().contains("requires a 'field'"));
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        assert!(serde_json::from_str::<SearchCondition>(r#"{ "field": "x", "like": "y" }"#).is_err());
    }

    #[test]
    fn test_serialize_back_to_wire_shape() {
        let cond = SearchCondition::not(SearchCondition::is_in(
            "category",
            vec![Literal::from("Books"), Literal::from("Toys")],
        ));
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "not": { "field": "category", "in": ["Books", "Toys"] } })
        );
    }

    #[test]
    fn test_depth() {
        let cond = SearchCondition::and(vec![SearchCondition::or(vec![SearchCondition::not(
            SearchCondition::eq("a", "b"),
        )])]);
        assert_eq!(cond.depth(), 4);
        assert_eq!(SearchCondition::And(Vec::new()).depth(), 1);
    }
}
