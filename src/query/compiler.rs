//! Filter compiler
//!
//! Walks a `SearchCondition` tree, resolves each leaf's logical field through
//! the metadata snapshot in the `QueryContext`, coerces literals to the
//! property's declared type and emits a `Predicate` tree over physical paths.
//!
//! Compilation is all-or-nothing: the first unresolvable field or
//! uncoercible literal fails the whole compile.

use crate::error::QueryGateError;
use crate::query::condition::{FieldCondition, FieldOperator, SearchCondition};
use crate::query::context::QueryContext;
use crate::query::literal::Literal;
use crate::query::predicate::{BoolPredicate, Predicate};
use crate::query::types::{RangeBounds, SortClause, SortSpec};
use crate::schema::{DataType, EntityCfg, FieldPaths, PropertyRef, ResolvedField};
use crate::security::SecuredFilter;
use crate::Result;
use tracing::debug;

/// A resolved leaf target
struct Target {
    paths: FieldPaths,
    /// `None` for raw physical paths, which are not coerced
    data_type: Option<DataType>,
}

/// Compiler from client filters to backend predicates
pub struct QueryCompiler;

impl QueryCompiler {
    /// Compile a filter list
    ///
    /// An empty list matches everything; otherwise every entry is required.
    pub fn compile(conditions: &[SearchCondition], ctx: &QueryContext) -> Result<Predicate> {
        if conditions.is_empty() {
            return Ok(Predicate::MatchAll);
        }
        let root = ctx.root()?;
        let mut query = BoolPredicate::new();
        for condition in conditions {
            query = query.must(Self::compile_node(condition, root, ctx, 1)?);
        }
        Ok(query.build())
    }

    /// Compile a filter that already carries the access policy for its entity
    pub fn compile_secured(filter: &SecuredFilter, ctx: &QueryContext) -> Result<Predicate> {
        if !filter.entity().eq_ignore_ascii_case(ctx.entity_name()) {
            return Err(QueryGateError::InvalidRequest(format!(
                "filter secured for '{}' cannot be compiled for '{}'",
                filter.entity(),
                ctx.entity_name()
            )));
        }
        Self::compile(filter.conditions(), ctx)
    }

    /// Compile a single condition node
    pub fn compile_condition(condition: &SearchCondition, ctx: &QueryContext) -> Result<Predicate> {
        let root = ctx.root()?;
        Self::compile_node(condition, root, ctx, 1)
    }

    fn compile_node(
        condition: &SearchCondition,
        root: &EntityCfg,
        ctx: &QueryContext,
        depth: usize,
    ) -> Result<Predicate> {
        if depth > ctx.max_depth() {
            return Err(QueryGateError::InvalidRequest(format!(
                "condition nesting exceeds maximum depth of {}",
                ctx.max_depth()
            )));
        }

        match condition {
            SearchCondition::And(children) if children.is_empty() => Ok(Predicate::MatchAll),
            SearchCondition::And(children) => {
                let mut query = BoolPredicate::new();
                for child in children {
                    query = query.must(Self::compile_node(child, root, ctx, depth + 1)?);
                }
                Ok(query.build())
            }
            SearchCondition::Or(children) if children.is_empty() => Ok(Predicate::MatchAll),
            SearchCondition::Or(children) => {
                let mut query = BoolPredicate::new().with_minimum_should_match(1);
                for child in children {
                    query = query.should(Self::compile_node(child, root, ctx, depth + 1)?);
                }
                Ok(query.build())
            }
            SearchCondition::Not(child) => Ok(BoolPredicate::new()
                .must_not(Self::compile_node(child, root, ctx, depth + 1)?)
                .build()),
            SearchCondition::Field(leaf) => Self::compile_field(leaf, root, ctx),
        }
    }

    fn resolve(field: &str, root: &EntityCfg, ctx: &QueryContext) -> Result<Target> {
        let snapshot = ctx.snapshot();
        match snapshot.resolve_field(field, root)? {
            ResolvedField::Property(property) => {
                let paths = snapshot.resolve_paths(property, root)?;
                debug!(field, path = %paths.exact, "resolved field");
                Ok(Target {
                    paths,
                    data_type: Some(property.data_type()),
                })
            }
            ResolvedField::RawPath(path) => Ok(Target {
                paths: FieldPaths::from_path(path),
                data_type: None,
            }),
        }
    }

    fn compile_field(leaf: &FieldCondition, root: &EntityCfg, ctx: &QueryContext) -> Result<Predicate> {
        let target = Self::resolve(&leaf.field, root, ctx)?;
        let field = leaf.field.as_str();

        let coerce = |value: &Literal| match target.data_type {
            Some(data_type) => value.coerce(data_type, field),
            None => Ok(value.clone()),
        };
        let require = |supported: fn(&DataType) -> bool, value: &dyn std::fmt::Display| match target.data_type {
            Some(data_type) if !supported(&data_type) => {
                Err(QueryGateError::type_mismatch(field, data_type, value))
            }
            _ => Ok(()),
        };

        let mut clauses = Vec::with_capacity(leaf.operators.len());
        let mut bounds = RangeBounds::default();

        for operator in &leaf.operators {
            match operator {
                FieldOperator::Eq(value) => {
                    clauses.push(Predicate::term(&target.paths.exact, coerce(value)?));
                }
                FieldOperator::Contains(value) => {
                    require(DataType::supports_text, &Literal::from(value.as_str()))?;
                    clauses.push(Predicate::contains(&target.paths.text, value));
                }
                FieldOperator::StartsWith(value) => {
                    require(DataType::supports_text, &Literal::from(value.as_str()))?;
                    clauses.push(Predicate::prefix(&target.paths.exact, value));
                }
                // An empty membership list adds no clause
                FieldOperator::In(values) if values.is_empty() => {}
                FieldOperator::In(values) => {
                    let values = values.iter().map(coerce).collect::<Result<Vec<_>>>()?;
                    clauses.push(Predicate::terms(&target.paths.exact, values));
                }
                FieldOperator::Gt(value) => {
                    require(DataType::supports_range, value)?;
                    bounds.gt = Some(coerce(value)?);
                }
                FieldOperator::Gte(value) => {
                    require(DataType::supports_range, value)?;
                    bounds.gte = Some(coerce(value)?);
                }
                FieldOperator::Lt(value) => {
                    require(DataType::supports_range, value)?;
                    bounds.lt = Some(coerce(value)?);
                }
                FieldOperator::Lte(value) => {
                    require(DataType::supports_range, value)?;
                    bounds.lte = Some(coerce(value)?);
                }
            }
        }

        if !bounds.is_empty() {
            clauses.push(Predicate::range(&target.paths.exact, bounds));
        }

        Ok(match clauses.len() {
            0 => Predicate::MatchAll,
            1 => clauses.remove(0),
            _ => BoolPredicate {
                must: clauses,
                ..Default::default()
            }
            .build(),
        })
    }

    /// Compile sort specs into physical sort clauses
    pub fn compile_sort(sort: &[SortSpec], ctx: &QueryContext) -> Result<Vec<SortClause>> {
        if sort.is_empty() {
            return Ok(Vec::new());
        }
        let root = ctx.root()?;
        sort.iter()
            .map(|spec| {
                let target = Self::resolve(&spec.field, root, ctx)?;
                if target.data_type.is_some_and(|t| !t.is_searchable()) {
                    return Err(QueryGateError::InvalidRequest(format!(
                        "cannot sort on entity property '{}'",
                        spec.field
                    )));
                }
                Ok(SortClause {
                    path: target.paths.exact,
                    direction: spec.direction,
                })
            })
            .collect()
    }

    /// Text paths searched by free text: every STRING property of the root
    /// and of each entity bridged from it, without duplicates
    pub fn text_fields(ctx: &QueryContext) -> Result<Vec<String>> {
        let root = ctx.root()?;
        let snapshot = ctx.snapshot();
        let mut fields: Vec<String> = Vec::new();

        for entity in std::iter::once(root).chain(snapshot.bridged_entities(root)) {
            for property in entity.properties.iter().filter(|p| p.data_type == DataType::String) {
                let property = PropertyRef::new(entity, property);
                let text = snapshot.resolve_paths(property, root)?.text;
                if !fields.contains(&text) {
                    fields.push(text);
                }
            }
        }
        Ok(fields)
    }

    /// Compile free text into a full-text predicate
    ///
    /// Blank text yields `None`.
    pub fn compile_text(text: &str, ctx: &QueryContext) -> Result<Option<Predicate>> {
        let query = text.trim();
        if query.is_empty() {
            return Ok(None);
        }
        let fields = Self::text_fields(ctx)?;
        debug!(fields = fields.len(), "compiled full-text clause");
        Ok(Some(Predicate::FullText {
            fields,
            query: query.to_string(),
        }))
    }
}
