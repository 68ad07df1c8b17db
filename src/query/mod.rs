//! Filter grammar and compilation
//!
//! This module turns client filters into backend predicates:
//! - Typed literals, validated at deserialization
//! - The recursive `SearchCondition` AST (and, or, not, field leaves)
//! - A JSON parser for the filter grammar
//! - The compiler, which resolves logical fields and coerces values
//! - The backend-neutral `Predicate` tree
//!
//! # Example
//!
//! ```json
//! [
//!   { "field": "country", "eq": "USA" },
//!   {
//!     "or": [
//!       { "field": "name", "startsWith": "Gr" },
//!       { "not": { "field": "rating", "lt": 3 } }
//!     ]
//!   }
//! ]
//! ```

pub mod compiler;
pub mod condition;
pub mod context;
pub mod literal;
pub mod parser;
pub mod predicate;
pub mod types;

pub use compiler::QueryCompiler;
pub use condition::{FieldCondition, FieldOperator, RawCondition, SearchCondition};
pub use context::{QueryContext, QueryContextBuilder};
pub use literal::{parse_date, Literal};
pub use parser::ConditionParser;
pub use predicate::{BoolPredicate, Predicate};
pub use types::*;
