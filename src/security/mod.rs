//! Row-level access control
//!
//! Rules are declared per entity and toggled on or off. Every active rule of
//! an entity is appended to each request against that entity and ANDed with
//! the caller's filter.

mod policy;
mod rule;

pub use policy::{PolicyEngine, SecuredFilter};
pub use rule::{DacCfg, DacConditionCfg, DacOperator, PropertyKey};
