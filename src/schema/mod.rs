//! Metadata registry
//!
//! This module defines the entity/property metadata that maps stable logical
//! field names to physical index paths:
//! - Data types (STRING, INT, DOUBLE, BOOLEAN, DATE, ENTITY)
//! - Entity and property descriptors, including bridge properties
//! - Validated, immutable snapshots with one-hop path resolution
//! - Atomic snapshot publication

mod data_type;
mod entity;
mod snapshot;
mod store;

pub use data_type::DataType;
pub use entity::{EntityCfg, FieldPaths, PropertyCfg, PropertyRef, KEYWORD_SUFFIX, TEXT_SUFFIX};
pub use snapshot::{MetadataSnapshot, PropertyMetadata, ResolvedField};
pub use store::{JsonMetadataSource, MetadataDocument, MetadataSource, MetadataStore};
