//! Snapshot publication
//!
//! Metadata edits never touch a live snapshot: a new snapshot is built,
//! validated and swapped in atomically. Requests that already loaded the old
//! snapshot keep using it until they finish.

use super::entity::EntityCfg;
use super::snapshot::MetadataSnapshot;
use crate::error::Result;
use crate::security::DacCfg;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Provider of fully-populated metadata
pub trait MetadataSource: Send + Sync {
    /// Load every entity with its properties
    fn load_entities(&self) -> Result<Vec<EntityCfg>>;

    /// Load every access rule, active or not
    fn load_dac_rules(&self) -> Result<Vec<DacCfg>>;
}

/// Serializable form of a complete metadata set
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDocument {
    #[serde(default)]
    pub entities: Vec<EntityCfg>,
    #[serde(default)]
    pub dac_rules: Vec<DacCfg>,
}

impl MetadataDocument {
    /// Parse a metadata document from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl MetadataSource for MetadataDocument {
    fn load_entities(&self) -> Result<Vec<EntityCfg>> {
        Ok(self.entities.clone())
    }

    fn load_dac_rules(&self) -> Result<Vec<DacCfg>> {
        Ok(self.dac_rules.clone())
    }
}

/// Metadata source backed by a JSON file, re-read on every load
#[derive(Clone, Debug)]
pub struct JsonMetadataSource {
    path: PathBuf,
}

impl JsonMetadataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<MetadataDocument> {
        let text = std::fs::read_to_string(&self.path)?;
        MetadataDocument::from_json(&text)
    }
}

impl MetadataSource for JsonMetadataSource {
    fn load_entities(&self) -> Result<Vec<EntityCfg>> {
        Ok(self.read()?.entities)
    }

    fn load_dac_rules(&self) -> Result<Vec<DacCfg>> {
        Ok(self.read()?.dac_rules)
    }
}

/// Thread-safe snapshot holder with atomic replacement
pub struct MetadataStore {
    inner: ArcSwap<MetadataSnapshot>,
}

impl MetadataStore {
    pub fn new(snapshot: MetadataSnapshot) -> Self {
        Self {
            inner: ArcSwap::from_pointee(snapshot.with_generation(1)),
        }
    }

    /// Build the initial snapshot from a source
    pub fn from_source(source: &dyn MetadataSource) -> Result<Self> {
        let snapshot = Self::build_snapshot(source)?;
        Ok(Self::new(snapshot))
    }

    /// Get the current snapshot
    ///
    /// Callers should load once per request and resolve everything against
    /// that one snapshot.
    pub fn load(&self) -> Arc<MetadataSnapshot> {
        self.inner.load_full()
    }

    /// Get the generation of the current snapshot
    pub fn generation(&self) -> u64 {
        self.inner.load().generation()
    }

    /// Atomically replace the snapshot, returning the new generation
    pub fn publish(&self, snapshot: MetadataSnapshot) -> u64 {
        let generation = self.generation() + 1;
        self.inner.store(Arc::new(snapshot.with_generation(generation)));
        info!(generation, "published metadata snapshot");
        generation
    }

    /// Reload from a source and publish
    ///
    /// On failure the current snapshot stays in place.
    pub fn reload(&self, source: &dyn MetadataSource) -> Result<u64> {
        let snapshot = Self::build_snapshot(source)?;
        Ok(self.publish(snapshot))
    }

    fn build_snapshot(source: &dyn MetadataSource) -> Result<MetadataSnapshot> {
        let entities = source.load_entities()?;
        let rules = source.load_dac_rules()?;
        MetadataSnapshot::build(entities, rules)
    }
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self::new(MetadataSnapshot::empty())
    }
}
