//! Serialised entity records and whole-engine snapshots.
//!
//! ```text
//! EntityRecord = { "id": u64, "layer": usize, "components": { name: payload } }
//! Snapshot     = { "entities": [ { "<id>": EntityRecord, ... }, ... ] }   // one map per layer
//! ```
//!
//! Payloads are opaque: only the component kind that wrote one can read it.
//! Snapshots travel as JSON or as MessagePack.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use venus_component::{EntityId, Payload};

use crate::error::EngineError;

/// The serialised form of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// The entity's id at the time it was serialised.
    pub id: EntityId,
    /// The layer it lived in.
    pub layer: usize,
    /// Component name → component-defined payload.
    pub components: BTreeMap<String, Payload>,
}

/// The serialised state of every entity in an engine, one map per layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// `entities[layer]` maps entity id → record.
    pub entities: Vec<BTreeMap<EntityId, EntityRecord>>,
}

impl Snapshot {
    /// Total number of entity records across all layers.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.iter().map(BTreeMap::len).sum()
    }

    /// Iterate every record, layer by layer.
    pub fn records(&self) -> impl Iterator<Item = &EntityRecord> {
        self.entities.iter().flat_map(BTreeMap::values)
    }

    /// Encode as a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Json`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Json`] if the text is not a snapshot.
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode as MessagePack bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Encode`] if serialisation fails.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, EngineError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decode from MessagePack bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Decode`] if the bytes are not a snapshot.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, EngineError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
