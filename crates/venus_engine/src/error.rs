//! Engine-level error types.
//!
//! Only contract violations live here. Soft failures (absent entities,
//! unbound messages, removing something that is not there) are plain
//! `Option`s or no-ops and never surface as errors.

use venus_component::{ComponentError, EntityId};

/// Errors that can occur while operating the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A record names a component kind with no registered prototype.
    #[error("component [{0}] is not in the prototype catalog")]
    UnknownComponentType(String),

    /// A component's serialisation capability failed.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// Two different Rust types tried to claim the same component name.
    #[error("component name {name} is already registered to {existing}")]
    DuplicateComponentKind {
        /// The contested component name.
        name: &'static str,
        /// Rust type already registered under that name.
        existing: &'static str,
    },

    /// A catalog key was registered twice.
    #[error("{catalog} catalog already contains {key}")]
    DuplicateEntry {
        /// Which catalog rejected the key.
        catalog: &'static str,
        /// The duplicated key.
        key: String,
    },

    /// Registration attempted after the catalogs were sealed.
    #[error("catalogs are sealed after the first deserialize, cannot register {0}")]
    RegistrySealed(String),

    /// A subsystem with this name is already registered.
    #[error("subsystem {0} is already registered")]
    DuplicateSubsystem(String),

    /// The same entity id appears twice in a snapshot.
    #[error("{0} appears more than once in the snapshot")]
    DuplicateEntity(EntityId),

    /// Tick rate is not positive or exceeds the supported maximum.
    #[error("tick rate {0} is out of range")]
    InvalidTickRate(f64),

    /// A snapshot record disagrees with the map key or layer it is stored under.
    #[error("record {id} (layer {layer}) is stored under {key} in layer {slot}")]
    MisplacedRecord {
        /// Map key the record was found under.
        key: EntityId,
        /// Index of the layer map holding the record.
        slot: usize,
        /// Id written inside the record.
        id: EntityId,
        /// Layer written inside the record.
        layer: usize,
    },

    /// JSON snapshot encoding or decoding failed.
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MessagePack snapshot encoding failed.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MessagePack snapshot decoding failed.
    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
