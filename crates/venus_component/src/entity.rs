//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is a plain `u64` with no data of its own. Components
//! attached to the entity give it meaning; the engine owns both.

use serde::{Deserialize, Serialize};

/// A unique entity identifier.
///
/// Ids are handed out by the engine's [`EntityAllocator`] and are never
/// reused while that engine instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create an entity id from a raw `u64`.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Allocates monotonically increasing entity ids, starting at 0.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    next_id: u64,
}

impl EntityAllocator {
    /// Creates a new allocator.
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Allocates a fresh entity id.
    pub fn allocate(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        EntityId(id)
    }

    /// Makes sure `id` will never be handed out, for ids restored from a
    /// snapshot.
    pub fn reserve(&mut self, id: EntityId) {
        self.next_id = self.next_id.max(id.0 + 1);
    }

    /// Returns the id the next call to [`allocate`](Self::allocate) yields.
    #[must_use]
    pub fn peek(&self) -> EntityId {
        EntityId(self.next_id)
    }

    /// Winds the counter back to zero. Only valid when every previously
    /// allocated id has been discarded.
    pub fn reset(&mut self) {
        self.next_id = 0;
    }
}
