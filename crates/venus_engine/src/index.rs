//! Component index: which entities currently own which component kinds.
//!
//! The index is maintained incrementally from add/remove notifications and
//! is never touched by filtering. Invariant: `id` is in the set for kind `X`
//! iff the entity with that id currently owns a component of kind `X`.

use std::collections::HashMap;

use indexmap::IndexSet;
use venus_component::{ComponentTypeId, EntityId};

/// Direction of a membership change reported to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    /// A component of the kind was attached.
    Add,
    /// A component of the kind was detached.
    Remove,
}

/// Mapping from component kind to the set of entity ids bearing it.
///
/// A kind's set is created on its first `Add` and is kept afterwards, even
/// once it becomes empty. Filtering relies on that distinction: a kind that
/// has never been seen matches nothing, anywhere.
#[derive(Debug, Default)]
pub struct ComponentIndex {
    sets: HashMap<ComponentTypeId, IndexSet<EntityId>>,
}

impl ComponentIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sets: HashMap::new(),
        }
    }

    /// Apply a membership change.
    ///
    /// `Add` is insert-if-absent, so repeated notifications never duplicate
    /// an id. `Remove` tolerates unknown kinds and absent ids.
    pub fn inform(&mut self, kind: ComponentTypeId, entity: EntityId, status: ComponentStatus) {
        match status {
            ComponentStatus::Add => {
                self.sets.entry(kind).or_default().insert(entity);
            }
            ComponentStatus::Remove => {
                if let Some(set) = self.sets.get_mut(&kind) {
                    set.swap_remove(&entity);
                }
            }
        }
    }

    /// The ids currently bearing `kind`, or `None` if the kind was never
    /// indexed.
    #[must_use]
    pub fn entities(&self, kind: ComponentTypeId) -> Option<&IndexSet<EntityId>> {
        self.sets.get(&kind)
    }

    /// Returns `true` if `entity` is indexed under `kind`.
    #[must_use]
    pub fn contains(&self, kind: ComponentTypeId, entity: EntityId) -> bool {
        self.sets
            .get(&kind)
            .is_some_and(|set| set.contains(&entity))
    }

    /// Returns `true` if `kind` has ever been added to any entity.
    #[must_use]
    pub fn is_known(&self, kind: ComponentTypeId) -> bool {
        self.sets.contains_key(&kind)
    }

    /// Number of kinds with a set, empty ones included.
    #[must_use]
    pub fn kind_count(&self) -> usize {
        self.sets.len()
    }

    /// Forget every kind.
    pub fn clear(&mut self) {
        self.sets.clear();
    }
}
