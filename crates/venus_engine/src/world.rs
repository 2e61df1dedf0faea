//! Entity storage: layers of entity records plus the component index.
//!
//! The [`World`] is the only owner of entities and components. Entities are
//! grouped into layers (`layers[n]` maps id → [`Entity`]); every structural
//! change goes through an [`EntityMut`] handle so the [`ComponentIndex`] is
//! updated in the same call.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::{debug, trace};
use venus_component::{
    AnyComponent, Component, ComponentError, ComponentTypeId, EntityAllocator, EntityId,
};

use crate::command::Command;
use crate::index::{ComponentIndex, ComponentStatus};
use crate::snapshot::EntityRecord;

/// One entity: an id, a layer, and at most one component per kind.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    layer: usize,
    components: IndexMap<ComponentTypeId, Box<dyn AnyComponent>>,
}

impl Entity {
    fn new(id: EntityId, layer: usize) -> Self {
        Self {
            id,
            layer,
            components: IndexMap::new(),
        }
    }

    /// The entity's id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The layer this entity lives in.
    #[must_use]
    pub fn layer(&self) -> usize {
        self.layer
    }

    /// Look up a component by name.
    #[must_use]
    pub fn get_component(&self, name: &str) -> Option<&dyn AnyComponent> {
        self.get_kind(ComponentTypeId::from_name(name))
    }

    /// Look up a component by kind.
    #[must_use]
    pub fn get_kind(&self, kind: ComponentTypeId) -> Option<&dyn AnyComponent> {
        self.components.get(&kind).map(|component| &**component)
    }

    /// Typed lookup.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.get_kind(T::component_type_id())?.downcast_ref::<T>()
    }

    /// Typed mutable lookup. Field mutation is not a structural change, so
    /// the index is not involved.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .get_mut(&T::component_type_id())?
            .downcast_mut::<T>()
    }

    /// Returns `true` if a component with this name is attached.
    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.has_kind(ComponentTypeId::from_name(name))
    }

    /// Returns `true` if a component of this kind is attached.
    #[must_use]
    pub fn has_kind(&self, kind: ComponentTypeId) -> bool {
        self.components.contains_key(&kind)
    }

    /// Typed presence check.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.has_kind(T::component_type_id())
    }

    /// Every attached component, in attachment order.
    pub fn components(&self) -> impl Iterator<Item = &dyn AnyComponent> {
        self.components.values().map(|component| &**component)
    }

    /// Number of attached components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if no component is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Produce this entity's record, embedding each component's payload
    /// verbatim.
    ///
    /// # Errors
    ///
    /// Propagates the first component serialisation failure, e.g.
    /// [`ComponentError::NotImplemented`].
    pub fn serialize(&self) -> Result<EntityRecord, ComponentError> {
        let mut components = BTreeMap::new();
        for component in self.components.values() {
            components.insert(component.name().to_string(), component.serialize_payload()?);
        }
        Ok(EntityRecord {
            id: self.id,
            layer: self.layer,
            components,
        })
    }
}

/// Canonical entity state: id allocation, layered records, component index.
#[derive(Debug, Default)]
pub struct World {
    allocator: EntityAllocator,
    layers: Vec<BTreeMap<EntityId, Entity>>,
    index: ComponentIndex,
}

impl World {
    /// Create an empty world with no layers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            layers: Vec::new(),
            index: ComponentIndex::new(),
        }
    }

    /// Allocate the next id and create an empty entity in `layer`, creating
    /// any missing layers up to it.
    pub fn make_entity(&mut self, layer: usize) -> EntityMut<'_> {
        let id = self.allocator.allocate();
        self.insert_entity(id, layer)
    }

    /// Reserve an id now; the record itself is created later by a spawn
    /// command.
    pub(crate) fn reserve_id(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    /// Create an empty record for an id that was allocated elsewhere
    /// (reserved by a command, or restored from a snapshot).
    pub(crate) fn insert_entity(&mut self, id: EntityId, layer: usize) -> EntityMut<'_> {
        self.allocator.reserve(id);
        self.ensure_layer(layer);
        self.layers[layer].insert(id, Entity::new(id, layer));
        trace!(%id, layer, "entity created");
        EntityMut {
            world: self,
            id,
            layer,
        }
    }

    fn ensure_layer(&mut self, layer: usize) {
        if self.layers.len() <= layer {
            self.layers.resize_with(layer + 1, BTreeMap::new);
        }
    }

    /// Look up an entity. With a layer this is a direct lookup; without one
    /// every layer is scanned.
    #[must_use]
    pub fn get_entity(&self, id: EntityId, layer: Option<usize>) -> Option<&Entity> {
        match layer {
            Some(layer) => self.layers.get(layer)?.get(&id),
            None => self.layers.iter().find_map(|entities| entities.get(&id)),
        }
    }

    pub(crate) fn entity_record_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.layers
            .iter_mut()
            .find_map(|entities| entities.get_mut(&id))
    }

    /// Mutable handle for an existing entity.
    #[must_use]
    pub fn entity_mut(&mut self, id: EntityId, layer: Option<usize>) -> Option<EntityMut<'_>> {
        let layer = self.get_entity(id, layer)?.layer;
        Some(EntityMut {
            world: self,
            id,
            layer,
        })
    }

    /// Remove an entity's record without touching the index.
    ///
    /// This is the raw half of [`EntityMut::destroy`]; callers that skip the
    /// index bookkeeping leave stale ids behind. Absent ids are a no-op.
    pub fn delete_entity(&mut self, id: EntityId, layer: Option<usize>) -> Option<Entity> {
        match layer {
            Some(layer) => self.layers.get_mut(layer)?.remove(&id),
            None => self
                .layers
                .iter_mut()
                .find_map(|entities| entities.remove(&id)),
        }
    }

    /// Destroy an entity: drop it from every index set, then delete the
    /// record. Returns `false` if no such entity exists.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        match self.entity_mut(id, None) {
            Some(entity) => {
                entity.destroy();
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `id` lives in `layer`.
    #[must_use]
    pub fn entity_is_in_layer(&self, id: EntityId, layer: usize) -> bool {
        self.layers
            .get(layer)
            .is_some_and(|entities| entities.contains_key(&id))
    }

    /// Report a membership change directly to the component index.
    pub fn inform(&mut self, kind: ComponentTypeId, id: EntityId, status: ComponentStatus) {
        self.index.inform(kind, id, status);
    }

    /// Ids in `layer` that own every kind in `kinds`, ascending.
    ///
    /// If any kind has never been indexed at all the result is empty, even
    /// before looking at the layer. An empty `kinds` list selects every
    /// entity of the layer.
    #[must_use]
    pub fn filter_entities(&self, kinds: &[ComponentTypeId], layer: usize) -> Vec<EntityId> {
        let mut sets = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            match self.index.entities(kind) {
                Some(set) => sets.push(set),
                None => return Vec::new(),
            }
        }

        let Some(entities) = self.layers.get(layer) else {
            return Vec::new();
        };

        sets.sort_by_key(|set| set.len());
        let Some((smallest, rest)) = sets.split_first() else {
            return entities.keys().copied().collect();
        };

        let mut ids: Vec<EntityId> = smallest
            .iter()
            .copied()
            .filter(|id| entities.contains_key(id) && rest.iter().all(|set| set.contains(id)))
            .collect();
        ids.sort_unstable();
        ids
    }

    /// The component index.
    #[must_use]
    pub fn index(&self) -> &ComponentIndex {
        &self.index
    }

    /// Number of layers, including empty ones below the highest used layer.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Entities of one layer, by ascending id.
    pub fn layer(&self, layer: usize) -> impl Iterator<Item = &Entity> {
        self.layers.get(layer).into_iter().flat_map(BTreeMap::values)
    }

    /// Total number of entities across layers.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.layers.iter().map(BTreeMap::len).sum()
    }

    /// The id the next [`make_entity`](Self::make_entity) will use.
    #[must_use]
    pub fn next_id(&self) -> EntityId {
        self.allocator.peek()
    }

    /// Create `count` empty layers so serialised layer positions survive a
    /// restore.
    pub(crate) fn reserve_layers(&mut self, count: usize) {
        if count > 0 {
            self.ensure_layer(count - 1);
        }
    }

    /// Drop every entity, every layer and the whole index, and rewind ids.
    pub fn clear(&mut self) {
        self.allocator.reset();
        self.layers.clear();
        self.index.clear();
    }

    /// Apply one deferred structural change.
    pub(crate) fn apply(&mut self, command: Command) {
        match command {
            Command::Spawn { id, layer } => {
                self.insert_entity(id, layer);
            }
            Command::AddComponent { id, component } => match self.entity_mut(id, None) {
                Some(mut entity) => {
                    entity.add_boxed(component);
                }
                None => debug!(%id, component = component.name(), "add for missing entity dropped"),
            },
            Command::RemoveComponent { id, kind } => match self.entity_mut(id, None) {
                Some(mut entity) => {
                    entity.remove_kind(kind);
                }
                None => debug!(%id, %kind, "remove for missing entity dropped"),
            },
            Command::Destroy { id } => {
                if !self.destroy_entity(id) {
                    debug!(%id, "destroy for missing entity dropped");
                }
            }
        }
    }
}

/// Mutable handle to one entity. Every structural change made through it
/// is reported to the component index.
#[derive(Debug)]
pub struct EntityMut<'w> {
    world: &'w mut World,
    id: EntityId,
    layer: usize,
}

impl EntityMut<'_> {
    /// The entity's id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The entity's layer.
    #[must_use]
    pub fn layer(&self) -> usize {
        self.layer
    }

    fn record(&self) -> Option<&Entity> {
        self.world.layers.get(self.layer)?.get(&self.id)
    }

    fn record_mut(&mut self) -> Option<&mut Entity> {
        self.world.layers.get_mut(self.layer)?.get_mut(&self.id)
    }

    /// Read-only view of the entity.
    #[must_use]
    pub fn entity(&self) -> Option<&Entity> {
        self.record()
    }

    /// Attach a component, replacing any existing one of the same kind.
    pub fn add_component<C: Component>(&mut self, component: C) -> &mut Self {
        self.add_boxed(Box::new(component))
    }

    /// Attach an already type-erased component.
    pub fn add_boxed(&mut self, component: Box<dyn AnyComponent>) -> &mut Self {
        let kind = component.kind();
        let id = self.id;
        let name = component.name();
        if let Some(entity) = self.record_mut() {
            entity.components.insert(kind, component);
            self.world.index.inform(kind, id, ComponentStatus::Add);
            trace!(%id, component = name, "component added");
        }
        self
    }

    /// Detach a component by name. The index is notified whether or not the
    /// component was present.
    pub fn remove_component(&mut self, name: &str) -> Option<Box<dyn AnyComponent>> {
        self.remove_kind(ComponentTypeId::from_name(name))
    }

    /// Detach a component by kind.
    pub fn remove_kind(&mut self, kind: ComponentTypeId) -> Option<Box<dyn AnyComponent>> {
        let id = self.id;
        let removed = self
            .record_mut()
            .and_then(|entity| entity.components.shift_remove(&kind));
        self.world.index.inform(kind, id, ComponentStatus::Remove);
        removed
    }

    /// Typed detach, returning the component by value.
    pub fn remove<T: Component>(&mut self) -> Option<T> {
        let removed = self.remove_kind(T::component_type_id())?;
        removed.into_any().downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Typed lookup.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.record()?.get::<T>()
    }

    /// Typed mutable lookup.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.record_mut()?.get_mut::<T>()
    }

    /// Returns `true` if a component with this name is attached.
    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.record()
            .is_some_and(|entity| entity.has_component(name))
    }

    /// Remove the entity from every index set it appears in, then delete its
    /// record from its layer.
    pub fn destroy(self) {
        let Self { world, id, layer } = self;
        if let Some(entity) = world.layers.get(layer).and_then(|entities| entities.get(&id)) {
            for &kind in entity.components.keys() {
                world.index.inform(kind, id, ComponentStatus::Remove);
            }
        }
        world.delete_entity(id, Some(layer));
        trace!(%id, layer, "entity destroyed");
    }
}
