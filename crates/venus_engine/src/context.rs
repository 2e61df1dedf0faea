//! What a subsystem sees while it runs.
//!
//! A [`Context`] is handed to every `step` call and every message handler.
//! Component fields can be read and written in place; structural changes
//! (spawning, attaching, detaching, destroying) are queued as commands and
//! land at the end of the tick.

use std::any::Any;

use venus_component::{Component, ComponentTypeId, EntityId, Payload};

use crate::bus::{Message, MessageBus};
use crate::catalog::Catalogs;
use crate::command::{Command, CommandQueue};
use crate::world::{Entity, World};

/// Borrowed view of the engine for the running subsystem.
pub struct Context<'a> {
    pub(crate) world: &'a mut World,
    pub(crate) catalogs: &'a Catalogs,
    pub(crate) bus: &'a mut MessageBus,
    pub(crate) commands: &'a mut CommandQueue,
    pub(crate) subsystem: &'a str,
    pub(crate) tick_id: u64,
}

impl Context<'_> {
    /// Current tick number; 0 before the first tick.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Name of the subsystem this context was built for.
    #[must_use]
    pub fn subsystem(&self) -> &str {
        self.subsystem
    }

    /// Read-only access to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &*self.world
    }

    /// Look up an entity in any layer.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.world.get_entity(id, None)
    }

    /// Typed component read.
    #[must_use]
    pub fn component<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.entity(id)?.get::<T>()
    }

    /// Typed component write. Mutating fields is not a structural change and
    /// takes effect immediately.
    pub fn component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.world.entity_record_mut(id)?.get_mut::<T>()
    }

    /// Same as [`World::filter_entities`], against the live index.
    #[must_use]
    pub fn filter_entities(&self, kinds: &[ComponentTypeId], layer: usize) -> Vec<EntityId> {
        self.world.filter_entities(kinds, layer)
    }

    /// Broadcast a message. Delivery happens after the current tick's steps,
    /// to every subsystem with a binding for `msg`, this one included.
    pub fn emit(&mut self, msg: impl Into<String>, data: Payload) {
        self.bus.push(Message {
            name: msg.into(),
            data,
        });
    }

    /// Queue a new empty entity in `layer`. The id is reserved immediately
    /// and can be used in further commands.
    pub fn spawn(&mut self, layer: usize) -> EntityId {
        let id = self.world.reserve_id();
        self.commands.push(Command::Spawn { id, layer });
        id
    }

    /// Queue a component attachment.
    pub fn add_component<C: Component>(&mut self, id: EntityId, component: C) {
        self.commands.push(Command::AddComponent {
            id,
            component: Box::new(component),
        });
    }

    /// Queue a component detachment by name.
    pub fn remove_component(&mut self, id: EntityId, name: &str) {
        self.commands.push(Command::RemoveComponent {
            id,
            kind: ComponentTypeId::from_name(name),
        });
    }

    /// Queue an entity destruction.
    pub fn destroy_entity(&mut self, id: EntityId) {
        self.commands.push(Command::Destroy { id });
    }

    /// Catalog constant lookup.
    #[must_use]
    pub fn constant(&self, key: &str) -> Option<&str> {
        self.catalogs.constant(key)
    }

    /// Catalog global lookup.
    #[must_use]
    pub fn global<T: Any>(&self, key: &str) -> Option<&T> {
        self.catalogs.global::<T>(key)
    }
}
