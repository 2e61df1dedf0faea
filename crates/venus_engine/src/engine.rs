//! The engine: composition root for entities, subsystems, catalogs and the
//! message bus.
//!
//! ## Tick lifecycle
//!
//! 1. For each subsystem in registration order, for each layer, for each
//!    requirement group: filter matching ids and call `step`.
//! 2. Drain the message bus in waves, delivering each message to every
//!    subsystem with a binding for it.
//! 3. Apply deferred structural commands in the order they were queued.
//! 4. Report what happened.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, trace, warn};
use venus_component::{
    AnyComponent, Component, ComponentTypeId, EntityId, Payload, RequirementGroup, Requirements,
};

use crate::bus::{Message, MessageBus};
use crate::catalog::Catalogs;
use crate::command::CommandQueue;
use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::EngineError;
use crate::index::ComponentStatus;
use crate::registry::SubsystemRegistry;
use crate::snapshot::{EntityRecord, Snapshot};
use crate::subsystem::{Batch, Subsystem, SubsystemBuilder, SubsystemCell, SubsystemHandle};
use crate::world::{Entity, EntityMut, World};

/// Summary of one call to [`Engine::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The tick that just ran.
    pub tick_id: u64,
    /// Number of `step` calls made.
    pub invocations: usize,
    /// Number of handler invocations during the drain.
    pub messages_delivered: usize,
    /// Messages discarded because the wave bound was hit.
    pub messages_dropped: usize,
    /// Deferred commands applied at the end of the tick.
    pub commands_applied: usize,
}

/// Outcome of draining the bus.
#[derive(Debug, Clone, Copy, Default)]
struct Drain {
    delivered: usize,
    dropped: usize,
}

/// An ECS runtime instance.
#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    world: World,
    subsystems: SubsystemRegistry,
    catalogs: Catalogs,
    bus: MessageBus,
    commands: CommandQueue,
    tick_id: u64,
}

impl Engine {
    /// Create an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with an explicit configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            world: World::new(),
            subsystems: SubsystemRegistry::new(),
            catalogs: Catalogs::new(),
            bus: MessageBus::new(),
            commands: CommandQueue::new(),
            tick_id: 0,
        }
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of ticks run so far.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    // ---- entities ------------------------------------------------------

    /// Read-only access to the entity store.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Create an empty entity in `layer` and return a handle to it.
    pub fn make_entity(&mut self, layer: usize) -> EntityMut<'_> {
        self.world.make_entity(layer)
    }

    /// See [`World::get_entity`].
    #[must_use]
    pub fn get_entity(&self, id: EntityId, layer: Option<usize>) -> Option<&Entity> {
        self.world.get_entity(id, layer)
    }

    /// See [`World::entity_mut`].
    #[must_use]
    pub fn entity_mut(&mut self, id: EntityId, layer: Option<usize>) -> Option<EntityMut<'_>> {
        self.world.entity_mut(id, layer)
    }

    /// See [`World::delete_entity`].
    pub fn delete_entity(&mut self, id: EntityId, layer: Option<usize>) -> Option<Entity> {
        self.world.delete_entity(id, layer)
    }

    /// See [`World::destroy_entity`].
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        self.world.destroy_entity(id)
    }

    /// See [`World::entity_is_in_layer`].
    #[must_use]
    pub fn entity_is_in_layer(&self, id: EntityId, layer: usize) -> bool {
        self.world.entity_is_in_layer(id, layer)
    }

    /// See [`World::inform`].
    pub fn inform(&mut self, kind: ComponentTypeId, id: EntityId, status: ComponentStatus) {
        self.world.inform(kind, id, status);
    }

    /// See [`World::filter_entities`].
    #[must_use]
    pub fn filter_entities(&self, kinds: &[ComponentTypeId], layer: usize) -> Vec<EntityId> {
        self.world.filter_entities(kinds, layer)
    }

    // ---- catalogs ------------------------------------------------------

    /// Read-only access to the catalogs.
    #[must_use]
    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// See [`Catalogs::add_constant`].
    ///
    /// # Errors
    ///
    /// Duplicate key, or catalogs sealed.
    pub fn add_constant(&mut self, key: &str, value: Option<&str>) -> Result<(), EngineError> {
        self.catalogs.add_constant(key, value)
    }

    /// See [`Catalogs::constant`].
    #[must_use]
    pub fn constant(&self, key: &str) -> Option<&str> {
        self.catalogs.constant(key)
    }

    /// See [`Catalogs::add_global`].
    ///
    /// # Errors
    ///
    /// Duplicate key, or catalogs sealed.
    pub fn add_global<T>(&mut self, key: &str, value: T) -> Result<(), EngineError>
    where
        T: std::any::Any + Send + Sync,
    {
        self.catalogs.add_global(key, value)
    }

    /// See [`Catalogs::global`].
    #[must_use]
    pub fn global<T: std::any::Any>(&self, key: &str) -> Option<&T> {
        self.catalogs.global::<T>(key)
    }

    /// Make `T` restorable from snapshots. See [`Catalogs::register_prototype`].
    ///
    /// # Errors
    ///
    /// Name collision with another type, or catalogs sealed.
    #[doc(alias = "add_srlz")]
    pub fn register_prototype<T: Component>(&mut self) -> Result<(), EngineError> {
        self.catalogs.register_prototype::<T>()
    }

    /// Empty and unseal every catalog.
    pub fn reset_catalogs(&mut self) {
        self.catalogs.reset();
    }

    // ---- subsystems ----------------------------------------------------

    /// The subsystem registry.
    #[must_use]
    pub fn subsystems(&self) -> &SubsystemRegistry {
        &self.subsystems
    }

    /// Register a subsystem and return a typed handle to it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateSubsystem`] if the name is taken.
    pub fn make_subsystem<S: Subsystem>(
        &mut self,
        builder: SubsystemBuilder<S>,
    ) -> Result<SubsystemHandle<S>, EngineError> {
        let cell = builder.build();
        let name = cell.name().to_string();
        self.subsystems.register(Box::new(cell))?;
        Ok(SubsystemHandle::new(name))
    }

    /// Unregister a subsystem. Returns `false` if it was not registered.
    pub fn remove_subsystem(&mut self, name: &str) -> bool {
        self.subsystems.unregister(name).is_some()
    }

    /// Typed access to a registered subsystem.
    #[must_use]
    pub fn subsystem<S: Subsystem>(
        &self,
        handle: &SubsystemHandle<S>,
    ) -> Option<&SubsystemCell<S>> {
        self.subsystems.cell(handle.name())
    }

    /// Typed mutable access to a registered subsystem.
    pub fn subsystem_mut<S: Subsystem>(
        &mut self,
        handle: &SubsystemHandle<S>,
    ) -> Option<&mut SubsystemCell<S>> {
        self.subsystems.cell_mut(handle.name())
    }

    /// Replace a subsystem's requirements by name. Returns `false` if no
    /// such subsystem exists.
    pub fn set_requirements(&mut self, name: &str, requirements: impl Into<Requirements>) -> bool {
        match self.subsystems.get_mut(name) {
            Some(system) => {
                system.set_requirements(requirements.into());
                true
            }
            None => false,
        }
    }

    /// Broadcast a message from outside any subsystem.
    ///
    /// Delivery is immediate: every bound handler has run when this returns,
    /// along with anything those handlers emitted (within the wave bound) and
    /// the structural commands they queued. Returns the number of handler
    /// invocations.
    pub fn subsystem_emit(&mut self, msg: impl Into<String>, data: Payload) -> usize {
        self.bus.push(Message {
            name: msg.into(),
            data,
        });
        let drain = self.drain_messages();
        self.apply_commands();
        drain.delivered
    }

    // ---- ticking -------------------------------------------------------

    /// Run one tick.
    pub fn step(&mut self, dt: f64) -> TickReport {
        self.tick_id += 1;
        let mut report = TickReport {
            tick_id: self.tick_id,
            ..TickReport::default()
        };

        let layers = self.world.layer_count();
        for position in 0..self.subsystems.len() {
            let Some(system) = self.subsystems.get_index_mut(position) else {
                continue;
            };
            let name = system.name().to_string();
            let groups: Vec<RequirementGroup> = system.requirements().groups().to_vec();

            let mut round = 0;
            for layer in 0..layers {
                for (group, requirement) in groups.iter().enumerate() {
                    let entities = self.world.filter_entities(requirement.kinds(), layer);
                    let batch = Batch {
                        dt,
                        entities: &entities,
                        layer,
                        group,
                        round,
                    };
                    let mut ctx = Context {
                        world: &mut self.world,
                        catalogs: &self.catalogs,
                        bus: &mut self.bus,
                        commands: &mut self.commands,
                        subsystem: &name,
                        tick_id: self.tick_id,
                    };
                    trace!(subsystem = %name, layer, group, round, entities = entities.len(), "step");
                    system.step(&mut ctx, &batch);
                    round += 1;
                }
            }
            report.invocations += round;
        }

        let drain = self.drain_messages();
        report.messages_delivered = drain.delivered;
        report.messages_dropped = drain.dropped;
        report.commands_applied = self.apply_commands();

        debug!(
            tick_id = report.tick_id,
            dt,
            invocations = report.invocations,
            messages = report.messages_delivered,
            commands = report.commands_applied,
            "tick complete"
        );
        report
    }

    /// Deliver queued messages wave by wave until the bus is empty or the
    /// wave bound is reached.
    fn drain_messages(&mut self) -> Drain {
        let mut drain = Drain::default();
        let mut waves = 0;
        while !self.bus.is_empty() {
            if waves >= self.config.max_message_waves {
                drain.dropped = self.bus.clear();
                warn!(
                    tick_id = self.tick_id,
                    waves,
                    dropped = drain.dropped,
                    "message wave limit reached, dropping queued messages"
                );
                break;
            }
            waves += 1;

            for message in self.bus.take_wave() {
                for position in 0..self.subsystems.len() {
                    let Some(system) = self.subsystems.get_index_mut(position) else {
                        continue;
                    };
                    let name = system.name().to_string();
                    let mut ctx = Context {
                        world: &mut self.world,
                        catalogs: &self.catalogs,
                        bus: &mut self.bus,
                        commands: &mut self.commands,
                        subsystem: &name,
                        tick_id: self.tick_id,
                    };
                    if system.engine_sends_data(&mut ctx, &message.name, &message.data) {
                        drain.delivered += 1;
                    }
                }
            }
        }
        drain
    }

    /// Apply every deferred command in FIFO order.
    fn apply_commands(&mut self) -> usize {
        let pending = self.commands.take();
        let applied = pending.len();
        for command in pending {
            trace!(?command, "applying command");
            self.world.apply(command);
        }
        applied
    }

    // ---- snapshots -----------------------------------------------------

    /// Serialise every entity, layer by layer.
    ///
    /// # Errors
    ///
    /// Propagates the first component serialisation failure.
    pub fn serialize(&self) -> Result<Snapshot, EngineError> {
        let mut entities = Vec::with_capacity(self.world.layer_count());
        for layer in 0..self.world.layer_count() {
            let mut records = BTreeMap::new();
            for entity in self.world.layer(layer) {
                records.insert(entity.id(), entity.serialize()?);
            }
            entities.push(records);
        }
        Ok(Snapshot { entities })
    }

    /// Replace the whole entity state with a snapshot.
    ///
    /// Every record is decoded before anything is touched, so a failure
    /// leaves the engine as it was. On success ids, layers, and the index are
    /// reset and rebuilt through the normal add path; recorded ids are kept
    /// and new ids continue after the largest one. Pending messages and
    /// commands are discarded. The catalogs are sealed afterwards.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownComponentType`] for an unregistered name,
    /// [`EngineError::DuplicateEntity`] for a repeated id,
    /// [`EngineError::MisplacedRecord`] for a record filed under another id or
    /// layer, or the component's own decode error.
    pub fn deserialize(&mut self, snapshot: &Snapshot) -> Result<(), EngineError> {
        let mut seen = HashSet::new();
        let mut decoded = Vec::with_capacity(snapshot.entity_count());
        for (slot, records) in snapshot.entities.iter().enumerate() {
            for (&key, record) in records {
                if record.id != key || record.layer != slot {
                    return Err(EngineError::MisplacedRecord {
                        key,
                        slot,
                        id: record.id,
                        layer: record.layer,
                    });
                }
            }
        }
        for record in snapshot.records() {
            if !seen.insert(record.id) {
                return Err(EngineError::DuplicateEntity(record.id));
            }
            decoded.push((record.id, record.layer, self.decode_components(record)?));
        }

        self.world.clear();
        let dropped = self.bus.clear();
        let discarded = self.commands.take().len();
        if dropped > 0 || discarded > 0 {
            debug!(dropped, discarded, "pending work discarded by restore");
        }

        self.world.reserve_layers(snapshot.entities.len());
        for (id, layer, components) in decoded {
            let mut entity = self.world.insert_entity(id, layer);
            for component in components {
                entity.add_boxed(component);
            }
        }

        if !self.catalogs.is_sealed() {
            self.catalogs.seal();
            debug!("catalogs sealed");
        }
        info!(
            entities = self.world.entity_count(),
            layers = self.world.layer_count(),
            "snapshot restored"
        );
        Ok(())
    }

    /// Recreate one entity from its record under a freshly allocated id.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownComponentType`] or the component's decode
    /// error. Nothing is created on failure.
    pub fn deserialize_entity(&mut self, record: &EntityRecord) -> Result<EntityId, EngineError> {
        let components = self.decode_components(record)?;
        let mut entity = self.world.make_entity(record.layer);
        for component in components {
            entity.add_boxed(component);
        }
        Ok(entity.id())
    }

    fn decode_components(
        &self,
        record: &EntityRecord,
    ) -> Result<Vec<Box<dyn AnyComponent>>, EngineError> {
        record
            .components
            .iter()
            .map(|(name, payload)| self.catalogs.decode(name, payload))
            .collect()
    }
}
