//! Subsystems: named units of per-tick logic.
//!
//! A subsystem is user state `S: Subsystem` wrapped in a [`SubsystemCell`]
//! that carries its name, its [`Requirements`] and its message bindings. The
//! engine calls [`Subsystem::step`] once per layer per requirement group on
//! every tick, and routes bus messages to the handler bound for their name.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use venus_component::{EntityId, Payload, Requirements};

use crate::context::Context;

/// One `step` invocation's worth of input.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// Seconds since the previous tick.
    pub dt: f64,
    /// Ids in `layer` matching requirement group `group`, ascending. The
    /// slice is computed before the call and does not follow mutations.
    pub entities: &'a [EntityId],
    /// Layer the ids come from.
    pub layer: usize,
    /// Index of the requirement group that produced `entities`.
    pub group: usize,
    /// How many times this subsystem has already been stepped during the
    /// current tick. Unique per (layer, group) pair.
    pub round: usize,
}

/// Per-tick behaviour of a subsystem.
pub trait Subsystem: Send + 'static {
    /// Process one batch. The default does nothing, which suits subsystems
    /// that only react to messages.
    fn step(&mut self, ctx: &mut Context<'_>, batch: &Batch<'_>) {
        let _ = (ctx, batch);
    }
}

impl Subsystem for () {}

/// A bound message handler.
pub type Handler<S> = Arc<dyn Fn(&mut S, &mut Context<'_>, &Payload) + Send + Sync>;

/// A registered subsystem: name, requirements, bindings and state.
pub struct SubsystemCell<S> {
    name: String,
    requirements: Requirements,
    bindings: HashMap<String, Handler<S>>,
    state: S,
}

impl<S: Subsystem> SubsystemCell<S> {
    /// The subsystem's registry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalised requirement expression.
    #[must_use]
    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    /// Replace the requirement expression. Takes effect on the next tick.
    pub fn set_requirements(&mut self, requirements: impl Into<Requirements>) {
        self.requirements = requirements.into();
    }

    /// Bind `handler` to `msg`, replacing any earlier binding for it.
    pub fn on<F>(&mut self, msg: impl Into<String>, handler: F)
    where
        F: Fn(&mut S, &mut Context<'_>, &Payload) + Send + Sync + 'static,
    {
        self.bindings.insert(msg.into(), Arc::new(handler));
    }

    /// Returns `true` if a handler is bound to `msg`.
    #[must_use]
    pub fn is_bound(&self, msg: &str) -> bool {
        self.bindings.contains_key(msg)
    }

    /// The user state.
    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// The user state, mutably.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }
}

impl<S> fmt::Debug for SubsystemCell<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bound: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        bound.sort_unstable();
        f.debug_struct("SubsystemCell")
            .field("name", &self.name)
            .field("requirements", &self.requirements)
            .field("bindings", &bound)
            .finish_non_exhaustive()
    }
}

/// Describes a subsystem to [`Engine::make_subsystem`](crate::Engine::make_subsystem).
pub struct SubsystemBuilder<S> {
    name: String,
    state: S,
    requirements: Requirements,
    bindings: HashMap<String, Handler<S>>,
}

impl<S: Subsystem> SubsystemBuilder<S> {
    /// Start describing a subsystem with its initial state. Requirements
    /// default to a single empty group.
    #[must_use]
    pub fn new(name: impl Into<String>, state: S) -> Self {
        Self {
            name: name.into(),
            state,
            requirements: Requirements::default(),
            bindings: HashMap::new(),
        }
    }

    /// Set the requirement expression.
    #[must_use]
    pub fn requirements(mut self, requirements: impl Into<Requirements>) -> Self {
        self.requirements = requirements.into();
        self
    }

    /// Bind a message handler.
    #[must_use]
    pub fn on<F>(mut self, msg: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut S, &mut Context<'_>, &Payload) + Send + Sync + 'static,
    {
        self.bindings.insert(msg.into(), Arc::new(handler));
        self
    }

    /// The name this subsystem will be registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn build(self) -> SubsystemCell<S> {
        SubsystemCell {
            name: self.name,
            requirements: self.requirements,
            bindings: self.bindings,
            state: self.state,
        }
    }
}

/// Typed handle returned on registration, used to reach the cell again.
pub struct SubsystemHandle<S> {
    name: String,
    _marker: PhantomData<fn() -> S>,
}

impl<S> SubsystemHandle<S> {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// The registry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S> Clone for SubsystemHandle<S> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone())
    }
}

impl<S> fmt::Debug for SubsystemHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SubsystemHandle").field(&self.name).finish()
    }
}

/// Object-safe view of a [`SubsystemCell`], as stored in the registry.
pub trait DynSubsystem: Send {
    /// Registry name.
    fn name(&self) -> &str;

    /// Requirement expression.
    fn requirements(&self) -> &Requirements;

    /// Replace the requirement expression.
    fn set_requirements(&mut self, requirements: Requirements);

    /// Run one batch.
    fn step(&mut self, ctx: &mut Context<'_>, batch: &Batch<'_>);

    /// Invoke the handler bound to `msg`, if any. Returns whether one ran.
    fn engine_sends_data(&mut self, ctx: &mut Context<'_>, msg: &str, data: &Payload) -> bool;

    /// Upcast for typed access.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: Subsystem> DynSubsystem for SubsystemCell<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    fn set_requirements(&mut self, requirements: Requirements) {
        self.requirements = requirements;
    }

    fn step(&mut self, ctx: &mut Context<'_>, batch: &Batch<'_>) {
        self.state.step(ctx, batch);
    }

    fn engine_sends_data(&mut self, ctx: &mut Context<'_>, msg: &str, data: &Payload) -> bool {
        let Some(handler) = self.bindings.get(msg).cloned() else {
            return false;
        };
        handler(&mut self.state, ctx, data);
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
