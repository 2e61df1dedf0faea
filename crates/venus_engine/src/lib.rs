//! # venus_engine
//!
//! The runtime half of the Venus ECS: entity storage in layers, the
//! component index, subsystem scheduling, the message bus, process-wide
//! catalogs, snapshots, and the fixed-timestep tick loop.
//!
//! ```rust
//! use venus_component::Requirements;
//! use venus_engine::{Batch, Context, Engine, Subsystem, SubsystemBuilder};
//!
//! #[derive(Default)]
//! struct Counter {
//!     seen: usize,
//! }
//!
//! impl Subsystem for Counter {
//!     fn step(&mut self, _ctx: &mut Context<'_>, batch: &Batch<'_>) {
//!         self.seen += batch.entities.len();
//!     }
//! }
//!
//! let mut engine = Engine::new();
//! engine.make_entity(0);
//! let counter = engine
//!     .make_subsystem(
//!         SubsystemBuilder::new("counter", Counter::default())
//!             .requirements(Requirements::default()),
//!     )
//!     .unwrap();
//!
//! engine.step(1.0 / 60.0);
//! assert_eq!(engine.subsystem(&counter).unwrap().state().seen, 1);
//! ```

pub mod bus;
pub mod catalog;
pub mod command;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod index;
pub mod registry;
pub mod snapshot;
pub mod subsystem;
pub mod tick;
pub mod world;

pub use bus::{Message, MessageBus};
pub use catalog::Catalogs;
pub use command::{Command, CommandQueue};
pub use config::{EngineConfig, MAX_TICK_RATE, TickConfig};
pub use context::Context;
pub use engine::{Engine, TickReport};
pub use error::EngineError;
pub use index::{ComponentIndex, ComponentStatus};
pub use registry::SubsystemRegistry;
pub use snapshot::{EntityRecord, Snapshot};
pub use subsystem::{
    Batch, DynSubsystem, Handler, Subsystem, SubsystemBuilder, SubsystemCell, SubsystemHandle,
};
pub use tick::TickLoop;
pub use world::{Entity, EntityMut, World};
