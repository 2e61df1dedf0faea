//! Demo subsystems: integrate motion, and keep a tally of what moved.

use serde_json::json;
use tracing::{debug, info};
use venus_component::{Component, Payload, Requirements};
use venus_engine::{Batch, Context, Subsystem, SubsystemBuilder};

use crate::components::{Name, Position, Velocity};

/// Message emitted by [`Movement`] after each batch that moved something.
pub const MOVED: &str = "moved";

/// Moves every entity with a position and a velocity.
#[derive(Debug, Default)]
pub struct Movement;

impl Movement {
    /// Registration for entities with both a position and a velocity.
    pub fn builder() -> SubsystemBuilder<Self> {
        SubsystemBuilder::new("movement", Self).requirements(Requirements::all([
            Position::component_type_id(),
            Velocity::component_type_id(),
        ]))
    }
}

impl Subsystem for Movement {
    fn step(&mut self, ctx: &mut Context<'_>, batch: &Batch<'_>) {
        let dt = batch.dt as f32;
        let mut moved = 0usize;
        for &id in batch.entities {
            let Some(velocity) = ctx.component::<Velocity>(id).copied() else {
                continue;
            };
            if let Some(position) = ctx.component_mut::<Position>(id) {
                position.value += velocity.linear * dt;
                moved += 1;
            }
        }
        if moved > 0 {
            ctx.emit(MOVED, json!({ "layer": batch.layer, "count": moved }));
        }
    }
}

/// Counts `moved` notifications and logs named entities once per tick.
#[derive(Debug, Default)]
pub struct Odometer {
    /// Total entity moves reported so far.
    pub total: u64,
    /// Tick of the last report.
    pub last_tick: u64,
}

impl Odometer {
    /// Registration for named entities, listening for [`MOVED`].
    pub fn builder() -> SubsystemBuilder<Self> {
        SubsystemBuilder::new("odometer", Self::default())
            .requirements(Requirements::all([Name::component_type_id()]))
            .on(MOVED, Self::on_moved)
    }

    fn on_moved(&mut self, ctx: &mut Context<'_>, data: &Payload) {
        self.total += data["count"].as_u64().unwrap_or_default();
        self.last_tick = ctx.tick_id();
        debug!(total = self.total, tick = self.last_tick, "moves tallied");
    }
}

impl Subsystem for Odometer {
    fn step(&mut self, ctx: &mut Context<'_>, batch: &Batch<'_>) {
        for &id in batch.entities {
            let (Some(name), Some(position)) =
                (ctx.component::<Name>(id), ctx.component::<Position>(id))
            else {
                continue;
            };
            info!(
                tick = ctx.tick_id(),
                entity = id.id(),
                name = %name.value,
                x = position.value.x,
                y = position.value.y,
                z = position.value.z,
                "position"
            );
        }
    }
}
