//! # venus_app: demo driver
//!
//! Builds an engine with a handful of moving entities, registers the demo
//! subsystems, runs the fixed-timestep loop and optionally writes the final
//! state out as a JSON snapshot.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `venus_app=info`).
//! 2. Resolve the tick configuration: defaults, then `VENUS_TICK_RATE` /
//!    `VENUS_MAX_TICKS`, then command-line flags.
//! 3. Populate the engine and run the loop.
//! 4. Write the snapshot, if asked to.

mod components;
mod systems;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use venus_engine::{Engine, TickConfig, TickLoop};

use components::{Name, Position, Velocity};
use systems::{Movement, Odometer};

#[derive(Parser, Debug)]
#[command(name = "venus", about = "Run the Venus ECS demo")]
struct Args {
    /// Target ticks per second (overrides VENUS_TICK_RATE)
    #[arg(short, long)]
    tick_rate: Option<f64>,

    /// Stop after this many ticks (overrides VENUS_MAX_TICKS, 0 = forever)
    #[arg(short, long)]
    max_ticks: Option<u64>,

    /// Number of moving entities to spawn
    #[arg(short, long, default_value_t = 8)]
    entities: usize,

    /// Spread the entities over this many layers
    #[arg(short, long, default_value_t = 1)]
    layers: usize,

    /// Write the final state to this file as a JSON snapshot
    #[arg(short, long)]
    snapshot: Option<PathBuf>,
}

impl Args {
    fn tick_config(&self) -> Result<TickConfig> {
        let mut config = TickConfig::from_env();
        if let Some(tick_rate) = self.tick_rate {
            config = config.with_tick_rate(tick_rate);
        }
        if let Some(max_ticks) = self.max_ticks {
            config = config.with_max_ticks(max_ticks);
        }
        config.validate().context("invalid --tick-rate")?;
        Ok(config)
    }
}

/// Register the demo's catalogs and subsystems and spawn its entities.
fn build_engine(entities: usize, layers: usize) -> Result<Engine> {
    let mut engine = Engine::new();
    engine.register_prototype::<Position>()?;
    engine.register_prototype::<Velocity>()?;
    engine.register_prototype::<Name>()?;

    engine.make_subsystem(Movement::builder())?;
    engine.make_subsystem(Odometer::builder())?;

    let layers = layers.max(1);
    for n in 0..entities {
        let offset = n as f32;
        let mut entity = engine.make_entity(n % layers);
        entity
            .add_component(Position::new(offset, 0.0, 0.0))
            .add_component(Velocity::new(0.0, 1.0, offset * 0.1));
        if n == 0 {
            entity.add_component(Name::new("leader"));
        }
    }
    Ok(engine)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("venus_app=info".parse()?))
        .init();

    let args = Args::parse();
    let config = args.tick_config()?;
    info!(
        tick_rate = config.tick_rate,
        max_ticks = config.max_ticks,
        entities = args.entities,
        layers = args.layers,
        "venus demo starting"
    );

    let engine = build_engine(args.entities, args.layers)?;
    let mut tick_loop = TickLoop::new(config, engine);
    tick_loop.run_async().await;

    let engine = tick_loop.into_engine();
    if let Some(path) = &args.snapshot {
        let snapshot = engine.serialize()?;
        std::fs::write(path, snapshot.to_json()?)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        info!(
            path = %path.display(),
            entities = snapshot.entity_count(),
            "snapshot written"
        );
    }

    info!(ticks = engine.tick_id(), "venus demo shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use venus_component::Component;
    use venus_engine::Snapshot;

    use super::*;

    #[test]
    fn test_build_engine_spreads_layers() {
        let engine = build_engine(5, 2).unwrap();
        assert_eq!(engine.world().layer_count(), 2);
        assert_eq!(engine.world().layer(0).count(), 3);
        assert_eq!(engine.world().layer(1).count(), 2);
        assert_eq!(
            engine.filter_entities(&[Name::component_type_id()], 0).len(),
            1
        );
    }

    #[test]
    fn test_snapshot_restores_into_fresh_engine() {
        let mut engine = build_engine(3, 1).unwrap();
        engine.step(0.25);
        let text = engine.serialize().unwrap().to_json().unwrap();

        let mut restored = build_engine(0, 1).unwrap();
        restored.deserialize(&Snapshot::from_json(&text).unwrap()).unwrap();
        assert_eq!(restored.world().entity_count(), 3);
        assert_eq!(
            restored.serialize().unwrap(),
            engine.serialize().unwrap()
        );
    }

    #[test]
    fn test_cli_flags_override_config() {
        let args = Args::parse_from(["venus", "--tick-rate", "30", "--max-ticks", "12"]);
        let config = args.tick_config().unwrap();
        assert_eq!(config.tick_rate, 30.0);
        assert_eq!(config.max_ticks, 12);
        assert_eq!(args.entities, 8);
    }

    #[test]
    fn test_cli_rejects_out_of_range_tick_rate() {
        for flag in ["--tick-rate=0", "--tick-rate=-1", "--tick-rate=1e12"] {
            let args = Args::parse_from(["venus", flag]);
            assert!(args.tick_config().is_err(), "{flag} accepted");
        }
    }
}
