//! Fixed-timestep tick loop.
//!
//! Drives [`Engine::step`] at a fixed rate, passing the nominal period as
//! `dt`. Ticks never overlap. The blocking [`TickLoop::run`] sleeps away any
//! remaining budget; [`TickLoop::run_async`] uses a tokio interval that
//! bursts to catch up after a slow tick.

use std::time::{Duration, Instant};

use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::TickConfig;
use crate::engine::{Engine, TickReport};

/// The tick loop state.
#[derive(Debug)]
pub struct TickLoop {
    /// Ticks run by this loop.
    ticks: u64,
    /// Tick configuration.
    config: TickConfig,
    /// The engine being driven.
    engine: Engine,
}

impl TickLoop {
    /// Create a new tick loop around `engine`.
    #[must_use]
    pub fn new(config: TickConfig, engine: Engine) -> Self {
        if let Err(err) = config.validate() {
            warn!(%err, period = ?config.period(), "running at the default rate");
        }
        Self {
            ticks: 0,
            config,
            engine,
        }
    }

    /// Ticks run by this loop so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The loop configuration.
    #[must_use]
    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Returns a reference to the engine.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns a mutable reference to the engine.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Give the engine back.
    #[must_use]
    pub fn into_engine(self) -> Engine {
        self.engine
    }

    fn is_done(&self) -> bool {
        self.config.max_ticks > 0 && self.ticks >= self.config.max_ticks
    }

    /// Run exactly one tick with the nominal period as `dt`.
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let report = self.engine.step(self.config.period().as_secs_f64());
        if report.messages_dropped > 0 {
            warn!(
                tick_id = report.tick_id,
                dropped = report.messages_dropped,
                "messages dropped this tick"
            );
        }
        report
    }

    /// Run the loop for the configured number of ticks, or indefinitely.
    pub fn run(&mut self) {
        let tick_duration = self.config.period();

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        while !self.is_done() {
            let start = Instant::now();
            let report = self.tick();
            if self.is_done() {
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                over_budget(report.tick_id, elapsed, tick_duration);
            }
        }
        info!(ticks = self.ticks, "tick loop complete");
    }

    /// Async flavour of [`run`](Self::run), paced by a tokio interval.
    pub async fn run_async(&mut self) {
        let tick_duration = self.config.period();
        let mut interval = time::interval(tick_duration);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting async tick loop"
        );

        while !self.is_done() {
            interval.tick().await;
            let start = Instant::now();
            let report = self.tick();
            let elapsed = start.elapsed();
            if elapsed > tick_duration {
                over_budget(report.tick_id, elapsed, tick_duration);
            }
        }
        info!(ticks = self.ticks, "tick loop complete");
    }
}

fn over_budget(tick_id: u64, elapsed: Duration, budget: Duration) {
    warn!(
        tick_id,
        elapsed_ms = elapsed.as_millis() as u64,
        budget_ms = budget.as_millis() as u64,
        "tick exceeded time budget"
    );
}
