//! Engine and tick loop configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::EngineError;

/// Environment variable overriding [`TickConfig::tick_rate`].
pub const TICK_RATE_ENV: &str = "VENUS_TICK_RATE";

/// Environment variable overriding [`TickConfig::max_ticks`].
pub const MAX_TICKS_ENV: &str = "VENUS_MAX_TICKS";

/// Highest accepted tick rate. Anything faster rounds the period to zero.
pub const MAX_TICK_RATE: f64 = 1_000_000.0;

/// Configuration for the engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on message waves drained per tick. Messages still queued
    /// after the last wave are dropped.
    pub max_message_waves: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_message_waves: 16,
        }
    }
}

impl EngineConfig {
    /// Override the message wave bound.
    #[must_use]
    pub fn with_max_message_waves(mut self, waves: usize) -> Self {
        self.max_message_waves = waves;
        self
    }
}

/// Configuration for the tick loop.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

impl TickConfig {
    /// Override the tick rate.
    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate: f64) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Override the tick limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Defaults, overridden by `VENUS_TICK_RATE` and `VENUS_MAX_TICKS` when
    /// they are set. Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(rate) = env_override::<f64>(TICK_RATE_ENV) {
            if valid_tick_rate(rate) {
                config.tick_rate = rate;
            } else {
                warn!(var = TICK_RATE_ENV, rate, "tick rate out of range, ignoring");
            }
        }
        if let Some(max_ticks) = env_override(MAX_TICKS_ENV) {
            config.max_ticks = max_ticks;
        }
        config
    }

    /// Check that the tick rate is positive and at most [`MAX_TICK_RATE`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTickRate`] otherwise.
    pub fn validate(&self) -> Result<(), EngineError> {
        if valid_tick_rate(self.tick_rate) {
            Ok(())
        } else {
            Err(EngineError::InvalidTickRate(self.tick_rate))
        }
    }

    /// Wall-clock length of one tick. An out-of-range rate falls back to the
    /// default rate.
    #[must_use]
    pub fn period(&self) -> Duration {
        let rate = if valid_tick_rate(self.tick_rate) {
            self.tick_rate
        } else {
            Self::default().tick_rate
        };
        Duration::from_secs_f64(1.0 / rate)
    }
}

fn valid_tick_rate(rate: f64) -> bool {
    rate > 0.0 && rate <= MAX_TICK_RATE
}

fn env_override<T: FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
