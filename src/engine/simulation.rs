//! Deterministic re-simulation over a fixed time step.
//!
//! Reaching time `T` always means: clear the surface, build a fresh program
//! context with the run's seed, draw frame 0, then `update` + `draw` once per
//! step until `T`. Live ticking performs exactly the same per-step work, so a
//! frame reached by playing is pixel-identical to the same frame reached by
//! replaying.

use std::io;

use crate::program::{Evaluator, LoadError, ProgramError, ProgramHost};
use crate::schema::{SandboxConfig, Seed, TIME_EPSILON};
use crate::surface::{Frame, Surface};

use super::CheckpointStore;

/// Failure while advancing or rebuilding the timeline.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error("Checkpoint frame could not be restored: {0}")]
    Checkpoint(#[from] io::Error),
}

/// Owns the time cursor, the program host, the checkpoints and the surface.
pub struct SimulationEngine<S: Surface> {
    config: SandboxConfig,
    host: ProgramHost<S>,
    checkpoints: CheckpointStore,
    surface: S,
    /// Always `config.time_at(step)`.
    time: f64,
    step: u64,
}

impl<S: Surface> SimulationEngine<S> {
    pub fn new(
        config: SandboxConfig,
        evaluator: Box<dyn Evaluator<S>>,
        surface: S,
        seed: Seed,
    ) -> Self {
        let checkpoints = CheckpointStore::new(config.compression);
        Self {
            config,
            host: ProgramHost::new(evaluator, seed),
            checkpoints,
            surface,
            time: 0.0,
            step: 0,
        }
    }

    /// Replace the program and show its first frame.
    ///
    /// The seed is kept; checkpoints of the previous program are discarded.
    pub fn load_program(&mut self, source: impl Into<String>) -> Result<(), EngineError> {
        self.reset_to_start();
        self.host.load(source);
        log::info!("Loaded program ({} bytes)", self.host.source().map_or(0, str::len));
        self.simulate_to(0.0)
    }

    /// Start a new run of the current program under `seed`.
    pub fn reseed(&mut self, seed: Seed) -> Result<(), EngineError> {
        log::info!("Reseeding with {}", seed);
        self.set_seed(seed);
        self.simulate_to(0.0)
    }

    /// Install `seed` for the next run without replaying.
    pub fn set_seed(&mut self, seed: Seed) {
        self.reset_to_start();
        self.host.set_seed(seed);
    }

    /// Rewind the cursor to zero, wipe the surface and forget every
    /// checkpoint.
    pub fn reset_to_start(&mut self) {
        self.time = 0.0;
        self.step = 0;
        self.checkpoints.clear();
        self.surface.clear();
    }

    /// Rebuild the timeline from scratch up to `target`.
    ///
    /// `target` is floored to a whole number of steps and clamped at zero.
    /// Without a program the surface is cleared and nothing else happens.
    pub fn simulate_to(&mut self, target: f64) -> Result<(), EngineError> {
        self.surface.clear();
        if !self.host.is_loaded() {
            return Ok(());
        }

        let target_steps = self.config.steps_for(target);
        self.step = 0;
        self.time = 0.0;
        self.host.init_context()?;
        self.host.draw(&mut self.surface)?;
        self.maybe_checkpoint();

        while self.step < target_steps {
            self.advance()?;
            self.maybe_checkpoint();
        }
        log::debug!(
            "Simulated to t={} ({} steps, {} checkpoints)",
            self.time,
            self.step,
            self.checkpoints.len()
        );
        Ok(())
    }

    /// Advance one step on the live context, drawing over the last frame.
    ///
    /// Does not record a checkpoint; callers follow up with
    /// [`SimulationEngine::maybe_checkpoint`].
    pub fn tick(&mut self) -> Result<(), EngineError> {
        if !self.host.is_running() {
            return Ok(());
        }
        self.advance()
    }

    fn advance(&mut self) -> Result<(), EngineError> {
        self.step += 1;
        self.time = self.config.time_at(self.step);
        self.host.update(self.config.step)?;
        self.host.draw(&mut self.surface)?;
        Ok(())
    }

    /// Record the current frame if it is due. Returns whether one was taken.
    ///
    /// A frame is due when no checkpoint precedes the cursor, or the nearest
    /// one is at least one interval behind it. Nothing past `max_time` is
    /// recorded.
    pub fn maybe_checkpoint(&mut self) -> bool {
        if self.time > self.config.max_time {
            return false;
        }
        let due = match self.checkpoints.nearest_prior_or_equal(self.time) {
            None => true,
            Some(nearest) => {
                self.time - nearest.time() + TIME_EPSILON >= self.config.checkpoint_interval
            }
        };
        if due {
            self.checkpoints
                .record(self.time, self.step, self.surface.capture());
        }
        due
    }

    /// Snapshot of the surface as it is now.
    pub fn capture(&self) -> Frame {
        self.surface.capture()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn host(&self) -> &ProgramHost<S> {
        &self.host
    }

    pub fn seed(&self) -> &Seed {
        self.host.seed()
    }

    pub fn source(&self) -> Option<&str> {
        self.host.source()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}
