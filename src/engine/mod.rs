//! Engine module - timeline, checkpoints and playback.
//!
//! The [`SimulationEngine`] owns the canonical time cursor and is the only
//! thing that drives the program host. The [`PlaybackController`] decides
//! once per animation frame whether to advance it, replay it, or show a
//! cached [`Checkpoint`] instead.

mod checkpoint;
mod playback;
mod simulation;

#[cfg(test)]
pub(crate) mod testing;

pub use checkpoint::{Checkpoint, CheckpointStore, CompressionType};
pub use playback::{PlayIndicator, PlaybackController, PlaybackState, Presented};
pub use simulation::{EngineError, SimulationEngine};
