//! Configuration types for sandbox playback and replay parameters.

use serde::{Deserialize, Serialize};

use crate::engine::CompressionType;

/// Top-level sandbox configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Render surface width in pixels.
    pub width: usize,
    /// Render surface height in pixels.
    pub height: usize,
    /// Half extent of the visible world in each axis (origin at the centre).
    pub view_size: f32,
    /// Time advanced by one update (1.0 = one frame unit).
    pub step: f64,
    /// Minimum time between two consecutive checkpoints.
    pub checkpoint_interval: f64,
    /// Maximum time of the time control; no checkpoints are taken past it.
    pub max_time: f64,
    /// Time jumped by the seek keys.
    pub seek_delta: f64,
    /// Target animation frames per second for the fixed-interval scheduler.
    pub frame_rate: f64,
    /// Storage compression for checkpoint frames.
    pub compression: CompressionType,
    /// Resource limits for evaluated programs.
    pub script: ScriptLimits,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            view_size: 5.0,
            step: 1.0,
            checkpoint_interval: 10.0,
            max_time: 1000.0,
            seek_delta: 100.0,
            frame_rate: 60.0,
            compression: CompressionType::None,
            script: ScriptLimits::default(),
        }
    }
}

/// Limits applied to every fresh script execution context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLimits {
    /// Maximum nesting of function calls.
    pub max_call_levels: usize,
    /// Maximum expression nesting depth (global and inside functions).
    pub max_expr_depth: usize,
    /// Maximum operations per evaluation or hook call (0 = unlimited).
    pub max_operations: u64,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_call_levels: 64,
            max_expr_depth: 64,
            max_operations: 1_000_000,
        }
    }
}

impl SandboxConfig {
    /// Seconds between two scheduled animation frames.
    #[inline]
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.frame_rate)
    }

    /// Number of whole steps needed to reach `time` from zero.
    ///
    /// Negative times clamp to zero.
    #[inline]
    pub fn steps_for(&self, time: f64) -> u64 {
        if time <= 0.0 {
            return 0;
        }
        (time / self.step + TIME_EPSILON).floor() as u64
    }

    /// Time reached after `steps` whole steps.
    #[inline]
    pub fn time_at(&self, steps: u64) -> f64 {
        steps as f64 * self.step
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if !(self.view_size > 0.0) {
            return Err(ConfigError::InvalidViewSize);
        }
        if !(self.step > 0.0) || !self.step.is_finite() {
            return Err(ConfigError::InvalidTimeStep);
        }
        if !(self.checkpoint_interval > 0.0) {
            return Err(ConfigError::InvalidCheckpointInterval);
        }
        if !(self.max_time >= 0.0) {
            return Err(ConfigError::InvalidMaxTime);
        }
        if !(self.frame_rate > 0.0) || !self.frame_rate.is_finite() {
            return Err(ConfigError::InvalidFrameRate);
        }
        if cfg!(not(feature = "lz4")) && self.compression == CompressionType::Lz4 {
            return Err(ConfigError::CompressionUnavailable);
        }
        Ok(())
    }
}

/// Tolerance used when comparing accumulated fractional times.
pub const TIME_EPSILON: f64 = 1e-9;

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Surface dimensions (width, height) must be non-zero")]
    InvalidDimensions,
    #[error("View size must be positive")]
    InvalidViewSize,
    #[error("Time step must be positive and finite")]
    InvalidTimeStep,
    #[error("Checkpoint interval must be positive")]
    InvalidCheckpointInterval,
    #[error("Maximum time must be non-negative")]
    InvalidMaxTime,
    #[error("Frame rate must be positive and finite")]
    InvalidFrameRate,
    #[error("LZ4 checkpoint compression requires the `lz4` feature")]
    CompressionUnavailable,
}
