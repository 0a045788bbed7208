//! Reelbox - live-coding animation sandbox core.
//!
//! A user program (source text evaluated at runtime) drives a drawing
//! surface frame by frame. The sandbox provides play/pause, scrubbing and
//! seeking over a deterministic timeline, caches rendered checkpoints so
//! scrubbing stays interactive, and round-trips the program through the
//! metadata of exported PNG frames.
//!
//! # Architecture
//!
//! - `schema`: Configuration and seeds
//! - `surface`: Drawing surfaces, frames and the software canvas
//! - `program`: The program contract, its host and the Rhai evaluator
//! - `engine`: Re-simulation, checkpoints and the playback state machine
//! - `metadata`: PNG text chunks and version gating
//! - `sandbox`: The facade tying it all to UI events
//!
//! # Example
//!
//! ```rust,no_run
//! use reelbox::{Sandbox, SandboxConfig, Seed};
//! use reelbox::metadata::AlwaysAccept;
//!
//! let mut sandbox = Sandbox::scripted_with_seed(SandboxConfig::default(), Seed::from(0.5))?;
//! sandbox.load(r#"
//!     fn init() { this.x = -4.0; }
//!     fn update(dt) { this.x += 0.05 * dt; }
//!     fn draw(surface) { surface.circle(this.x, 0, 0.5); }
//! "#)?;
//! sandbox.seek_to(120.0)?;
//! let png = sandbox.export_png()?;
//!
//! // Anyone holding `png` can rebuild the exact same frame
//! let mut other = Sandbox::scripted(SandboxConfig::default())?;
//! let imported = other.import_png(&png, &mut AlwaysAccept)?;
//! other.seek_to(imported.time())?;
//! assert_eq!(other.frame(), sandbox.frame());
//! # Ok::<(), reelbox::SandboxError>(())
//! ```

pub mod engine;
pub mod metadata;
pub mod program;
pub mod sandbox;
pub mod schema;
pub mod surface;

// WebAssembly bindings (only for wasm32 target)
#[cfg(target_arch = "wasm32")]
pub mod wasm;

// Re-export commonly used types
pub use engine::{EngineError, PlaybackController, Presented, SimulationEngine};
pub use metadata::{API_VERSION, Confirm, MetadataError};
pub use sandbox::{EventOutcome, KeyCode, Sandbox, SandboxError, UiEvent};
pub use schema::{SandboxConfig, Seed};
pub use surface::{Canvas, Frame};
