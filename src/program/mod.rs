//! Program module - user programs and the host that runs them.
//!
//! A program is evaluated from source text into an isolated execution
//! context exposing three optional hooks: `init`, `update(dt)` and
//! `draw(surface)`. Rebuilding the context from source is the only way back
//! to t=0, since the program's own state is never snapshotted.

mod host;
mod script;

pub use host::ProgramHost;
pub use script::{LANGUAGE as SCRIPT_LANGUAGE, ScriptEvaluator};

use std::fmt;

use rand::rngs::StdRng;

/// Hook contract of an evaluated program. Every hook defaults to a no-op.
pub trait Program<S: ?Sized> {
    /// Called once, right after evaluation.
    fn init(&mut self) -> Result<(), ProgramError> {
        Ok(())
    }

    /// Advance the program's own state by `dt`.
    fn update(&mut self, _dt: f64) -> Result<(), ProgramError> {
        Ok(())
    }

    /// Render the current state.
    fn draw(&mut self, _surface: &mut S) -> Result<(), ProgramError> {
        Ok(())
    }
}

/// Capability to turn source text into a running program.
///
/// Each call must build a fresh context: nothing may leak from one
/// evaluation into the next except through `rng`, which the host seeds.
pub trait Evaluator<S: ?Sized> {
    /// MIME-like tag recorded in exports (e.g. `text/x-rhai`).
    fn language(&self) -> &str;

    /// Evaluate `source` into a new program owning `rng`.
    fn evaluate(&self, source: &str, rng: StdRng) -> Result<Box<dyn Program<S>>, LoadError>;
}

/// Which hook a runtime failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Init,
    Update,
    Draw,
}

impl Hook {
    /// Function name the hook is looked up by.
    pub fn name(self) -> &'static str {
        match self {
            Hook::Init => "init",
            Hook::Update => "update",
            Hook::Draw => "draw",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A hook failed while the program was running.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Program `{hook}` hook failed: {message}")]
pub struct ProgramError {
    pub hook: Hook,
    pub message: String,
}

impl ProgramError {
    pub fn new(hook: Hook, message: impl Into<String>) -> Self {
        Self {
            hook,
            message: message.into(),
        }
    }
}

/// Source could not be turned into a running program.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("No program loaded")]
    NoProgram,
    #[error("Program failed to compile: {0}")]
    Compile(String),
    #[error("Program failed to evaluate: {0}")]
    Evaluate(String),
    #[error(transparent)]
    Init(#[from] ProgramError),
}
