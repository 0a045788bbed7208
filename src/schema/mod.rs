//! Schema module - Configuration and seeding types for sandbox runs.

mod config;
mod seed;

pub use config::*;
pub use seed::*;
