//! Seed tokens for reproducible program runs.
//!
//! A [`Seed`] is chosen once per run (fresh load or explicit reseed) and is
//! re-applied to every execution context built for that run, so a replay
//! draws exactly the same random stream as the run that produced a
//! checkpoint or an export.

use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Opaque reproducibility token.
///
/// Serialized untagged so exported inputs read as `{"seed": 0.42}` or
/// `{"seed": "gallery-3"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seed {
    /// Numeric seed, as produced by [`derive_seed`].
    Number(f64),
    /// Free-form textual seed.
    Text(String),
}

impl Seed {
    /// Build the random stream this seed stands for.
    ///
    /// The stream is a pure function of the seed's canonical bytes.
    pub fn rng(&self) -> StdRng {
        let digest = blake3::hash(&self.canonical_bytes());
        StdRng::from_seed(*digest.as_bytes())
    }

    /// Parse a seed given on a command line: numbers stay numeric.
    pub fn parse_lossy(s: &str) -> Self {
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Seed::Number(v),
            _ => Seed::Text(s.to_string()),
        }
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            Seed::Number(v) => {
                // -0.0 and 0.0 are the same seed
                let v = if *v == 0.0 { 0.0f64 } else { *v };
                let mut bytes = b"n:".to_vec();
                bytes.extend_from_slice(&v.to_bits().to_le_bytes());
                bytes
            }
            Seed::Text(s) => {
                let mut bytes = b"s:".to_vec();
                bytes.extend_from_slice(s.as_bytes());
                bytes
            }
        }
    }
}

impl Default for Seed {
    fn default() -> Self {
        Seed::Number(0.0)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::Number(v) => write!(f, "{v}"),
            Seed::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Seed {
    fn from(v: f64) -> Self {
        Seed::Number(v)
    }
}

impl From<&str> for Seed {
    fn from(s: &str) -> Self {
        Seed::Text(s.to_string())
    }
}

/// Draw a fresh seed from the entropy source.
pub fn derive_seed() -> Seed {
    Seed::Number(rand::random::<f64>())
}
