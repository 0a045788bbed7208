//! Checkpoint store: rendered frames cached along the timeline.
//!
//! Checkpoints only hold what was drawn, never the program's own state, so
//! they can stand in for a frame on screen but cannot be resumed from.

use std::io;

use serde::{Deserialize, Serialize};

use crate::surface::Frame;

/// Storage compression for checkpoint frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    /// Frames are kept as-is (shared with the capture, no copy).
    #[default]
    None,
    /// LZ4 fast compression.
    Lz4,
}

/// How a checkpoint's pixels are held in memory.
#[derive(Debug, Clone)]
enum StoredFrame {
    Raw(Frame),
    Compressed {
        width: u32,
        height: u32,
        bytes: Vec<u8>,
    },
}

/// A rendered frame at a specific time. Immutable once recorded.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    time: f64,
    step: u64,
    stored: StoredFrame,
}

impl Checkpoint {
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Bytes held for this checkpoint's pixels.
    pub fn stored_size(&self) -> usize {
        match &self.stored {
            StoredFrame::Raw(frame) => frame.pixels().len(),
            StoredFrame::Compressed { bytes, .. } => bytes.len(),
        }
    }

    /// Recover the captured frame.
    pub fn image(&self) -> io::Result<Frame> {
        match &self.stored {
            StoredFrame::Raw(frame) => Ok(frame.clone()),
            StoredFrame::Compressed {
                width,
                height,
                bytes,
            } => Frame::new(*width, *height, decompress_lz4(bytes)?),
        }
    }
}

/// Ordered collection of checkpoints with nearest-prior lookup.
///
/// Unbounded: entries are only dropped by [`CheckpointStore::clear`].
#[derive(Debug, Default)]
pub struct CheckpointStore {
    checkpoints: Vec<Checkpoint>,
    compression: CompressionType,
}

impl CheckpointStore {
    /// Create an empty store.
    pub fn new(compression: CompressionType) -> Self {
        Self {
            checkpoints: Vec::new(),
            compression,
        }
    }

    /// Append a checkpoint. Spacing is the caller's responsibility.
    pub fn record(&mut self, time: f64, step: u64, frame: Frame) {
        let stored = match self.compression {
            CompressionType::None => StoredFrame::Raw(frame),
            CompressionType::Lz4 => StoredFrame::Compressed {
                width: frame.width(),
                height: frame.height(),
                bytes: compress_lz4(frame.pixels()),
            },
        };
        log::debug!("Checkpoint recorded at t={} (step {})", time, step);
        self.checkpoints.push(Checkpoint { time, step, stored });
    }

    /// Checkpoint with the greatest time `<= query`.
    ///
    /// When several share that time the last inserted one is returned.
    pub fn nearest_prior_or_equal(&self, query: f64) -> Option<&Checkpoint> {
        let mut nearest: Option<&Checkpoint> = None;
        for checkpoint in &self.checkpoints {
            if checkpoint.time > query {
                continue;
            }
            match nearest {
                Some(best) if checkpoint.time < best.time => {}
                _ => nearest = Some(checkpoint),
            }
        }
        nearest
    }

    /// Drop every checkpoint.
    pub fn clear(&mut self) {
        if !self.checkpoints.is_empty() {
            log::debug!("Clearing {} checkpoints", self.checkpoints.len());
        }
        self.checkpoints.clear();
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Checkpoints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }

    /// Checkpoint times, sorted ascending.
    pub fn times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self.checkpoints.iter().map(|c| c.time).collect();
        times.sort_by(f64::total_cmp);
        times
    }

    /// Total bytes held for pixels.
    pub fn stored_bytes(&self) -> usize {
        self.checkpoints.iter().map(Checkpoint::stored_size).sum()
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }
}

/// Compress data using LZ4.
#[cfg(feature = "lz4")]
fn compress_lz4(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

/// Decompress LZ4 data.
#[cfg(feature = "lz4")]
fn decompress_lz4(data: &[u8]) -> io::Result<Vec<u8>> {
    lz4_flex::decompress_size_prepended(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Fallback when LZ4 is not available.
#[cfg(not(feature = "lz4"))]
fn compress_lz4(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

#[cfg(not(feature = "lz4"))]
fn decompress_lz4(data: &[u8]) -> io::Result<Vec<u8>> {
    Ok(data.to_vec())
}
