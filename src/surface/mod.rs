//! Render surfaces and captured frames.
//!
//! The engine only needs two things from whatever it draws into: wiping it
//! and capturing its current contents as an owned [`Frame`]. Showing a frame
//! to the user is the job of a separate [`Display`].

mod canvas;
mod frame;

pub use canvas::{Canvas, Rgba, Shape, WHITE, channel_to_u8};
pub use frame::Frame;

/// A drawable the engine can wipe and snapshot.
pub trait Surface {
    /// Reset every pixel to the background.
    fn clear(&mut self);

    /// Capture the current contents as an immutable snapshot.
    fn capture(&self) -> Frame;
}

/// Where frames chosen for display end up.
pub trait Display {
    /// Show `frame` in place of whatever was shown before.
    fn present(&mut self, frame: &Frame);
}

/// Display that just remembers the last frame it was given.
///
/// Used by the browser bindings, which copy the pixels out on request, and
/// by headless runs.
#[derive(Debug, Default, Clone)]
pub struct LatestFrame {
    frame: Option<Frame>,
    presented: u64,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last presented frame, if any.
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Display for LatestFrame {
    fn present(&mut self, frame: &Frame) {
        self.frame = Some(frame.clone());
        self.presented += 1;
    }
}
