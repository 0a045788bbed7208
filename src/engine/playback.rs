//! Playback state machine driven once per animation frame.

use crate::schema::TIME_EPSILON;
use crate::surface::{Display, Surface};

use super::{EngineError, SimulationEngine};

/// Where the user has put the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    /// Time control is held; `resume_playing` is restored on release.
    Scrubbing { resume_playing: bool },
}

/// Icon the play/pause control should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayIndicator {
    Play,
    Pause,
}

/// What one animation frame put on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Presented {
    /// The engine's own surface.
    Live,
    /// A cached frame; the engine's cursor was left where it was.
    Checkpoint { time: f64 },
}

/// Owns the playback state and the time control's position.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    state: PlaybackState,
    /// Time control value, within `[0, max_time]`.
    position: f64,
    max_time: f64,
}

impl PlaybackController {
    /// Start paused at zero.
    pub fn new(max_time: f64) -> Self {
        Self {
            state: PlaybackState::Paused,
            position: 0.0,
            max_time,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_scrubbing(&self) -> bool {
        matches!(self.state, PlaybackState::Scrubbing { .. })
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn indicator(&self) -> PlayIndicator {
        if self.is_playing() {
            PlayIndicator::Pause
        } else {
            PlayIndicator::Play
        }
    }

    fn clamp(&self, time: f64) -> f64 {
        time.clamp(0.0, self.max_time)
    }

    /// While scrubbing this only changes what happens on release.
    pub fn play(&mut self) {
        self.state = match self.state {
            PlaybackState::Scrubbing { .. } => PlaybackState::Scrubbing {
                resume_playing: true,
            },
            _ => PlaybackState::Playing,
        };
    }

    pub fn pause(&mut self) {
        self.state = match self.state {
            PlaybackState::Scrubbing { .. } => PlaybackState::Scrubbing {
                resume_playing: false,
            },
            _ => PlaybackState::Paused,
        };
    }

    pub fn toggle(&mut self) {
        let playing = match self.state {
            PlaybackState::Playing => true,
            PlaybackState::Paused => false,
            PlaybackState::Scrubbing { resume_playing } => resume_playing,
        };
        if playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Grab the time control at `position`.
    pub fn scrub_start(&mut self, position: f64) {
        if !self.is_scrubbing() {
            self.state = PlaybackState::Scrubbing {
                resume_playing: self.is_playing(),
            };
        }
        self.position = self.clamp(position);
    }

    /// Drag the time control. Ignored unless scrubbing.
    pub fn scrub_move(&mut self, position: f64) {
        if self.is_scrubbing() {
            self.position = self.clamp(position);
        }
    }

    /// Release the time control: replay exactly to its position and restore
    /// the prior play state.
    pub fn scrub_end<S: Surface>(
        &mut self,
        engine: &mut SimulationEngine<S>,
    ) -> Result<(), EngineError> {
        let PlaybackState::Scrubbing { resume_playing } = self.state else {
            return Ok(());
        };
        self.state = if resume_playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        };
        engine.simulate_to(self.position)?;
        self.position = self.clamp(engine.time());
        Ok(())
    }

    /// Move the time control to wherever the engine is now.
    pub fn follow<S: Surface>(&mut self, engine: &SimulationEngine<S>) {
        self.position = self.clamp(engine.time());
    }

    /// Jump by `delta` from the engine's time with an exact replay.
    pub fn seek_by<S: Surface>(
        &mut self,
        engine: &mut SimulationEngine<S>,
        delta: f64,
    ) -> Result<(), EngineError> {
        let target = engine.time() + delta;
        self.seek_to(engine, target)
    }

    /// Replay exactly to `target` (clamped at zero) and move the time
    /// control along.
    pub fn seek_to<S: Surface>(
        &mut self,
        engine: &mut SimulationEngine<S>,
        target: f64,
    ) -> Result<(), EngineError> {
        let target = target.max(0.0);
        log::debug!("Seeking to t={}", target);
        engine.simulate_to(target)?;
        self.position = self.clamp(engine.time());
        Ok(())
    }

    /// Per-frame work.
    ///
    /// - Playing: tick, follow with the time control, maybe checkpoint.
    /// - Scrubbing: show the nearest checkpoint if it is close enough,
    ///   otherwise replay to the scrub position.
    /// - Paused: just present.
    pub fn on_animation_frame<S: Surface>(
        &mut self,
        engine: &mut SimulationEngine<S>,
        display: &mut dyn Display,
    ) -> Result<Presented, EngineError> {
        match self.state {
            PlaybackState::Playing => {
                engine.tick()?;
                self.position = self.clamp(engine.time());
                engine.maybe_checkpoint();
            }
            PlaybackState::Scrubbing { .. } => {
                let query = self.position;
                let reach = engine.config().checkpoint_interval + engine.config().step;
                let shortcut = engine
                    .checkpoints()
                    .nearest_prior_or_equal(query)
                    .filter(|c| query - c.time() <= reach + TIME_EPSILON)
                    .map(|c| (c.time(), c.image()));

                match shortcut {
                    Some((time, image)) => {
                        display.present(&image?);
                        return Ok(Presented::Checkpoint { time });
                    }
                    None => engine.simulate_to(query)?,
                }
            }
            PlaybackState::Paused => {}
        }
        display.present(&engine.capture());
        Ok(Presented::Live)
    }
}
