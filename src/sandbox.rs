//! The sandbox facade: one engine, one controller, and the UI verbs that
//! drive them.

use chrono::Utc;

use crate::engine::{EngineError, PlaybackController, Presented, SimulationEngine};
use crate::metadata::{self, Confirm, ExportRecord, ImportedProgram, MetadataError, ProgramInputs};
use crate::program::{Evaluator, ScriptEvaluator};
use crate::schema::{ConfigError, SandboxConfig, Seed, derive_seed};
use crate::surface::{Canvas, Display, Frame, Surface};

/// Keys the sandbox reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Space,
    ArrowLeft,
    ArrowRight,
    Other,
}

/// Input coming from the user interface.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    PlayPause,
    Reseed,
    Export,
    /// A file was dropped; its bytes are imported as a PNG.
    Drop(Vec<u8>),
    /// Pointer down on the time control.
    ScrubStart,
    /// Time control moved to this position.
    ScrubMove(f64),
    /// Pointer released.
    ScrubEnd,
    Key(KeyCode),
}

/// Result of handling one [`UiEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Handled,
    Ignored,
    /// Encoded PNG with embedded metadata.
    Exported(Vec<u8>),
    /// Import succeeded; `time` is where the exported frame was taken.
    Imported { time: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("No program loaded")]
    NoProgram,
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("PNG decoding failed: {0}")]
    Decode(#[from] png::DecodingError),
}

/// Live-coding sandbox over a surface `S`.
pub struct Sandbox<S: Surface> {
    engine: SimulationEngine<S>,
    controller: PlaybackController,
}

impl Sandbox<Canvas> {
    /// Sandbox running Rhai programs on a software canvas.
    pub fn scripted(config: SandboxConfig) -> Result<Self, SandboxError> {
        Self::scripted_with_seed(config, derive_seed())
    }

    pub fn scripted_with_seed(config: SandboxConfig, seed: Seed) -> Result<Self, SandboxError> {
        let canvas = Canvas::new(config.width, config.height, config.view_size);
        let evaluator = ScriptEvaluator::new(config.script, config.view_size);
        Self::with_seed(config, Box::new(evaluator), canvas, seed)
    }
}

impl<S: Surface> Sandbox<S> {
    /// Create a sandbox with a fresh seed.
    pub fn new(
        config: SandboxConfig,
        evaluator: Box<dyn Evaluator<S>>,
        surface: S,
    ) -> Result<Self, SandboxError> {
        Self::with_seed(config, evaluator, surface, derive_seed())
    }

    pub fn with_seed(
        config: SandboxConfig,
        evaluator: Box<dyn Evaluator<S>>,
        surface: S,
        seed: Seed,
    ) -> Result<Self, SandboxError> {
        config.validate()?;
        let controller = PlaybackController::new(config.max_time);
        Ok(Self {
            engine: SimulationEngine::new(config, evaluator, surface, seed),
            controller,
        })
    }

    /// Load new source and start playing from t=0.
    pub fn load(&mut self, source: impl Into<String>) -> Result<(), SandboxError> {
        self.controller.pause();
        self.engine.load_program(source)?;
        self.controller.follow(&self.engine);
        self.controller.play();
        Ok(())
    }

    /// Restart the current program under a fresh seed.
    pub fn reseed(&mut self) -> Result<Seed, SandboxError> {
        let seed = derive_seed();
        self.reseed_with(seed.clone())?;
        Ok(seed)
    }

    pub fn reseed_with(&mut self, seed: Seed) -> Result<(), SandboxError> {
        self.engine.reseed(seed)?;
        self.controller.follow(&self.engine);
        Ok(())
    }

    pub fn play(&mut self) {
        self.controller.play();
    }

    pub fn pause(&mut self) {
        self.controller.pause();
    }

    pub fn toggle(&mut self) {
        self.controller.toggle();
    }

    pub fn scrub_start(&mut self) {
        let position = self.controller.position();
        self.controller.scrub_start(position);
    }

    pub fn scrub_move(&mut self, position: f64) {
        self.controller.scrub_move(position);
    }

    pub fn scrub_end(&mut self) -> Result<(), SandboxError> {
        Ok(self.controller.scrub_end(&mut self.engine)?)
    }

    pub fn seek_by(&mut self, delta: f64) -> Result<(), SandboxError> {
        Ok(self.controller.seek_by(&mut self.engine, delta)?)
    }

    /// Replay exactly to `time`.
    pub fn seek_to(&mut self, time: f64) -> Result<(), SandboxError> {
        Ok(self.controller.seek_to(&mut self.engine, time)?)
    }

    /// Run one animation frame. A failing program pauses playback.
    pub fn animation_frame(&mut self, display: &mut dyn Display) -> Result<Presented, SandboxError> {
        match self.controller.on_animation_frame(&mut self.engine, display) {
            Ok(presented) => Ok(presented),
            Err(e) => {
                log::error!("Program stopped at t={}: {}", self.engine.time(), e);
                self.controller.pause();
                Err(e.into())
            }
        }
    }

    /// Encode the current frame as PNG with the program embedded.
    pub fn export_png(&self) -> Result<Vec<u8>, SandboxError> {
        let source = self.engine.source().ok_or(SandboxError::NoProgram)?;
        let png = self.engine.capture().to_png()?;
        let record = ExportRecord::new(
            source,
            self.engine.host().language(),
            ProgramInputs::new(self.engine.time(), self.engine.seed().clone()),
            Utc::now(),
        );
        let bytes = metadata::embed(&png, &record)?;
        log::info!(
            "Exported frame at t={} ({} bytes)",
            self.engine.time(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Load the program embedded in an exported PNG and play it from t=0.
    ///
    /// The embedded seed replaces the current one. The returned program
    /// reports the exported time so callers can [`Sandbox::seek_to`] it.
    pub fn import_png(
        &mut self,
        bytes: &[u8],
        confirm: &mut dyn Confirm,
    ) -> Result<ImportedProgram, SandboxError> {
        let imported = metadata::decode(bytes, confirm)?;
        self.controller.pause();
        if let Some(seed) = imported.inputs.as_ref().and_then(|i| i.seed.clone()) {
            self.engine.set_seed(seed);
        }
        if let Some(language) = &imported.language {
            if language != self.engine.host().language() {
                log::warn!(
                    "Imported program is tagged {} but this sandbox runs {}",
                    language,
                    self.engine.host().language()
                );
            }
        }
        log::info!(
            "Imported program (API {}, t={}, seed {})",
            imported.version,
            imported.time(),
            self.engine.seed()
        );
        self.load(imported.source.clone())?;
        Ok(imported)
    }

    /// Dispatch one UI event.
    pub fn handle(
        &mut self,
        event: UiEvent,
        confirm: &mut dyn Confirm,
    ) -> Result<EventOutcome, SandboxError> {
        let seek_delta = self.config().seek_delta;
        match event {
            UiEvent::PlayPause | UiEvent::Key(KeyCode::Space) => self.toggle(),
            UiEvent::Reseed => {
                self.reseed()?;
            }
            UiEvent::Export => return Ok(EventOutcome::Exported(self.export_png()?)),
            UiEvent::Drop(bytes) => {
                let imported = self.import_png(&bytes, confirm)?;
                return Ok(EventOutcome::Imported {
                    time: imported.time(),
                });
            }
            UiEvent::ScrubStart => self.scrub_start(),
            UiEvent::ScrubMove(position) => self.scrub_move(position),
            UiEvent::ScrubEnd => self.scrub_end()?,
            UiEvent::Key(KeyCode::ArrowLeft) => self.seek_by(-seek_delta)?,
            UiEvent::Key(KeyCode::ArrowRight) => self.seek_by(seek_delta)?,
            UiEvent::Key(KeyCode::Other) => return Ok(EventOutcome::Ignored),
        }
        Ok(EventOutcome::Handled)
    }

    /// Snapshot of what the engine has drawn.
    pub fn frame(&self) -> Frame {
        self.engine.capture()
    }

    pub fn time(&self) -> f64 {
        self.engine.time()
    }

    pub fn seed(&self) -> &Seed {
        self.engine.seed()
    }

    pub fn config(&self) -> &SandboxConfig {
        self.engine.config()
    }

    pub fn engine(&self) -> &SimulationEngine<S> {
        &self.engine
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PlaybackState;
    use crate::metadata::{AlwaysAccept, AlwaysDecline, keys};
    use crate::surface::LatestFrame;

    const DRIFT: &str = r#"
        // @author: Test Suite
        fn init() {
            this.x = rand(-4.0, 4.0);
            this.y = rand(-4.0, 4.0);
        }
        fn update(dt) {
            this.x += rand(-0.5, 0.5) * dt;
            this.y += rand(-0.5, 0.5) * dt;
        }
        fn draw(surface) {
            surface.color(rand(), rand(), rand());
            surface.rect(this.x, this.y, 0.6, 0.6);
        }
    "#;

    fn config() -> SandboxConfig {
        SandboxConfig {
            width: 32,
            height: 32,
            ..SandboxConfig::default()
        }
    }

    fn sandbox(seed: f64) -> Sandbox<Canvas> {
        Sandbox::scripted_with_seed(config(), Seed::from(seed)).unwrap()
    }

    #[test]
    fn test_load_starts_playing() {
        let mut sandbox = sandbox(0.1);
        sandbox.load(DRIFT).unwrap();
        assert_eq!(sandbox.controller().state(), PlaybackState::Playing);

        let mut display = LatestFrame::new();
        for _ in 0..12 {
            sandbox.animation_frame(&mut display).unwrap();
        }
        assert_eq!(sandbox.time(), 12.0);
        assert_eq!(sandbox.engine().checkpoints().times(), vec![0.0, 10.0]);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let mut original = sandbox(0.3);
        original.load(DRIFT).unwrap();
        original.seek_to(37.0).unwrap();
        let png = original.export_png().unwrap();

        let mut restored = sandbox(0.9);
        let imported = restored.import_png(&png, &mut AlwaysAccept).unwrap();
        assert_eq!(imported.time(), 37.0);
        assert_eq!(imported.author.as_deref(), Some("Test Suite"));
        assert_eq!(restored.seed(), &Seed::from(0.3));
        assert_eq!(restored.time(), 0.0);
        assert!(restored.controller().is_playing());

        restored.seek_to(imported.time()).unwrap();
        assert_eq!(restored.frame(), Frame::from_png(&png).unwrap());
        assert_eq!(restored.frame(), original.frame());
    }

    #[test]
    fn test_export_survives_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");

        let mut original = sandbox(0.3);
        original.load(DRIFT).unwrap();
        original.seek_to(14.0).unwrap();
        std::fs::write(&path, original.export_png().unwrap()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let mut restored = sandbox(0.4);
        let imported = restored.import_png(&bytes, &mut AlwaysAccept).unwrap();
        restored.seek_to(imported.time()).unwrap();
        assert_eq!(restored.frame(), original.frame());
    }

    #[test]
    fn test_export_without_program() {
        let sandbox = sandbox(0.1);
        assert!(matches!(sandbox.export_png(), Err(SandboxError::NoProgram)));
    }

    #[test]
    fn test_declined_import_leaves_sandbox_alone() {
        let mut source = sandbox(0.3);
        source.load(DRIFT).unwrap();
        let png = source.export_png().unwrap();
        let mut entries: Vec<(String, String)> = metadata::text_entries(&png).unwrap();
        for (key, value) in &mut entries {
            if key == keys::API_VERSION {
                *value = "9.0.0".to_string();
            }
        }
        let chunks = entries
            .iter()
            .map(|(k, v)| metadata::Chunk::text(k, v).unwrap())
            .collect();
        let newer = metadata::insert_before_end(&Frame::blank(32, 32).to_png().unwrap(), chunks).unwrap();

        let mut target = sandbox(0.5);
        target.load("fn draw(s) { s.rect(0, 0, 1, 1); }").unwrap();
        let err = target.import_png(&newer, &mut AlwaysDecline).unwrap_err();
        assert!(matches!(
            err,
            SandboxError::Metadata(MetadataError::VersionIncompatible { .. })
        ));
        assert_eq!(target.seed(), &Seed::from(0.5));
        assert_eq!(target.engine().source(), Some("fn draw(s) { s.rect(0, 0, 1, 1); }"));
    }

    #[test]
    fn test_reseed_changes_frame() {
        let mut sandbox = sandbox(0.3);
        sandbox.load(DRIFT).unwrap();
        let before = sandbox.frame();
        let seed = sandbox.reseed().unwrap();
        assert_eq!(sandbox.seed(), &seed);
        assert_eq!(sandbox.time(), 0.0);
        assert_ne!(sandbox.frame(), before);
    }

    #[test]
    fn test_keys_and_buttons() {
        let mut sandbox = sandbox(0.3);
        sandbox.load(DRIFT).unwrap();
        let confirm = &mut AlwaysAccept;

        assert_eq!(
            sandbox.handle(UiEvent::Key(KeyCode::Space), confirm).unwrap(),
            EventOutcome::Handled
        );
        assert_eq!(sandbox.controller().state(), PlaybackState::Paused);

        sandbox.handle(UiEvent::Key(KeyCode::ArrowRight), confirm).unwrap();
        assert_eq!(sandbox.time(), 100.0);
        sandbox.handle(UiEvent::Key(KeyCode::ArrowLeft), confirm).unwrap();
        assert_eq!(sandbox.time(), 0.0);
        sandbox.handle(UiEvent::Key(KeyCode::ArrowLeft), confirm).unwrap();
        assert_eq!(sandbox.time(), 0.0);

        assert_eq!(
            sandbox.handle(UiEvent::Key(KeyCode::Other), confirm).unwrap(),
            EventOutcome::Ignored
        );
        sandbox.handle(UiEvent::PlayPause, confirm).unwrap();
        assert!(sandbox.controller().is_playing());
    }

    #[test]
    fn test_scrub_events() {
        let mut sandbox = sandbox(0.3);
        sandbox.load(DRIFT).unwrap();
        sandbox.seek_to(40.0).unwrap();
        let confirm = &mut AlwaysAccept;
        let mut display = LatestFrame::new();

        sandbox.handle(UiEvent::ScrubStart, confirm).unwrap();
        sandbox.handle(UiEvent::ScrubMove(25.0), confirm).unwrap();
        let presented = sandbox.animation_frame(&mut display).unwrap();
        assert_eq!(presented, Presented::Checkpoint { time: 20.0 });

        sandbox.handle(UiEvent::ScrubEnd, confirm).unwrap();
        assert_eq!(sandbox.time(), 25.0);
        assert!(sandbox.controller().is_playing());
    }

    #[test]
    fn test_drop_and_export_events() {
        let mut original = sandbox(0.3);
        original.load(DRIFT).unwrap();
        original.seek_to(5.0).unwrap();
        let EventOutcome::Exported(png) = original.handle(UiEvent::Export, &mut AlwaysAccept).unwrap() else {
            panic!("expected an export");
        };

        let mut other = sandbox(0.7);
        let outcome = other.handle(UiEvent::Drop(png), &mut AlwaysAccept).unwrap();
        assert_eq!(outcome, EventOutcome::Imported { time: 5.0 });
    }

    #[test]
    fn test_runtime_error_pauses() {
        let mut sandbox = sandbox(0.3);
        sandbox
            .load(r#"fn update(dt) { this.n = (this.n ?? 0) + 1; if this.n > 2 { throw "done"; } }"#)
            .unwrap();
        let mut display = LatestFrame::new();
        sandbox.animation_frame(&mut display).unwrap();
        sandbox.animation_frame(&mut display).unwrap();
        let err = sandbox.animation_frame(&mut display).unwrap_err();
        assert!(matches!(err, SandboxError::Engine(EngineError::Program(_))));
        assert_eq!(sandbox.controller().state(), PlaybackState::Paused);
    }

    #[test]
    fn test_load_error_reported() {
        let mut sandbox = sandbox(0.3);
        let err = sandbox.load("fn draw( {").unwrap_err();
        assert!(matches!(err, SandboxError::Engine(EngineError::Load(_))));
        assert!(!sandbox.controller().is_playing());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SandboxConfig {
            step: 0.0,
            ..config()
        };
        assert!(matches!(
            Sandbox::scripted(config),
            Err(SandboxError::Config(ConfigError::InvalidTimeStep))
        ));
    }
}
