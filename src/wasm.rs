//! WebAssembly bindings for the sandbox.
//!
//! The page owns the `<canvas>` and the UI; it forwards events here, calls
//! [`WasmSandbox::animation_frame`] from `requestAnimationFrame`, and blits
//! [`WasmSandbox::frame_pixels`] with `putImageData`.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::{
    Confirm, EventOutcome, KeyCode, Presented, Sandbox, SandboxConfig, UiEvent,
    engine::PlaybackState,
    surface::{Canvas, LatestFrame},
};

/// Initialize WASM module with panic hook and logging.
#[wasm_bindgen(start)]
pub fn init() {
    // Set panic hook for better error messages in browser
    console_error_panic_hook::set_once();

    // Initialize WASM logger
    wasm_logger::init(wasm_logger::Config::default());
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Confirmation backed by a JS function `(prompt: string) => boolean`.
struct JsConfirm<'a>(&'a js_sys::Function);

impl Confirm for JsConfirm<'_> {
    fn confirm(&mut self, prompt: &str) -> bool {
        self.0
            .call1(&JsValue::NULL, &JsValue::from_str(prompt))
            .map(|answer| answer.is_truthy())
            .unwrap_or(false)
    }
}

/// Snapshot of the sandbox for the page's controls.
#[derive(Serialize)]
struct SandboxStatus {
    time: f64,
    position: f64,
    max_time: f64,
    playing: bool,
    scrubbing: bool,
    seed: String,
    checkpoints: usize,
    checkpoint_bytes: usize,
}

/// WebAssembly wrapper around a scripted [`Sandbox`].
#[wasm_bindgen]
pub struct WasmSandbox {
    sandbox: Sandbox<Canvas>,
    display: LatestFrame,
}

#[wasm_bindgen]
impl WasmSandbox {
    /// Create a sandbox from JSON configuration (empty string for defaults).
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmSandbox, JsValue> {
        let config: SandboxConfig = if config_json.trim().is_empty() {
            SandboxConfig::default()
        } else {
            serde_json::from_str(config_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid config JSON: {e}")))?
        };
        let sandbox = Sandbox::scripted(config).map_err(js_error)?;
        Ok(WasmSandbox {
            sandbox,
            display: LatestFrame::new(),
        })
    }

    /// Load program source and start playing.
    #[wasm_bindgen]
    pub fn load(&mut self, source: &str) -> Result<(), JsValue> {
        self.sandbox.load(source).map_err(js_error)
    }

    #[wasm_bindgen(js_name = playPause)]
    pub fn play_pause(&mut self) {
        self.sandbox.toggle();
    }

    /// Restart with a fresh seed; returns it as a string.
    #[wasm_bindgen]
    pub fn reseed(&mut self) -> Result<String, JsValue> {
        self.sandbox.reseed().map(|seed| seed.to_string()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = scrubStart)]
    pub fn scrub_start(&mut self) {
        self.sandbox.scrub_start();
    }

    #[wasm_bindgen(js_name = scrubMove)]
    pub fn scrub_move(&mut self, position: f64) {
        self.sandbox.scrub_move(position);
    }

    #[wasm_bindgen(js_name = scrubEnd)]
    pub fn scrub_end(&mut self) -> Result<(), JsValue> {
        self.sandbox.scrub_end().map_err(js_error)
    }

    /// Handle a `KeyboardEvent.code`. Returns whether it was used.
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, code: &str) -> Result<bool, JsValue> {
        let key = match code {
            "Space" => KeyCode::Space,
            "ArrowLeft" => KeyCode::ArrowLeft,
            "ArrowRight" => KeyCode::ArrowRight,
            _ => KeyCode::Other,
        };
        let outcome = self
            .sandbox
            .handle(UiEvent::Key(key), &mut |_: &str| false)
            .map_err(js_error)?;
        Ok(outcome != EventOutcome::Ignored)
    }

    /// Run one frame. Returns the checkpoint time when a cached frame is
    /// shown, `undefined` for the live surface.
    #[wasm_bindgen(js_name = animationFrame)]
    pub fn animation_frame(&mut self) -> Result<Option<f64>, JsValue> {
        match self.sandbox.animation_frame(&mut self.display).map_err(js_error)? {
            Presented::Live => Ok(None),
            Presented::Checkpoint { time } => Ok(Some(time)),
        }
    }

    /// RGBA pixels of the last presented frame.
    #[wasm_bindgen(js_name = framePixels)]
    pub fn frame_pixels(&self) -> Vec<u8> {
        self.display
            .frame()
            .map(|frame| frame.pixels().to_vec())
            .unwrap_or_default()
    }

    #[wasm_bindgen(js_name = frameWidth)]
    pub fn frame_width(&self) -> u32 {
        self.sandbox.config().width as u32
    }

    #[wasm_bindgen(js_name = frameHeight)]
    pub fn frame_height(&self) -> u32 {
        self.sandbox.config().height as u32
    }

    /// Export the live frame as PNG bytes with the program embedded.
    #[wasm_bindgen(js_name = exportPng)]
    pub fn export_png(&self) -> Result<Vec<u8>, JsValue> {
        self.sandbox.export_png().map_err(js_error)
    }

    /// Import a dropped PNG. `confirm` is asked about version mismatches.
    /// Returns the time the export was taken at.
    #[wasm_bindgen(js_name = importPng)]
    pub fn import_png(&mut self, bytes: &[u8], confirm: &js_sys::Function) -> Result<f64, JsValue> {
        self.sandbox
            .import_png(bytes, &mut JsConfirm(confirm))
            .map(|imported| imported.time())
            .map_err(js_error)
    }

    /// Playback status as a JS object.
    #[wasm_bindgen]
    pub fn status(&self) -> Result<JsValue, JsValue> {
        let controller = self.sandbox.controller();
        let checkpoints = self.sandbox.engine().checkpoints();
        let status = SandboxStatus {
            time: self.sandbox.time(),
            position: controller.position(),
            max_time: self.sandbox.config().max_time,
            playing: controller.state() == PlaybackState::Playing,
            scrubbing: controller.is_scrubbing(),
            seed: self.sandbox.seed().to_string(),
            checkpoints: checkpoints.len(),
            checkpoint_bytes: checkpoints.stored_bytes(),
        };
        serde_wasm_bindgen::to_value(&status)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }
}
