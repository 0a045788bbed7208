//! Small deterministic program and surface for engine tests.

use rand::Rng;
use rand::rngs::StdRng;

use crate::program::{Evaluator, Hook, LoadError, Program, ProgramError};
use crate::surface::{Frame, Surface};

/// One-row RGBA strip.
pub(crate) struct Strip {
    pixels: Vec<u8>,
}

impl Strip {
    pub(crate) fn new(width: usize) -> Self {
        Self {
            pixels: vec![0; width * 4],
        }
    }

    fn width(&self) -> usize {
        self.pixels.len() / 4
    }
}

impl Surface for Strip {
    fn clear(&mut self) {
        self.pixels.fill(0);
    }

    fn capture(&self) -> Frame {
        Frame::new(self.width() as u32, 1, self.pixels.clone()).unwrap()
    }
}

/// Walks along the strip leaving a random trail; never clears.
struct Walker {
    rng: StdRng,
    position: f64,
    noise: u8,
    fail_at: Option<f64>,
}

impl Program<Strip> for Walker {
    fn update(&mut self, dt: f64) -> Result<(), ProgramError> {
        self.position += dt;
        if self.fail_at.is_some_and(|at| self.position >= at) {
            return Err(ProgramError::new(Hook::Update, "walked off"));
        }
        self.noise = self.rng.r#gen();
        Ok(())
    }

    fn draw(&mut self, strip: &mut Strip) -> Result<(), ProgramError> {
        let i = (self.position * 4.0) as usize % strip.width() * 4;
        strip.pixels[i] = strip.pixels[i].wrapping_add(self.noise);
        strip.pixels[i + 1] = self.position as u8;
        strip.pixels[i + 3] = 255;
        Ok(())
    }
}

/// Understands `walk`, `walk until <t>`; anything else fails to compile.
pub(crate) struct WalkerEvaluator;

impl Evaluator<Strip> for WalkerEvaluator {
    fn language(&self) -> &str {
        "text/x-walker"
    }

    fn evaluate(&self, source: &str, rng: StdRng) -> Result<Box<dyn Program<Strip>>, LoadError> {
        let mut words = source.split_whitespace();
        if words.next() != Some("walk") {
            return Err(LoadError::Compile(format!("unknown program `{source}`")));
        }
        let fail_at = match (words.next(), words.next()) {
            (Some("until"), Some(t)) => Some(
                t.parse()
                    .map_err(|_| LoadError::Compile(format!("bad time `{t}`")))?,
            ),
            _ => None,
        };
        Ok(Box::new(Walker {
            rng,
            position: 0.0,
            noise: 0,
            fail_at,
        }))
    }
}
