//! Program host: owns the source, the seed and the live execution context.

use super::{Evaluator, LoadError, Program, ProgramError};
use crate::schema::Seed;

/// Wraps user source into fresh execution contexts.
///
/// At most one context is live at a time; building a new one discards the
/// previous context together with all of its state.
pub struct ProgramHost<S: ?Sized> {
    evaluator: Box<dyn Evaluator<S>>,
    source: Option<String>,
    seed: Seed,
    context: Option<Box<dyn Program<S>>>,
    /// Number of contexts built so far.
    generation: u64,
}

impl<S: ?Sized> ProgramHost<S> {
    /// Create a host with nothing loaded.
    pub fn new(evaluator: Box<dyn Evaluator<S>>, seed: Seed) -> Self {
        Self {
            evaluator,
            source: None,
            seed,
            context: None,
            generation: 0,
        }
    }

    /// Store source text without running it. Drops the current context.
    pub fn load(&mut self, source: impl Into<String>) {
        self.source = Some(source.into());
        self.context = None;
    }

    /// Replace the seed used by contexts built from now on.
    pub fn set_seed(&mut self, seed: Seed) {
        self.seed = seed;
    }

    /// Build a fresh context: seed, evaluate, then run `init` if present.
    pub fn init_context(&mut self) -> Result<(), LoadError> {
        // The old context goes first, even if the new one fails to build
        self.context = None;
        let source = self.source.as_deref().ok_or(LoadError::NoProgram)?;

        let mut program = self.evaluator.evaluate(source, self.seed.rng())?;
        program.init()?;

        self.generation += 1;
        self.context = Some(program);
        Ok(())
    }

    /// Run `update(dt)` on the live context, if any.
    pub fn update(&mut self, dt: f64) -> Result<(), ProgramError> {
        match self.context.as_mut() {
            Some(program) => program.update(dt),
            None => Ok(()),
        }
    }

    /// Run `draw(surface)` on the live context, if any.
    pub fn draw(&mut self, surface: &mut S) -> Result<(), ProgramError> {
        match self.context.as_mut() {
            Some(program) => program.draw(surface),
            None => Ok(()),
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    /// Whether a context is currently live.
    pub fn is_running(&self) -> bool {
        self.context.is_some()
    }

    pub fn language(&self) -> &str {
        self.evaluator.language()
    }

    /// Number of contexts built over the host's lifetime.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::rngs::StdRng;

    /// Program whose draw writes the last random draw into the surface.
    struct Dice {
        rng: StdRng,
        last: u32,
    }

    impl Program<Vec<u32>> for Dice {
        fn update(&mut self, _dt: f64) -> Result<(), ProgramError> {
            self.last = self.rng.r#gen();
            Ok(())
        }

        fn draw(&mut self, surface: &mut Vec<u32>) -> Result<(), ProgramError> {
            surface.push(self.last);
            Ok(())
        }
    }

    struct DiceEvaluator;

    impl Evaluator<Vec<u32>> for DiceEvaluator {
        fn language(&self) -> &str {
            "text/x-dice"
        }

        fn evaluate(
            &self,
            source: &str,
            rng: StdRng,
        ) -> Result<Box<dyn Program<Vec<u32>>>, LoadError> {
            if source.contains("syntax error") {
                return Err(LoadError::Compile("unexpected token".into()));
            }
            Ok(Box::new(Dice { rng, last: 0 }))
        }
    }

    fn run(host: &mut ProgramHost<Vec<u32>>, steps: usize) -> Vec<u32> {
        let mut out = Vec::new();
        for _ in 0..steps {
            host.update(1.0).unwrap();
            host.draw(&mut out).unwrap();
        }
        out
    }

    #[test]
    fn test_load_does_not_evaluate() {
        let mut host = ProgramHost::new(Box::new(DiceEvaluator), Seed::default());
        host.load("roll");
        assert!(host.is_loaded());
        assert!(!host.is_running());
        assert_eq!(host.generation(), 0);
    }

    #[test]
    fn test_fresh_context_replays_same_draws() {
        let mut host = ProgramHost::new(Box::new(DiceEvaluator), Seed::Number(0.5));
        host.load("roll");

        host.init_context().unwrap();
        let first = run(&mut host, 8);
        host.init_context().unwrap();
        let second = run(&mut host, 8);

        assert_eq!(first, second);
        assert_eq!(host.generation(), 2);
    }

    #[test]
    fn test_seed_changes_stream() {
        let mut host = ProgramHost::new(Box::new(DiceEvaluator), Seed::Number(0.5));
        host.load("roll");
        host.init_context().unwrap();
        let first = run(&mut host, 4);

        host.set_seed(Seed::Number(0.75));
        host.init_context().unwrap();
        assert_ne!(first, run(&mut host, 4));
    }

    #[test]
    fn test_load_error_discards_context() {
        let mut host = ProgramHost::new(Box::new(DiceEvaluator), Seed::default());
        host.load("roll");
        host.init_context().unwrap();
        assert!(host.is_running());

        host.load("syntax error");
        assert!(matches!(host.init_context(), Err(LoadError::Compile(_))));
        assert!(!host.is_running());
    }

    #[test]
    fn test_no_program() {
        let mut host: ProgramHost<Vec<u32>> =
            ProgramHost::new(Box::new(DiceEvaluator), Seed::default());
        assert!(matches!(host.init_context(), Err(LoadError::NoProgram)));
        // Hooks without a context are no-ops
        assert!(run(&mut host, 2).is_empty());
    }
}
