//! Rhai programs drawing into the software canvas.
//!
//! Programs define any of:
//! - `fn init()` - called once after the script body has run
//! - `fn update(dt)` - called every step with the fixed time delta
//! - `fn draw(surface)` - called every step after `update`
//!
//! Rhai functions cannot see top-level `let` variables, so program state
//! lives on `this`, an object map bound for every hook call:
//!
//! ```text
//! fn init() { this.x = -4.0; }
//! fn update(dt) { this.x += 0.05 * dt; }
//! fn draw(surface) {
//!     surface.clear(0.1, 0.1, 0.1);
//!     surface.color(1.0, 0.4, 0.0);
//!     surface.circle(this.x, 0.0, 0.5);
//! }
//! ```
//!
//! Available API:
//! - `rand()` - uniform in [0, 1) from the run's seeded stream
//! - `rand(lo, hi)` - uniform in [lo, hi)
//! - `rand_int(lo, hi)` - integer in [lo, hi]
//! - `surface.clear()`, `surface.clear(r, g, b)`
//! - `surface.color(r, g, b)` - channels in 0.0-1.0
//! - `surface.rect(x, y, w, h)` - centred at (x, y)
//! - `surface.circle(x, y, r)`, `surface.line(x0, y0, x1, y1)`
//! - `surface.view_size` - world units from the centre to each edge
//! - `print(..)` / `debug(..)` - forwarded to the log

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rand::Rng;
use rand::rngs::StdRng;
use rhai::{AST, CallFnOptions, Dynamic, Engine, EvalAltResult, FLOAT, INT, Scope};

use super::{Evaluator, Hook, LoadError, Program, ProgramError};
use crate::schema::ScriptLimits;
use crate::surface::{Canvas, Rgba, Shape, WHITE, channel_to_u8};

/// Language tag recorded in exports.
pub const LANGUAGE: &str = "text/x-rhai";

/// Evaluates Rhai source into programs drawing on a [`Canvas`].
#[derive(Debug, Clone)]
pub struct ScriptEvaluator {
    limits: ScriptLimits,
    view_size: f32,
}

impl ScriptEvaluator {
    pub fn new(limits: ScriptLimits, view_size: f32) -> Self {
        Self { limits, view_size }
    }
}

impl Default for ScriptEvaluator {
    fn default() -> Self {
        Self::new(ScriptLimits::default(), 5.0)
    }
}

impl Evaluator<Canvas> for ScriptEvaluator {
    fn language(&self) -> &str {
        LANGUAGE
    }

    fn evaluate(&self, source: &str, rng: StdRng) -> Result<Box<dyn Program<Canvas>>, LoadError> {
        let mut engine = Engine::new();

        engine.set_max_expr_depths(self.limits.max_expr_depth, self.limits.max_expr_depth);
        engine.set_max_call_levels(self.limits.max_call_levels);
        engine.set_max_operations(self.limits.max_operations);

        engine.on_print(|text| log::info!(target: "reelbox::program", "{text}"));
        engine.on_debug(|text, _source, pos| {
            log::debug!(target: "reelbox::program", "{pos:?} {text}");
        });

        register_random(&mut engine, Rc::new(RefCell::new(rng)));
        register_surface(&mut engine);

        let ast = engine
            .compile(source)
            .map_err(|e| LoadError::Compile(e.to_string()))?;

        // Run the top level once to set up constants and globals
        let mut scope = Scope::new();
        engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| LoadError::Evaluate(e.to_string()))?;

        let hooks = HookArity::scan(&ast);
        log::debug!(
            "Script evaluated (init: {}, update: {}, draw: {})",
            hooks.init.is_some(),
            hooks.update.is_some(),
            hooks.draw.is_some()
        );

        Ok(Box::new(ScriptProgram {
            engine,
            ast,
            scope,
            state: Dynamic::from_map(rhai::Map::new()),
            pen: Pen::new(self.view_size),
            hooks,
        }))
    }
}

/// Parameter counts of the hooks a script defines.
#[derive(Debug, Default, Clone, Copy)]
struct HookArity {
    init: Option<usize>,
    update: Option<usize>,
    draw: Option<usize>,
}

impl HookArity {
    fn scan(ast: &AST) -> Self {
        let mut hooks = Self::default();
        for f in ast.iter_functions() {
            let arity = f.params.len();
            match f.name {
                "init" if arity == 0 => hooks.init = Some(arity),
                "update" if arity <= 1 => hooks.update = Some(arity),
                "draw" if arity <= 1 => hooks.draw = Some(arity),
                _ => {}
            }
        }
        hooks
    }
}

/// A live Rhai execution context.
struct ScriptProgram {
    engine: Engine,
    ast: AST,
    scope: Scope<'static>,
    /// Object map bound as `this` in every hook.
    state: Dynamic,
    pen: Pen,
    hooks: HookArity,
}

impl ScriptProgram {
    fn call(&mut self, hook: Hook, args: Vec<Dynamic>) -> Result<(), ProgramError> {
        let options = CallFnOptions::new()
            .eval_ast(false)
            .rewind_scope(true)
            .bind_this_ptr(&mut self.state);

        self.engine
            .call_fn_with_options::<Dynamic>(options, &mut self.scope, &self.ast, hook.name(), args)
            .map(|_| ())
            .map_err(|e| ProgramError::new(hook, e.to_string()))
    }
}

impl Program<Canvas> for ScriptProgram {
    fn init(&mut self) -> Result<(), ProgramError> {
        if self.hooks.init.is_none() {
            return Ok(());
        }
        self.call(Hook::Init, Vec::new())
    }

    fn update(&mut self, dt: f64) -> Result<(), ProgramError> {
        let args = match self.hooks.update {
            None => return Ok(()),
            Some(0) => Vec::new(),
            Some(_) => vec![Dynamic::from_float(dt as FLOAT)],
        };
        self.call(Hook::Update, args)
    }

    fn draw(&mut self, surface: &mut Canvas) -> Result<(), ProgramError> {
        let args = match self.hooks.draw {
            None => return Ok(()),
            Some(0) => Vec::new(),
            Some(_) => vec![Dynamic::from(self.pen.clone())],
        };

        self.pen.reset();
        let result = self.call(Hook::Draw, args);
        let shapes = self.pen.take();
        result?;

        for shape in &shapes {
            surface.paint(shape);
        }
        Ok(())
    }
}

/// Handle passed to `draw(surface)`; records shapes for the canvas.
#[derive(Debug, Clone)]
struct Pen {
    shapes: Rc<RefCell<Vec<Shape>>>,
    colour: Rc<Cell<Rgba>>,
    view_size: f32,
}

impl Pen {
    fn new(view_size: f32) -> Self {
        Self {
            shapes: Rc::new(RefCell::new(Vec::new())),
            colour: Rc::new(Cell::new(WHITE)),
            view_size,
        }
    }

    fn reset(&self) {
        self.shapes.borrow_mut().clear();
        self.colour.set(WHITE);
    }

    fn take(&self) -> Vec<Shape> {
        std::mem::take(&mut *self.shapes.borrow_mut())
    }

    fn push(&self, shape: Shape) {
        self.shapes.borrow_mut().push(shape);
    }
}

/// Accept both `1` and `1.0` where a number is expected.
fn number(value: &Dynamic) -> Result<f64, Box<EvalAltResult>> {
    if let Ok(f) = value.as_float() {
        return Ok(f as f64);
    }
    if let Ok(i) = value.as_int() {
        return Ok(i as f64);
    }
    Err(format!("Expected a number, got {}", value.type_name()).into())
}

fn rgb(r: &Dynamic, g: &Dynamic, b: &Dynamic) -> Result<Rgba, Box<EvalAltResult>> {
    Ok([
        channel_to_u8(number(r)?),
        channel_to_u8(number(g)?),
        channel_to_u8(number(b)?),
        255,
    ])
}

fn register_random(engine: &mut Engine, rng: Rc<RefCell<StdRng>>) {
    let r = Rc::clone(&rng);
    engine.register_fn("rand", move || -> FLOAT { r.borrow_mut().r#gen::<f64>() as FLOAT });

    let r = Rc::clone(&rng);
    engine.register_fn(
        "rand",
        move |lo: Dynamic, hi: Dynamic| -> Result<FLOAT, Box<EvalAltResult>> {
            let (lo, hi) = (number(&lo)?, number(&hi)?);
            let u = r.borrow_mut().r#gen::<f64>();
            Ok((lo + (hi - lo) * u) as FLOAT)
        },
    );

    let r = rng;
    engine.register_fn("rand_int", move |lo: INT, hi: INT| -> INT {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        r.borrow_mut().gen_range(lo..=hi)
    });
}

fn register_surface(engine: &mut Engine) {
    engine.register_type_with_name::<Pen>("Surface");

    engine.register_get("view_size", |pen: &mut Pen| pen.view_size as FLOAT);

    engine.register_fn("clear", |pen: &mut Pen| {
        pen.push(Shape::Clear { colour: [0; 4] });
    });

    engine.register_fn(
        "clear",
        |pen: &mut Pen, r: Dynamic, g: Dynamic, b: Dynamic| -> Result<(), Box<EvalAltResult>> {
            pen.push(Shape::Clear {
                colour: rgb(&r, &g, &b)?,
            });
            Ok(())
        },
    );

    engine.register_fn(
        "color",
        |pen: &mut Pen, r: Dynamic, g: Dynamic, b: Dynamic| -> Result<(), Box<EvalAltResult>> {
            pen.colour.set(rgb(&r, &g, &b)?);
            Ok(())
        },
    );

    engine.register_fn(
        "rect",
        |pen: &mut Pen,
         x: Dynamic,
         y: Dynamic,
         w: Dynamic,
         h: Dynamic|
         -> Result<(), Box<EvalAltResult>> {
            pen.push(Shape::Rect {
                x: number(&x)? as f32,
                y: number(&y)? as f32,
                w: number(&w)? as f32,
                h: number(&h)? as f32,
                colour: pen.colour.get(),
            });
            Ok(())
        },
    );

    engine.register_fn(
        "circle",
        |pen: &mut Pen, x: Dynamic, y: Dynamic, r: Dynamic| -> Result<(), Box<EvalAltResult>> {
            pen.push(Shape::Circle {
                x: number(&x)? as f32,
                y: number(&y)? as f32,
                r: number(&r)? as f32,
                colour: pen.colour.get(),
            });
            Ok(())
        },
    );

    engine.register_fn(
        "line",
        |pen: &mut Pen,
         x0: Dynamic,
         y0: Dynamic,
         x1: Dynamic,
         y1: Dynamic|
         -> Result<(), Box<EvalAltResult>> {
            pen.push(Shape::Line {
                x0: number(&x0)? as f32,
                y0: number(&y0)? as f32,
                x1: number(&x1)? as f32,
                y1: number(&y1)? as f32,
                colour: pen.colour.get(),
            });
            Ok(())
        },
    );
}
