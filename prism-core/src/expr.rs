//! The expression tree and its evaluation semantics.
//!
//! An [`Expr`] is the parsed, evaluable form of one Prism expression: a
//! strict tree (exclusive ownership, no sharing) over a closed set of
//! variants, evaluated with an exhaustive match so adding a variant is a
//! compile-time checklist. Every node maps a domain coordinate pair to a
//! [`Color`]; arithmetic is channel-wise `f64`, and degenerate operations
//! (division by zero, out-of-domain math) propagate as non-finite channel
//! values rather than errors.
//!
//! Evaluation is pure given a [`RenderContext`]: the context carries the
//! borrowed variable environment, the frame time (held fixed for the
//! duration of one frame), and the deviate state behind `random()`. The
//! driver makes a fresh context per frame, so no global state leaks from
//! one render sequence into the next.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use prism_graphics::color::{Color, Scalar};
use prism_graphics::noise::noise3;
use prism_graphics::raster::Raster;

use crate::variables::{Environment, ExprId};

/// Time advance between consecutive animation frames.
pub const TIME_STEP: Scalar = 0.04;

// ---------------------------------------------------------------------------
// Render context
// ---------------------------------------------------------------------------

/// Fallback xorshift state; the algorithm requires a non-zero seed.
const DEFAULT_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Per-frame evaluation state.
///
/// Borrows the environment immutably for its whole lifetime, so a
/// concurrent rebinding during a render pass cannot compile. The deviate
/// state is atomic; sharing one context across worker threads needs no
/// locking.
pub struct RenderContext<'a> {
    env: &'a Environment,
    time: Scalar,
    seed: AtomicU64,
}

impl<'a> RenderContext<'a> {
    /// Create a context at time zero with the default deviate seed.
    #[must_use]
    pub const fn new(env: &'a Environment) -> Self {
        Self {
            env,
            time: 0.0,
            seed: AtomicU64::new(DEFAULT_SEED),
        }
    }

    /// Set the frame time.
    #[must_use]
    pub const fn with_time(mut self, time: Scalar) -> Self {
        self.time = time;
        self
    }

    /// Seed the `random()` deviate for deterministic output.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = AtomicU64::new(if seed == 0 { DEFAULT_SEED } else { seed });
        self
    }

    /// The frame time read by the `t` leaf.
    #[must_use]
    pub const fn time(&self) -> Scalar {
        self.time
    }

    /// The variable environment read by reference nodes.
    #[must_use]
    pub const fn environment(&self) -> &'a Environment {
        self.env
    }

    /// Draw one uniform deviate in [-1, 1] from the xorshift state.
    fn uniform_deviate(&self) -> Scalar {
        let prev = self
            .seed
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
                Some(xorshift(s))
            })
            .unwrap_or(DEFAULT_SEED);
        #[allow(clippy::cast_precision_loss)]
        let frac = xorshift(prev) as Scalar / u64::MAX as Scalar;
        frac.mul_add(2.0, -1.0)
    }
}

const fn xorshift(mut s: u64) -> u64 {
    s ^= s << 13;
    s ^= s >> 7;
    s ^= s << 17;
    s
}

// ---------------------------------------------------------------------------
// Expression tree
// ---------------------------------------------------------------------------

/// The operand bundle of an image-sampling function.
///
/// The raster is resolved from the host's image source while the tree is
/// built, so evaluation never touches the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFn {
    /// The filename as written in the expression.
    pub filename: String,
    /// The decoded raster for that filename.
    pub raster: Arc<Raster>,
    /// Subtree producing the x sample coordinate.
    pub x: Box<Expr>,
    /// Subtree producing the y sample coordinate.
    pub y: Box<Expr>,
}

/// A node of the expression tree.
///
/// Structural equality is derived: two trees are equal iff they have the
/// same shape and their constants agree within the color tolerance.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // -- Leaves --
    /// A constant color. A numeric literal `n` denotes the gray
    /// `Color::splat(n)`.
    Constant(Color),
    /// The domain x coordinate.
    X,
    /// The domain y coordinate.
    Y,
    /// The animation time.
    Time,
    /// A reference to a bound variable, resolved at every evaluation.
    Variable(String),
    /// A freshly sampled random color on every evaluation.
    Random,

    // -- Unary functions --
    Sin(Box<Expr>),
    Cos(Box<Expr>),
    Floor(Box<Expr>),
    Ceil(Box<Expr>),
    Abs(Box<Expr>),
    Exp(Box<Expr>),
    /// Channel-wise negation; built from `!` and from a prefix `-`.
    Negate(Box<Expr>),
    /// Limit each channel to [-1, 1].
    Clamp(Box<Expr>),
    RgbToYCrCb(Box<Expr>),
    YCrCbToRgb(Box<Expr>),

    // -- Binary operators --
    Plus(Box<Expr>, Box<Expr>),
    Minus(Box<Expr>, Box<Expr>),
    Times(Box<Expr>, Box<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    Modulo(Box<Expr>, Box<Expr>),
    Power(Box<Expr>, Box<Expr>),

    // -- Multi-argument functions --
    PerlinColor(Box<Expr>, Box<Expr>),
    PerlinBw(Box<Expr>, Box<Expr>),
    ImageClip(ImageFn),
    ImageWrap(ImageFn),
}

impl Expr {
    /// Evaluate the tree at a domain coordinate pair.
    ///
    /// Total: never fails, never suspends. Degenerate arithmetic yields
    /// non-finite channels, and a reference whose name has no current
    /// binding yields a NaN color.
    #[must_use]
    pub fn evaluate(&self, x: Scalar, y: Scalar, ctx: &RenderContext<'_>) -> Color {
        match self {
            Self::Constant(c) => *c,
            Self::X => Color::splat(x),
            Self::Y => Color::splat(y),
            Self::Time => Color::splat(ctx.time()),
            Self::Variable(name) => ctx
                .environment()
                .binding(name)
                .map_or(Color::splat(Scalar::NAN), |e| e.evaluate(x, y, ctx)),
            Self::Random => Color::new(
                ctx.uniform_deviate(),
                ctx.uniform_deviate(),
                ctx.uniform_deviate(),
            ),

            Self::Sin(e) => e.evaluate(x, y, ctx).map(Scalar::sin),
            Self::Cos(e) => e.evaluate(x, y, ctx).map(Scalar::cos),
            Self::Floor(e) => e.evaluate(x, y, ctx).map(Scalar::floor),
            Self::Ceil(e) => e.evaluate(x, y, ctx).map(Scalar::ceil),
            Self::Abs(e) => e.evaluate(x, y, ctx).map(Scalar::abs),
            Self::Exp(e) => e.evaluate(x, y, ctx).map(Scalar::exp),
            Self::Negate(e) => e.evaluate(x, y, ctx).map(|v| -v),
            Self::Clamp(e) => e.evaluate(x, y, ctx).clamp_unit(),
            Self::RgbToYCrCb(e) => e.evaluate(x, y, ctx).rgb_to_ycrcb(),
            Self::YCrCbToRgb(e) => e.evaluate(x, y, ctx).ycrcb_to_rgb(),

            Self::Plus(a, b) => a.evaluate(x, y, ctx).zip(b.evaluate(x, y, ctx), |p, q| p + q),
            Self::Minus(a, b) => a.evaluate(x, y, ctx).zip(b.evaluate(x, y, ctx), |p, q| p - q),
            Self::Times(a, b) => a.evaluate(x, y, ctx).zip(b.evaluate(x, y, ctx), |p, q| p * q),
            Self::Divide(a, b) => a.evaluate(x, y, ctx).zip(b.evaluate(x, y, ctx), |p, q| p / q),
            Self::Modulo(a, b) => a.evaluate(x, y, ctx).zip(b.evaluate(x, y, ctx), |p, q| p % q),
            Self::Power(a, b) => a.evaluate(x, y, ctx).zip(b.evaluate(x, y, ctx), Scalar::powf),

            Self::PerlinColor(a, b) => {
                perlin_color(a.evaluate(x, y, ctx), b.evaluate(x, y, ctx))
            }
            Self::PerlinBw(a, b) => perlin_bw(a.evaluate(x, y, ctx), b.evaluate(x, y, ctx)),
            Self::ImageClip(img) => {
                let (u, v) = img.coordinates(x, y, ctx);
                img.raster.sample_clip(u, v)
            }
            Self::ImageWrap(img) => {
                let (u, v) = img.coordinates(x, y, ctx);
                img.raster.sample_wrap(u, v)
            }
        }
    }

    /// Whether evaluating this tree can read the frame time.
    ///
    /// A static analysis over the built tree: it follows current variable
    /// bindings through the environment and tolerates binding cycles.
    /// The driver uses it to decide between one frame and a sequence.
    #[must_use]
    pub fn uses_time(&self, env: &Environment) -> bool {
        self.uses_time_inner(env, &mut HashSet::new())
    }

    fn uses_time_inner(&self, env: &Environment, visited: &mut HashSet<ExprId>) -> bool {
        match self {
            Self::Time => true,
            Self::Constant(_) | Self::X | Self::Y | Self::Random => false,
            Self::Variable(name) => match env.lookup(name) {
                // `insert` is false when the binding was already visited,
                // which breaks cycles like `a = a`.
                Some(id) => {
                    visited.insert(id)
                        && env
                            .get(id)
                            .is_some_and(|e| e.uses_time_inner(env, visited))
                }
                None => false,
            },
            Self::Sin(e)
            | Self::Cos(e)
            | Self::Floor(e)
            | Self::Ceil(e)
            | Self::Abs(e)
            | Self::Exp(e)
            | Self::Negate(e)
            | Self::Clamp(e)
            | Self::RgbToYCrCb(e)
            | Self::YCrCbToRgb(e) => e.uses_time_inner(env, visited),
            Self::Plus(a, b)
            | Self::Minus(a, b)
            | Self::Times(a, b)
            | Self::Divide(a, b)
            | Self::Modulo(a, b)
            | Self::Power(a, b)
            | Self::PerlinColor(a, b)
            | Self::PerlinBw(a, b) => {
                a.uses_time_inner(env, visited) || b.uses_time_inner(env, visited)
            }
            Self::ImageClip(img) | Self::ImageWrap(img) => {
                img.x.uses_time_inner(env, visited) || img.y.uses_time_inner(env, visited)
            }
        }
    }
}

impl ImageFn {
    /// Evaluate the coordinate subtrees; the scalar value of a subtree is
    /// its red channel.
    fn coordinates(&self, x: Scalar, y: Scalar, ctx: &RenderContext<'_>) -> (Scalar, Scalar) {
        (self.x.evaluate(x, y, ctx).r, self.y.evaluate(x, y, ctx).r)
    }
}

fn perlin_color(l: Color, r: Color) -> Color {
    let (px, py, pz) = (l.r + r.r, l.g + r.g, l.b + r.b);
    // Rotate the coordinate triple so the three channels decorrelate
    Color::new(noise3(px, py, pz), noise3(py, pz, px), noise3(pz, px, py))
}

fn perlin_bw(l: Color, r: Color) -> Color {
    Color::splat(noise3(l.r + r.r, l.g + r.g, l.b + r.b))
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for Expr {
    /// Surface syntax, fully parenthesized around binary operators.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => {
                if (c.r - c.g).abs() < Scalar::EPSILON && (c.g - c.b).abs() < Scalar::EPSILON {
                    write!(f, "{}", c.r)
                } else {
                    write!(f, "[{}, {}, {}]", c.r, c.g, c.b)
                }
            }
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
            Self::Time => write!(f, "t"),
            Self::Variable(name) => write!(f, "{name}"),
            Self::Random => write!(f, "random()"),

            Self::Sin(e) => write!(f, "sin({e})"),
            Self::Cos(e) => write!(f, "cos({e})"),
            Self::Floor(e) => write!(f, "floor({e})"),
            Self::Ceil(e) => write!(f, "ceil({e})"),
            Self::Abs(e) => write!(f, "abs({e})"),
            Self::Exp(e) => write!(f, "exp({e})"),
            Self::Negate(e) => write!(f, "!{e}"),
            Self::Clamp(e) => write!(f, "clamp({e})"),
            Self::RgbToYCrCb(e) => write!(f, "rgbToYCrCb({e})"),
            Self::YCrCbToRgb(e) => write!(f, "yCrCbToRGB({e})"),

            Self::Plus(a, b) => write!(f, "({a} + {b})"),
            Self::Minus(a, b) => write!(f, "({a} - {b})"),
            Self::Times(a, b) => write!(f, "({a} * {b})"),
            Self::Divide(a, b) => write!(f, "({a} / {b})"),
            Self::Modulo(a, b) => write!(f, "({a} % {b})"),
            Self::Power(a, b) => write!(f, "({a} ^ {b})"),

            Self::PerlinColor(a, b) => write!(f, "perlinColor({a}, {b})"),
            Self::PerlinBw(a, b) => write!(f, "perlinBW({a}, {b})"),
            Self::ImageClip(img) => {
                write!(f, "imageClip(\"{}\", {}, {})", img.filename, img.x, img.y)
            }
            Self::ImageWrap(img) => {
                write!(f, "imageWrap(\"{}\", {}, {})", img.filename, img.x, img.y)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
