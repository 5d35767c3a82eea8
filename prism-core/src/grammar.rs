//! The analyzer registry: one rule per built-in function keyword.
//!
//! A [`Grammar`] maps each function keyword to the [`FunctionRule`] that
//! builds its subtree. The scanner classifies identifiers against the same
//! map, and [`Grammar::function_names`] enumerates it for tooling, so the
//! keyword set, the dispatch table, and the enumeration can never drift
//! apart. Adding a built-in means adding an [`Expr`] variant and
//! registering one rule; no existing rule changes.
//!
//! A grammar is an explicit value, constructed once and passed to the
//! parser. Tests can build independent grammars without leaking state
//! into each other.

use std::collections::HashMap;

use crate::error::ParseResult;
use crate::expr::Expr;
use crate::parser::TreeBuilder;

/// The per-construct analyzer: consumes exactly the tokens of its own
/// production from the builder and returns the finished subtree.
pub type BuildFn = fn(&FunctionRule, &mut TreeBuilder<'_>) -> ParseResult<Expr>;

/// One registered built-in function.
pub struct FunctionRule {
    /// The keyword as written in expressions.
    pub name: &'static str,
    /// Declared argument count, for tooling and diagnostics.
    pub arity: usize,
    /// The analyzer for this construct.
    pub build: BuildFn,
}

impl FunctionRule {
    /// Create a new rule.
    #[must_use]
    pub const fn new(name: &'static str, arity: usize, build: BuildFn) -> Self {
        Self { name, arity, build }
    }
}

/// The registry of built-in functions.
pub struct Grammar {
    rules: HashMap<&'static str, FunctionRule>,
}

impl Grammar {
    /// Create a grammar with no registered functions.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// The standard grammar with every built-in registered.
    #[must_use]
    pub fn standard() -> Self {
        let mut grammar = Self::empty();
        for rule in [
            FunctionRule::new("sin", 1, build_sin),
            FunctionRule::new("cos", 1, build_cos),
            FunctionRule::new("floor", 1, build_floor),
            FunctionRule::new("ceil", 1, build_ceil),
            FunctionRule::new("abs", 1, build_abs),
            FunctionRule::new("exp", 1, build_exp),
            FunctionRule::new("clamp", 1, build_clamp),
            FunctionRule::new("rgbToYCrCb", 1, build_rgb_to_ycrcb),
            FunctionRule::new("yCrCbToRGB", 1, build_ycrcb_to_rgb),
            FunctionRule::new("random", 0, build_random),
            FunctionRule::new("perlinColor", 2, build_perlin_color),
            FunctionRule::new("perlinBW", 2, build_perlin_bw),
            FunctionRule::new("imageClip", 3, build_image_clip),
            FunctionRule::new("imageWrap", 3, build_image_wrap),
        ] {
            grammar.register(rule);
        }
        grammar
    }

    /// Register a rule, replacing any previous rule with the same name.
    pub fn register(&mut self, rule: FunctionRule) {
        self.rules.insert(rule.name, rule);
    }

    /// Whether a name is a registered function keyword.
    #[must_use]
    pub fn is_function(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// The rule registered under a keyword.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&FunctionRule> {
        self.rules.get(name)
    }

    /// Every registered function name, sorted.
    #[must_use]
    pub fn function_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.rules.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Built-in analyzers
// ---------------------------------------------------------------------------

fn build_sin(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    Ok(Expr::Sin(Box::new(b.operand(rule.name, "argument")?)))
}

fn build_cos(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    Ok(Expr::Cos(Box::new(b.operand(rule.name, "argument")?)))
}

fn build_floor(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    Ok(Expr::Floor(Box::new(b.operand(rule.name, "argument")?)))
}

fn build_ceil(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    Ok(Expr::Ceil(Box::new(b.operand(rule.name, "argument")?)))
}

fn build_abs(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    Ok(Expr::Abs(Box::new(b.operand(rule.name, "argument")?)))
}

fn build_exp(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    Ok(Expr::Exp(Box::new(b.operand(rule.name, "argument")?)))
}

fn build_clamp(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    Ok(Expr::Clamp(Box::new(b.operand(rule.name, "argument")?)))
}

fn build_rgb_to_ycrcb(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    Ok(Expr::RgbToYCrCb(Box::new(b.operand(rule.name, "argument")?)))
}

fn build_ycrcb_to_rgb(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    Ok(Expr::YCrCbToRgb(Box::new(b.operand(rule.name, "argument")?)))
}

fn build_random(_rule: &FunctionRule, _b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    Ok(Expr::Random)
}

/// Arguments bind left-to-right as written; the builder consumes the
/// rightmost operand first, so the second argument is popped before the
/// first.
fn build_perlin_color(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    let second = b.operand(rule.name, "second argument")?;
    let first = b.operand(rule.name, "first argument")?;
    Ok(Expr::PerlinColor(Box::new(first), Box::new(second)))
}

fn build_perlin_bw(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    let second = b.operand(rule.name, "second argument")?;
    let first = b.operand(rule.name, "first argument")?;
    Ok(Expr::PerlinBw(Box::new(first), Box::new(second)))
}

fn build_image_clip(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    Ok(Expr::ImageClip(b.image_call(rule)?))
}

fn build_image_wrap(rule: &FunctionRule, b: &mut TreeBuilder<'_>) -> ParseResult<Expr> {
    Ok(Expr::ImageWrap(b.image_call(rule)?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
