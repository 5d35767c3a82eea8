//! The Prism parser: tokens in, expression tree out.
//!
//! [`Parser::parse`] runs the whole front end for one expression string:
//!
//! 1. scan the source into tokens;
//! 2. recognize a leading `identifier =` as an assignment;
//! 3. convert the infix remainder to postfix order (precedence
//!    `^` > `!` > `* / %` > `+ -`, with `^` and `!` right-associative and
//!    a prefix `-` rewritten to `!`);
//! 4. build the tree by token-consuming recursion over the postfix
//!    sequence: the builder removes the next token, dispatches to the
//!    analyzer responsible for it, and each analyzer re-enters the builder
//!    for exactly its own operands;
//! 5. reject leftover tokens, then — only on full success — commit the
//!    assignment binding to the environment.
//!
//! The contract every analyzer upholds: consume exactly the tokens of your
//! own production and leave the remainder for the caller.

use std::sync::Arc;

use prism_graphics::color::Color;
use prism_graphics::raster::Raster;

use crate::error::{Error, ParseError, ParseErrorKind, ParseResult, ResourceError};
use crate::expr::{Expr, ImageFn};
use crate::grammar::{FunctionRule, Grammar};
use crate::images::{ImageSource, NullImageSource};
use crate::scanner::Scanner;
use crate::token::{OpKind, Token, TokenKind};
use crate::variables::Environment;

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// The parse entry point, owning the grammar, the variable environment,
/// and the image-source collaborator.
///
/// Invoked once per expression (or per frame), never once per pixel; the
/// returned tree is what the rendering driver evaluates.
pub struct Parser {
    grammar: Grammar,
    env: Environment,
    images: Box<dyn ImageSource>,
}

impl Parser {
    /// Create a parser with the standard grammar and no image source.
    #[must_use]
    pub fn new() -> Self {
        Self::with_grammar(Grammar::standard())
    }

    /// Create a parser with a custom grammar.
    #[must_use]
    pub fn with_grammar(grammar: Grammar) -> Self {
        Self {
            grammar,
            env: Environment::new(),
            images: Box::new(NullImageSource),
        }
    }

    /// Install the image-source collaborator used by `imageClip`/`imageWrap`.
    pub fn set_image_source(&mut self, images: Box<dyn ImageSource>) {
        self.images = images;
    }

    /// The grammar this parser dispatches on.
    #[must_use]
    pub const fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The variable environment accumulated by assignments.
    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.env
    }

    /// Drop all variable bindings, isolating the next parse from earlier
    /// ones.
    pub fn clear_variables(&mut self) {
        self.env.clear();
    }

    /// Parse one expression string into a tree.
    ///
    /// For an assignment, the returned tree is the right-hand side (so
    /// `a = x` evaluates like `x`), and the binding is committed only
    /// when the whole parse succeeds — a failed parse leaves the
    /// environment untouched.
    pub fn parse(&mut self, source: &str) -> ParseResult<Expr> {
        let tokens = Scanner::new(source, &self.grammar).scan_all()?;
        let body = match tokens.split_last() {
            Some((last, rest)) if last.kind.is_eof() => rest,
            _ => &tokens[..],
        };

        let (target, rest) = split_assignment(body);
        if rest.is_empty() {
            return Err(ParseError::new(ParseErrorKind::EmptyExpression, "empty expression").into());
        }

        let postfix = to_postfix(rest)?;
        let mut builder = TreeBuilder::new(postfix, &self.grammar, self.images.as_ref());
        let tree = builder.expression()?;
        builder.finish()?;

        if let Some(name) = target {
            self.env.bind(name, tree.clone());
        }
        Ok(tree)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Split off a leading `identifier =`, returning the target name and the
/// remaining tokens. Any `=` elsewhere in the stream is rejected by the
/// postfix conversion.
fn split_assignment(tokens: &[Token]) -> (Option<String>, &[Token]) {
    if let [first, second, rest @ ..] = tokens {
        if let (TokenKind::Identifier(name), TokenKind::Assign) = (&first.kind, &second.kind) {
            return (Some(name.clone()), rest);
        }
    }
    (None, tokens)
}

// ---------------------------------------------------------------------------
// Infix → postfix conversion
// ---------------------------------------------------------------------------

/// Shunting-yard pass: reorder the infix tokens into postfix, validating
/// parentheses, commas, and assignment placement along the way.
fn to_postfix(tokens: &[Token]) -> ParseResult<Vec<Token>> {
    let mut output: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();
    // True right after a token that can end an operand, which is what
    // distinguishes a binary `-` from a prefix one.
    let mut after_operand = false;

    let mut iter = tokens.iter().peekable();
    while let Some(tok) = iter.next() {
        match &tok.kind {
            TokenKind::Number(_) | TokenKind::StringLit(_) | TokenKind::Identifier(_) => {
                output.push(tok.clone());
                after_operand = true;
            }
            TokenKind::Function(name) => {
                if !matches!(iter.peek().map(|t| &t.kind), Some(TokenKind::LeftParen)) {
                    return Err(ParseError::new(
                        ParseErrorKind::UnbalancedParenthesis,
                        format!("function `{name}` must be followed by `(`"),
                    )
                    .with_span(tok.span)
                    .into());
                }
                stack.push(tok.clone());
                after_operand = false;
            }
            TokenKind::LeftParen => {
                stack.push(tok.clone());
                after_operand = false;
            }
            TokenKind::Comma => {
                if !after_operand {
                    return Err(ParseError::new(
                        ParseErrorKind::MisplacedComma,
                        "`,` must follow an argument",
                    )
                    .with_span(tok.span)
                    .into());
                }
                loop {
                    let Some(top) = stack.last() else {
                        return Err(ParseError::new(
                            ParseErrorKind::MisplacedComma,
                            "`,` outside a function argument list",
                        )
                        .with_span(tok.span)
                        .into());
                    };
                    if matches!(top.kind, TokenKind::LeftParen) {
                        break;
                    }
                    if let Some(t) = stack.pop() {
                        output.push(t);
                    }
                }
                after_operand = false;
            }
            TokenKind::RightParen => {
                loop {
                    match stack.pop() {
                        Some(t) if matches!(t.kind, TokenKind::LeftParen) => break,
                        Some(t) => output.push(t),
                        None => {
                            return Err(ParseError::new(
                                ParseErrorKind::UnbalancedParenthesis,
                                "unmatched `)`",
                            )
                            .with_span(tok.span)
                            .into());
                        }
                    }
                }
                // A call's keyword sits directly under its `(`
                if matches!(stack.last().map(|t| &t.kind), Some(TokenKind::Function(_))) {
                    if let Some(t) = stack.pop() {
                        output.push(t);
                    }
                }
                after_operand = true;
            }
            TokenKind::Operator(op) => {
                let op = if *op == OpKind::Minus && !after_operand {
                    OpKind::Negate
                } else {
                    *op
                };
                // A prefix operator has no left operand to resolve, so it
                // never pops: the operator below it is still waiting for
                // its right-hand side.
                while !op.is_unary()
                    && stack.last().is_some_and(|top| should_pop(&top.kind, op))
                {
                    if let Some(t) = stack.pop() {
                        output.push(t);
                    }
                }
                stack.push(Token {
                    kind: TokenKind::Operator(op),
                    span: tok.span,
                });
                after_operand = false;
            }
            TokenKind::Assign => {
                return Err(ParseError::new(
                    ParseErrorKind::BadAssignmentTarget,
                    "the left side of `=` must be a single variable name",
                )
                .with_span(tok.span)
                .into());
            }
            TokenKind::Eof => {}
        }
    }

    while let Some(t) = stack.pop() {
        if matches!(t.kind, TokenKind::LeftParen | TokenKind::Function(_)) {
            return Err(
                ParseError::new(ParseErrorKind::UnbalancedParenthesis, "unclosed `(`")
                    .with_span(t.span)
                    .into(),
            );
        }
        output.push(t);
    }
    Ok(output)
}

/// Whether the operator on top of the stack binds at least as tightly as
/// the incoming one (with right-associative operators holding out for a
/// strictly tighter top).
fn should_pop(top: &TokenKind, cur: OpKind) -> bool {
    let TokenKind::Operator(top_op) = top else {
        return false;
    };
    if cur.is_right_associative() {
        top_op.precedence() > cur.precedence()
    } else {
        top_op.precedence() >= cur.precedence()
    }
}

// ---------------------------------------------------------------------------
// Tree builder
// ---------------------------------------------------------------------------

/// Token-consuming recursive tree construction over a postfix sequence.
///
/// The next token is always the rightmost unconsumed one; popping it
/// decides which analyzer applies, and that analyzer re-enters
/// [`TreeBuilder::expression`] once per operand.
pub struct TreeBuilder<'a> {
    /// Remaining tokens in postfix order; consumed from the back.
    tokens: Vec<Token>,
    grammar: &'a Grammar,
    images: &'a dyn ImageSource,
}

impl<'a> TreeBuilder<'a> {
    /// Create a builder over a postfix token sequence.
    #[must_use]
    pub const fn new(
        tokens: Vec<Token>,
        grammar: &'a Grammar,
        images: &'a dyn ImageSource,
    ) -> Self {
        Self {
            tokens,
            grammar,
            images,
        }
    }

    /// Build the subtree rooted at the next token.
    pub fn expression(&mut self) -> ParseResult<Expr> {
        let Some(tok) = self.tokens.pop() else {
            return Err(ParseError::new(
                ParseErrorKind::MissingOperand,
                "expression ended where an operand was required",
            )
            .into());
        };
        match tok.kind {
            TokenKind::Number(v) => Ok(Expr::Constant(Color::splat(v))),
            TokenKind::Identifier(name) => Ok(match name.as_str() {
                "x" => Expr::X,
                "y" => Expr::Y,
                "t" => Expr::Time,
                _ => Expr::Variable(name),
            }),
            TokenKind::Function(name) => match self.grammar.rule(&name) {
                Some(rule) => (rule.build)(rule, self),
                None => Err(ParseError::new(
                    ParseErrorKind::UnknownFunction,
                    format!("no rule registered for function `{name}`"),
                )
                .with_span(tok.span)
                .into()),
            },
            TokenKind::Operator(op) => self.operator(op),
            TokenKind::StringLit(s) => Err(ParseError::new(
                ParseErrorKind::MisplacedString,
                format!("string \"{s}\" is only valid as an image filename"),
            )
            .with_span(tok.span)
            .into()),
            // Parentheses, commas, and `=` never survive the postfix pass
            kind => Err(ParseError::new(
                ParseErrorKind::MissingOperand,
                format!("unexpected {}", kind.describe()),
            )
            .with_span(tok.span)
            .into()),
        }
    }

    /// Build a function operand, failing with an arity diagnostic when
    /// the arguments ran out. A filename string on top of the stack also
    /// counts as exhausted: it belongs to the (unconsumed) filename slot.
    pub fn operand(&mut self, func: &str, which: &str) -> ParseResult<Expr> {
        match self.tokens.last().map(|t| &t.kind) {
            None | Some(TokenKind::StringLit(_)) => Err(ParseError::new(
                ParseErrorKind::MissingArgument,
                format!("`{func}` is missing its {which}"),
            )
            .into()),
            Some(_) => self.expression(),
        }
    }

    /// Consume the operands of an image function: the y and x coordinate
    /// subtrees, then the filename literal, resolved through the image
    /// source.
    pub fn image_call(&mut self, rule: &FunctionRule) -> ParseResult<ImageFn> {
        let y = self.operand(rule.name, "y coordinate")?;
        let x = self.operand(rule.name, "x coordinate")?;
        let filename = self.filename(rule.name)?;
        let raster = self.resolve_image(&filename)?;
        Ok(ImageFn {
            filename,
            raster,
            x: Box::new(x),
            y: Box::new(y),
        })
    }

    /// Consume a filename literal.
    pub fn filename(&mut self, func: &str) -> ParseResult<String> {
        match self.tokens.pop() {
            Some(Token {
                kind: TokenKind::StringLit(s),
                ..
            }) => Ok(s),
            Some(tok) => Err(ParseError::new(
                ParseErrorKind::InvalidFilename,
                format!(
                    "`{func}` expects a quoted filename, found {}",
                    tok.kind.describe()
                ),
            )
            .with_span(tok.span)
            .into()),
            None => Err(ParseError::new(
                ParseErrorKind::MissingArgument,
                format!("`{func}` is missing its filename"),
            )
            .into()),
        }
    }

    /// Resolve a filename through the image-source collaborator.
    pub fn resolve_image(&self, name: &str) -> ParseResult<Arc<Raster>> {
        self.images
            .load(name)
            .ok_or_else(|| Error::Resource(ResourceError::new(name)))
    }

    /// Reject leftover tokens once the top-level production is complete.
    pub fn finish(&mut self) -> ParseResult<()> {
        match self.tokens.last() {
            None => Ok(()),
            Some(tok) => Err(ParseError::new(
                ParseErrorKind::ExtraOperands,
                "extra operands in expression",
            )
            .with_span(tok.span)
            .into()),
        }
    }

    fn operator(&mut self, op: OpKind) -> ParseResult<Expr> {
        if op.is_unary() {
            return Ok(Expr::Negate(Box::new(self.op_operand(op)?)));
        }
        // Postfix order: the right operand is on top
        let rhs = Box::new(self.op_operand(op)?);
        let lhs = Box::new(self.op_operand(op)?);
        Ok(match op {
            OpKind::Plus => Expr::Plus(lhs, rhs),
            OpKind::Minus => Expr::Minus(lhs, rhs),
            OpKind::Times => Expr::Times(lhs, rhs),
            OpKind::Divide => Expr::Divide(lhs, rhs),
            OpKind::Modulo => Expr::Modulo(lhs, rhs),
            OpKind::Power => Expr::Power(lhs, rhs),
            OpKind::Negate => unreachable!(),
        })
    }

    fn op_operand(&mut self, op: OpKind) -> ParseResult<Expr> {
        if self.tokens.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::MissingOperand,
                format!("operator `{}` is missing an operand", op.symbol()),
            )
            .into());
        }
        self.expression()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
