//! Error types for the Prism front end.
//!
//! There are three failure kinds: [`LexError`] for illegal characters and
//! malformed literals (defined next to the scanner), [`ParseError`] for
//! structurally invalid token sequences, and [`ResourceError`] for image
//! names the host's image source cannot resolve. All three are recoverable
//! at the parse boundary; a failed parse leaves the variable environment
//! untouched. Evaluation itself never fails — degenerate arithmetic
//! propagates as non-finite channel values instead.

use std::fmt;

use crate::scanner::LexError;
use crate::token::Span;

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Categories of parse failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The input contained no expression at all.
    EmptyExpression,
    /// An operator or production ran out of operands.
    MissingOperand,
    /// A fixed-arity function was given too few arguments.
    MissingArgument,
    /// Tokens remained after the top-level production completed.
    ExtraOperands,
    /// A `(` without `)` or vice versa, or a function keyword not
    /// followed by `(`.
    UnbalancedParenthesis,
    /// A `,` outside a function argument list.
    MisplacedComma,
    /// A string literal outside a filename argument position.
    MisplacedString,
    /// The left side of `=` was not a single bare identifier.
    BadAssignmentTarget,
    /// A filename argument position held a non-string token.
    InvalidFilename,
    /// A function token with no registered rule.
    UnknownFunction,
}

/// A structurally invalid token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Machine-readable error kind.
    pub kind: ParseErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Source location, if available.
    pub span: Option<Span>,
}

impl ParseError {
    /// Create a new parse error.
    #[must_use]
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    /// Attach a source span.
    #[must_use]
    pub const fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = self.span {
            write!(f, "[{}..{}] ", span.start, span.end)?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Resource errors
// ---------------------------------------------------------------------------

/// An image name the image-source collaborator cannot resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceError {
    /// The filename as written in the expression.
    pub name: String,
}

impl ResourceError {
    /// Create a new resource error for the given image name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot resolve image \"{}\"", self.name)
    }
}

impl std::error::Error for ResourceError {}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Any failure the parse entry point can return.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Unrecognized character or malformed literal.
    Lex(LexError),
    /// Structurally invalid token sequence.
    Parse(ParseError),
    /// Unresolvable image reference.
    Resource(ResourceError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(e) => e.fmt(f),
            Self::Parse(e) => e.fmt(f),
            Self::Resource(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Lex(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Resource(e) => Some(e),
        }
    }
}

impl From<LexError> for Error {
    fn from(e: LexError) -> Self {
        Self::Lex(e)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<ResourceError> for Error {
    fn from(e: ResourceError) -> Self {
        Self::Resource(e)
    }
}

/// Convenience type alias for results using [`Error`].
pub type ParseResult<T> = Result<T, Error>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
