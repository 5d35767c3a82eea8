//! Prism expression language front end.
//!
//! Prism maps two domain coordinates (and an optional animation time) to
//! a color. This crate is the compiler front end: scanning, grammar-driven
//! tree construction, the expression node model, and the variable
//! environment. Rendering — evaluating the tree per pixel — is the
//! caller's loop:
//!
//! ```
//! use prism_core::{Parser, RenderContext};
//!
//! let mut parser = Parser::new();
//! let tree = parser.parse("clamp(x + y)").expect("valid expression");
//! let ctx = RenderContext::new(parser.environment());
//! let color = tree.evaluate(0.25, -0.5, &ctx);
//! assert!((color.r + 0.25).abs() < 0.005);
//! ```
//!
//! Parsing is per expression; evaluation is per pixel and may be shared
//! across worker threads as long as the environment is not rebound during
//! a pass and the context's time is fixed for the frame.

pub mod error;
pub mod expr;
pub mod grammar;
pub mod images;
pub mod parser;
pub mod scanner;
pub mod token;
pub mod variables;

pub use error::{Error, ParseError, ParseErrorKind, ParseResult, ResourceError};
pub use expr::{Expr, ImageFn, RenderContext, TIME_STEP};
pub use grammar::{BuildFn, FunctionRule, Grammar};
pub use images::{ImageSource, MemoryImageSource, NullImageSource};
pub use parser::{Parser, TreeBuilder};
pub use scanner::{LexError, LexErrorKind, Scanner};
pub use token::{OpKind, Span, Token, TokenKind};
pub use variables::{Environment, ExprId};
