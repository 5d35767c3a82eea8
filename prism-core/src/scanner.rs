//! Lexical scanner for Prism expressions.
//!
//! A single left-to-right pass over the source bytes. The scanner is the
//! only component that ever looks at raw text: it decides which characters
//! are legal, classifies identifiers against the grammar's function-keyword
//! set, and everything downstream works on [`Token`]s alone.
//!
//! # Token production rules
//!
//! | Input               | Token produced                          |
//! |---------------------|-----------------------------------------|
//! | `123`, `3.14`, `.5` | `Number(value)`                         |
//! | `"lava.png"`        | `StringLit("lava.png")`                 |
//! | `clamp` (registered)| `Function("clamp")`                     |
//! | `x`, `foo_1`        | `Identifier("x")`, `Identifier("foo_1")`|
//! | `( ) , =`           | `LeftParen`, `RightParen`, `Comma`, `Assign` |
//! | `+ - * / % ^ !`     | `Operator(..)`                          |
//! | end of input        | `Eof`                                   |
//!
//! Anything else is a [`LexError`].

use std::fmt;

use crate::grammar::Grammar;
use crate::token::{OpKind, Span, Token, TokenKind};

// ---------------------------------------------------------------------------
// Scanner error
// ---------------------------------------------------------------------------

/// What went wrong during scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    InvalidCharacter,
    UnterminatedString,
}

/// An error encountered during scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Machine-readable error kind.
    pub kind: LexErrorKind,
    /// Human-readable error message.
    pub message: String,
    /// Location of the error.
    pub span: Span,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lex error at {}-{}: {}",
            self.span.start, self.span.end, self.message
        )
    }
}

impl std::error::Error for LexError {}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Lexical scanner for one expression string.
pub struct Scanner<'a> {
    /// Source text.
    src: &'a str,
    /// Current byte position.
    pos: usize,
    /// Grammar whose keyword set classifies identifiers.
    grammar: &'a Grammar,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner over the given source string.
    #[must_use]
    pub const fn new(source: &'a str, grammar: &'a Grammar) -> Self {
        Self {
            src: source,
            pos: 0,
            grammar,
        }
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::at(start),
            });
        };

        match c {
            b'0'..=b'9' => Ok(self.scan_number(start)),
            b'.' if matches!(self.peek_at(1), Some(b'0'..=b'9')) => Ok(self.scan_number(start)),
            b'"' => self.scan_string(start),
            c if is_identifier_start(c) => Ok(self.scan_identifier(start)),
            _ => self.scan_single(start),
        }
    }

    /// Scan all tokens including the trailing `Eof`.
    pub fn scan_all(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind.is_eof();
            tokens.push(tok);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    // -- internal helpers --

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n' | 0x0C)) {
            self.pos += 1;
        }
    }

    /// Scan a decimal literal: digits, an optional fraction, or a
    /// dot-leading fraction like `.5`.
    fn scan_number(&mut self, start: usize) -> Token {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }

        // The slice is ASCII digits with at most one interior dot, which
        // always parses; 0.0 is an unreachable fallback.
        let value = self.src[start..self.pos].parse().unwrap_or(0.0);
        Token {
            kind: TokenKind::Number(value),
            span: Span::new(start, self.pos),
        }
    }

    /// Scan a string literal. The opening `"` is at `self.pos`.
    ///
    /// No escape processing; the literal ends at the next `"`. Reaching a
    /// newline or the end of input first is an error — filenames never
    /// span lines.
    fn scan_string(&mut self, start: usize) -> Result<Token, LexError> {
        self.pos += 1; // opening quote

        let content_start = self.pos;
        while let Some(c) = self.peek() {
            if c == b'"' || c == b'\n' {
                break;
            }
            self.pos += 1;
        }

        if self.peek() != Some(b'"') {
            return Err(LexError {
                kind: LexErrorKind::UnterminatedString,
                message: "unterminated string literal".into(),
                span: Span::new(start, self.pos),
            });
        }

        let text = self.src[content_start..self.pos].to_owned();
        self.pos += 1; // closing quote
        Ok(Token {
            kind: TokenKind::StringLit(text),
            span: Span::new(start, self.pos),
        })
    }

    /// Scan an identifier and classify it against the grammar's
    /// function-keyword set (case-sensitively).
    fn scan_identifier(&mut self, start: usize) -> Token {
        while self.peek().is_some_and(is_identifier_continue) {
            self.pos += 1;
        }

        let name = &self.src[start..self.pos];
        let kind = if self.grammar.is_function(name) {
            TokenKind::Function(name.to_owned())
        } else {
            TokenKind::Identifier(name.to_owned())
        };
        Token {
            kind,
            span: Span::new(start, self.pos),
        }
    }

    /// Scan a single-character token, or fail on an illegal character.
    fn scan_single(&mut self, start: usize) -> Result<Token, LexError> {
        let kind = match self.peek() {
            Some(b'(') => TokenKind::LeftParen,
            Some(b')') => TokenKind::RightParen,
            Some(b',') => TokenKind::Comma,
            Some(b'=') => TokenKind::Assign,
            Some(b'+') => TokenKind::Operator(OpKind::Plus),
            Some(b'-') => TokenKind::Operator(OpKind::Minus),
            Some(b'*') => TokenKind::Operator(OpKind::Times),
            Some(b'/') => TokenKind::Operator(OpKind::Divide),
            Some(b'%') => TokenKind::Operator(OpKind::Modulo),
            Some(b'^') => TokenKind::Operator(OpKind::Power),
            Some(b'!') => TokenKind::Operator(OpKind::Negate),
            _ => {
                // Report the whole character, not just its first byte
                let c = self.src[start..].chars().next().unwrap_or('\u{fffd}');
                return Err(LexError {
                    kind: LexErrorKind::InvalidCharacter,
                    message: format!("invalid character `{c}`"),
                    span: Span::new(start, start + c.len_utf8()),
                });
            }
        };
        self.pos += 1;
        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }
}

const fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

const fn is_identifier_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let grammar = Grammar::standard();
        Scanner::new(input, &grammar)
            .scan_all()
            .expect("scan failed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn scan_err(input: &str) -> LexError {
        let grammar = Grammar::standard();
        Scanner::new(input, &grammar)
            .scan_all()
            .expect_err("scan unexpectedly succeeded")
    }

    fn ident(name: &str) -> TokenKind {
        TokenKind::Identifier(name.into())
    }

    // -- whitespace --

    #[test]
    fn empty_input() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn whitespace_only() {
        assert_eq!(kinds("   \t\n  "), vec![TokenKind::Eof]);
    }

    // -- numbers --

    #[test]
    fn integer() {
        assert_eq!(kinds("42"), vec![TokenKind::Number(42.0), TokenKind::Eof]);
    }

    #[test]
    fn decimal() {
        assert_eq!(kinds("3.14"), vec![TokenKind::Number(3.14), TokenKind::Eof]);
    }

    #[test]
    fn leading_dot_number() {
        assert_eq!(kinds(".5"), vec![TokenKind::Number(0.5), TokenKind::Eof]);
    }

    #[test]
    fn number_dot_number() {
        // "1.2.3" lexes as 1.2 then .3; the parser rejects the sequence
        assert_eq!(
            kinds("1.2.3"),
            vec![TokenKind::Number(1.2), TokenKind::Number(0.3), TokenKind::Eof]
        );
    }

    #[test]
    fn bare_dot_is_invalid() {
        let err = scan_err("x . y");
        assert_eq!(err.kind, LexErrorKind::InvalidCharacter);
        assert_eq!(err.span, Span::new(2, 3));
    }

    // -- strings --

    #[test]
    fn simple_string() {
        assert_eq!(
            kinds("\"lava.png\""),
            vec![TokenKind::StringLit("lava.png".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn empty_string() {
        assert_eq!(
            kinds("\"\""),
            vec![TokenKind::StringLit(String::new()), TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string() {
        let err = scan_err("\"oops");
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.span.start, 0);
    }

    #[test]
    fn string_cannot_span_lines() {
        let err = scan_err("\"a\nb\"");
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
    }

    // -- identifiers and keywords --

    #[test]
    fn clamp_call_token_sequence() {
        assert_eq!(
            kinds("clamp(x)"),
            vec![
                TokenKind::Function("clamp".into()),
                TokenKind::LeftParen,
                ident("x"),
                TokenKind::RightParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn whitespace_does_not_change_token_sequence() {
        let spaced = kinds("   clamp   (   x + y   )  ");
        assert_eq!(spaced[0], TokenKind::Function("clamp".into()));
        assert_eq!(spaced[1], TokenKind::LeftParen);
        assert!(spaced.contains(&ident("x")));
        assert!(spaced.contains(&ident("y")));
        assert_eq!(spaced[spaced.len() - 2], TokenKind::RightParen);
        assert_eq!(
            spaced,
            kinds("clamp(x+y)"),
            "whitespace must not affect the logical sequence"
        );
    }

    #[test]
    fn keyword_matching_is_case_sensitive() {
        assert_eq!(
            kinds("Clamp sin SIN"),
            vec![
                ident("Clamp"),
                TokenKind::Function("sin".into()),
                ident("SIN"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn identifier_with_digits_and_underscore() {
        assert_eq!(kinds("foo_1"), vec![ident("foo_1"), TokenKind::Eof]);
    }

    #[test]
    fn camel_case_function_keywords() {
        assert_eq!(
            kinds("rgbToYCrCb imageClip perlinBW"),
            vec![
                TokenKind::Function("rgbToYCrCb".into()),
                TokenKind::Function("imageClip".into()),
                TokenKind::Function("perlinBW".into()),
                TokenKind::Eof,
            ]
        );
    }

    // -- operators and punctuation --

    #[test]
    fn all_single_char_tokens() {
        assert_eq!(
            kinds("( ) , = + - * / % ^ !"),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::Comma,
                TokenKind::Assign,
                TokenKind::Operator(OpKind::Plus),
                TokenKind::Operator(OpKind::Minus),
                TokenKind::Operator(OpKind::Times),
                TokenKind::Operator(OpKind::Divide),
                TokenKind::Operator(OpKind::Modulo),
                TokenKind::Operator(OpKind::Power),
                TokenKind::Operator(OpKind::Negate),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn operators_do_not_merge() {
        assert_eq!(
            kinds("x+-y"),
            vec![
                ident("x"),
                TokenKind::Operator(OpKind::Plus),
                TokenKind::Operator(OpKind::Minus),
                ident("y"),
                TokenKind::Eof,
            ]
        );
    }

    // -- invalid characters --

    #[test]
    fn invalid_character() {
        let err = scan_err("x @ y");
        assert_eq!(err.kind, LexErrorKind::InvalidCharacter);
        assert_eq!(err.span, Span::new(2, 3));
        assert!(err.message.contains('@'), "message: {}", err.message);
    }

    #[test]
    fn invalid_non_ascii_character_reported_whole() {
        let err = scan_err("x \u{3bb} y");
        assert_eq!(err.kind, LexErrorKind::InvalidCharacter);
        assert_eq!(err.span.len(), '\u{3bb}'.len_utf8());
        assert!(err.message.contains('\u{3bb}'), "message: {}", err.message);
    }

    // -- spans --

    #[test]
    fn spans_are_correct() {
        let grammar = Grammar::standard();
        let tokens = Scanner::new("ab 3.5", &grammar).scan_all().unwrap();
        assert_eq!(tokens[0].span, Span::new(0, 2)); // "ab"
        assert_eq!(tokens[1].span, Span::new(3, 6)); // "3.5"
    }

    // -- combined expression --

    #[test]
    fn realistic_expression() {
        assert_eq!(
            kinds("sin(x) + clamp(y * t)"),
            vec![
                TokenKind::Function("sin".into()),
                TokenKind::LeftParen,
                ident("x"),
                TokenKind::RightParen,
                TokenKind::Operator(OpKind::Plus),
                TokenKind::Function("clamp".into()),
                TokenKind::LeftParen,
                ident("y"),
                TokenKind::Operator(OpKind::Times),
                ident("t"),
                TokenKind::RightParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn image_call_with_filename() {
        assert_eq!(
            kinds("imageWrap(\"vortex.png\", x, y)"),
            vec![
                TokenKind::Function("imageWrap".into()),
                TokenKind::LeftParen,
                TokenKind::StringLit("vortex.png".into()),
                TokenKind::Comma,
                ident("x"),
                TokenKind::Comma,
                ident("y"),
                TokenKind::RightParen,
                TokenKind::Eof,
            ]
        );
    }
}
