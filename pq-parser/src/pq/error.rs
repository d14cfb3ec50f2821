//! Error taxonomy — spec.md §7.
//!
//! Hand-rolled `enum` + `impl fmt::Display` + `impl std::error::Error`,
//! matching the teacher's `lex::ast::error` convention rather than reaching
//! for a derive-macro error crate. Every returnable error carries enough
//! structured data to render both a locale-keyed message id and a default
//! English rendering; callers that need localization look up the id
//! (`message_id()`) in their own catalog — localization itself is out of
//! scope (spec.md §1).

use std::fmt;

use crate::pq::context::ParseContext;
use crate::pq::position::LexerPosition;
use crate::pq::token::TokenKind;

/// A bug in the core itself — non-recoverable, must terminate the process
/// per spec.md §6 "Result discipline".
#[derive(Debug)]
pub struct InvariantError {
    pub message: String,
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invariant violated: {}", self.message)
    }
}

impl std::error::Error for InvariantError {}

/// A cancellation capability fired mid-operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationError {
    Requested,
    TimedOut { elapsed_ms: u64, budget_ms: u64 },
}

impl fmt::Display for CancellationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancellationError::Requested => write!(f, "operation was cancelled"),
            CancellationError::TimedOut {
                elapsed_ms,
                budget_ms,
            } => write!(
                f,
                "operation exceeded its {budget_ms}ms budget (ran for {elapsed_ms}ms)"
            ),
        }
    }
}

impl std::error::Error for CancellationError {}

/// `CommonError` wraps the two error shapes every phase entry point may
/// surface regardless of which phase it is: a core bug, or a cancellation.
#[derive(Debug)]
pub enum CommonError {
    Invariant(InvariantError),
    Cancellation(CancellationError),
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommonError::Invariant(inner) => write!(f, "{inner}"),
            CommonError::Cancellation(inner) => write!(f, "{inner}"),
        }
    }
}

impl std::error::Error for CommonError {}

/// `BadRange` subkinds — spec.md §7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadRangeKind {
    SameLineStartHigher,
    LineNumberStartGreaterThanLineNumberEnd,
    LineNumberStartLessThanZero,
    LineNumberStartGreaterThanNumLines,
    LineNumberEndGreaterThanNumLines,
    LineCodeUnitStartGreaterThanLineLength,
    LineCodeUnitEndGreaterThanLineLength,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadLineNumberKind {
    LessThanZero,
    GreaterThanNumLines,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedKind {
    HexLiteral,
    KeywordOrIdentifier,
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultilineTokenKind {
    MultilineComment,
    Text,
    QuotedIdentifier,
}

/// Lexer errors — spec.md §7. Per-line instances (`Expected`) are stored on
/// the `Line`, never propagated; `UnterminatedMultilineToken` only ever
/// surfaces from `trySnapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    BadLineNumber(BadLineNumberKind),
    BadRange(BadRangeKind),
    Cancelled(CancellationError),
    Expected {
        position: LexerPosition,
        kind: ExpectedKind,
    },
    UnterminatedMultilineToken {
        kind: MultilineTokenKind,
        position: LexerPosition,
    },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::BadLineNumber(kind) => write!(f, "bad line number: {kind:?}"),
            LexError::BadRange(kind) => write!(f, "bad range: {kind:?}"),
            LexError::Cancelled(inner) => write!(f, "{inner}"),
            LexError::Expected { position, kind } => {
                write!(f, "expected {kind:?} at {position}")
            }
            LexError::UnterminatedMultilineToken { kind, position } => {
                write!(f, "unterminated {kind:?} starting at {position}")
            }
        }
    }
}

impl std::error::Error for LexError {}

/// Parse error subkinds — spec.md §7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    Cancelled(CancellationError),
    ExpectedAnyTokenKind { expected: Vec<TokenKind> },
    ExpectedTokenKind { expected: TokenKind },
    ExpectedGeneralizedIdentifier,
    InvalidPrimitiveType { literal: String },
    /// `leftover_literal` is the literal text of the first token the parser
    /// never consumed — `pq-inspection`'s autocomplete pass prefix-matches
    /// it against grammar-legal keyword continuations (spec.md §4.5(e)).
    UnusedTokensRemain { leftover_literal: String },
}

/// `ParseError` always preserves the in-flight `ParseContext` — the
/// substrate `pq-inspection` operates on for mid-edit text (spec.md §4.4
/// "Error recovery").
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// The offending token, or `None` if the mismatch happened at end of
    /// input.
    pub token: Option<TokenKind>,
    pub context: ParseContext,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, token: Option<TokenKind>, context: ParseContext) -> Self {
        Self {
            kind,
            token,
            context,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::Cancelled(inner) => write!(f, "{inner}"),
            ParseErrorKind::ExpectedAnyTokenKind { expected } => {
                write!(f, "expected one of {expected:?}, found {:?}", self.token)
            }
            ParseErrorKind::ExpectedTokenKind { expected } => {
                write!(f, "expected {expected:?}, found {:?}", self.token)
            }
            ParseErrorKind::ExpectedGeneralizedIdentifier => {
                write!(f, "expected a generalized identifier, found {:?}", self.token)
            }
            ParseErrorKind::InvalidPrimitiveType { literal } => {
                write!(f, "'{literal}' is not a valid primitive type")
            }
            ParseErrorKind::UnusedTokensRemain { leftover_literal } => {
                write!(f, "unused tokens remain after parsing completed, starting at '{leftover_literal}'")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Show two lines of context before and after `position`, matching the
/// teacher's `format_source_context` helper — used when rendering a
/// human-readable diagnostic for either error family.
pub fn format_source_context(source: &str, position: LexerPosition) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let error_line = position.line_number as usize;
    let start_line = error_line.saturating_sub(2);
    let end_line = (error_line + 3).min(lines.len());

    let mut context = String::new();
    for (line_num, text) in lines.iter().enumerate().take(end_line).skip(start_line) {
        let marker = if line_num == error_line { ">>" } else { "  " };
        context.push_str(&format!("{marker} {:>4} | {text}\n", line_num + 1));
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_source_context_marks_error_line() {
        let source = "a\nb\nc\nd\ne";
        let context = format_source_context(source, LexerPosition::new(2, 0));
        assert!(context.contains(">>"));
        assert!(context.contains("c"));
    }

    #[test]
    fn cancellation_display_includes_budget() {
        let err = CancellationError::TimedOut {
            elapsed_ms: 5,
            budget_ms: 0,
        };
        assert!(err.to_string().contains("0ms budget"));
    }

    #[test]
    fn expected_token_kind_display_names_both_sides() {
        use crate::pq::token::grammar::KeywordKind;

        let error = ParseError::new(
            ParseErrorKind::ExpectedTokenKind {
                expected: TokenKind::Keyword(KeywordKind::Then),
            },
            Some(TokenKind::Identifier),
            ParseContext::new(),
        );
        insta::assert_snapshot!(error.to_string(), @"expected Keyword(Then), found Some(Identifier)");
    }
}
