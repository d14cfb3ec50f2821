//! Per-line token representation — the unit the incremental lexer edits.

use super::{LineTokenKind, TokenKind};
use crate::pq::error::LexError;
use crate::pq::position::LexerPosition;

/// The line terminator a `Line` was split on. Carried per-line (not
/// assumed uniform) because edits can mix terminators within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTerminator {
    Lf,
    CrLf,
    Cr,
    /// The last line of the document, which has no trailing terminator.
    None,
}

impl LineTerminator {
    pub fn as_str(self) -> &'static str {
        match self {
            LineTerminator::Lf => "\n",
            LineTerminator::CrLf => "\r\n",
            LineTerminator::Cr => "\r",
            LineTerminator::None => "",
        }
    }
}

/// The state a line inherits from its predecessor and hands to its
/// successor. `LexerState`'s invariant (spec.md §3) is
/// `lines[i].mode_start == lines[i - 1].mode_end` for every `i > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    Default,
    Comment,
    QuotedIdentifier,
    Text,
}

/// One token scanned within a single line. Multiline tokens are split into
/// `*Start`/`*Content`/`*End` pieces across lines; `line_start`/`line_end`
/// are line-local code-unit offsets (not absolute — that's snapshot space).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineToken {
    pub kind: LineTokenKind,
    pub literal: String,
    pub line_start: u32,
    pub line_end: u32,
}

impl LineToken {
    pub fn new(kind: LineTokenKind, literal: impl Into<String>, line_start: u32, line_end: u32) -> Self {
        Self {
            kind,
            literal: literal.into(),
            line_start,
            line_end,
        }
    }

    pub fn token_kind(&self) -> Option<TokenKind> {
        self.kind.fused_kind()
    }
}

/// One line of source text together with its tokens and inherited/handed-
/// off line mode. The lexer never throws for per-line errors — they're
/// stored on the line itself and only propagate at snapshot time (spec.md
/// §4.1 "Errors").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub line_string: String,
    pub line_terminator: LineTerminator,
    pub mode_start: LineMode,
    pub mode_end: LineMode,
    pub tokens: Vec<LineToken>,
    pub error: Option<LexError>,
}

impl Line {
    pub fn new(line_string: impl Into<String>, line_terminator: LineTerminator, mode_start: LineMode) -> Self {
        Self {
            line_string: line_string.into(),
            line_terminator,
            mode_start,
            mode_end: mode_start,
            tokens: Vec::new(),
            error: None,
        }
    }

    pub fn len_code_units(&self) -> u32 {
        self.line_string.encode_utf16().count() as u32
    }

    pub fn position_at(&self, line_number: u32, line_code_unit: u32) -> LexerPosition {
        LexerPosition::new(line_number, line_code_unit)
    }
}
