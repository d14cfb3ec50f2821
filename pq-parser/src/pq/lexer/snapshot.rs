//! `LexerSnapshot` — collapses a `LexerState`'s per-line tokens into one
//! flat, comment-stripped token stream with absolute code-unit positions
//! (spec.md §4.2).

use log::{debug, trace};

use crate::pq::error::{LexError, MultilineTokenKind};
use crate::pq::position::{LexerPosition, SnapshotPosition, TokenRange};
use crate::pq::token::line::LineTerminator;
use crate::pq::token::{LineTokenKind, TokenKind};

use super::LexerState;

/// One token in snapshot space: an absolute `TokenRange` and its fused
/// kind/literal. Multiline fragments have already been joined into one of
/// these by the time a `LexerSnapshot` exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub range: TokenRange,
}

/// The flattened view: `tokens` feeds the parser, `comments` is the side
/// channel stripped out of it, `line_terminators` and `line_starts` support
/// the code-unit-index-to-position mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerSnapshot {
    pub tokens: Vec<Token>,
    pub comments: Vec<Token>,
    pub line_terminators: Vec<LineTerminator>,
    line_starts: Vec<u32>,
}

impl LexerSnapshot {
    /// The absolute code-unit position corresponding to `code_unit`, or
    /// `None` if it falls past the end of the document.
    pub fn position_at(&self, code_unit: u32) -> Option<SnapshotPosition> {
        if self.line_starts.is_empty() {
            return None;
        }
        let line_number = match self.line_starts.binary_search(&code_unit) {
            Ok(exact) => exact,
            Err(insertion_point) => insertion_point.saturating_sub(1),
        };
        let line_start = *self.line_starts.get(line_number)?;
        Some(SnapshotPosition::new(
            line_number as u32,
            code_unit - line_start,
            code_unit,
        ))
    }
}

struct OpenMultiline {
    kind: MultilineTokenKind,
    start_line: u32,
    start_line_code_unit: u32,
    start_absolute: u32,
    literal: String,
}

fn terminator_len(terminator: LineTerminator) -> u32 {
    match terminator {
        LineTerminator::Lf | LineTerminator::Cr => 1,
        LineTerminator::CrLf => 2,
        LineTerminator::None => 0,
    }
}

/// Build a `LexerSnapshot` from `state` (spec.md §4.1 `trySnapshot`). Fails
/// on the first line carrying a stored lex error, or if any multiline run
/// never reaches its `*End` piece.
pub fn build(state: &LexerState) -> Result<LexerSnapshot, LexError> {
    debug!("lexer: trySnapshot fusing {} line(s)", state.lines.len());
    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    let mut line_terminators = Vec::with_capacity(state.lines.len());
    let mut line_starts = Vec::with_capacity(state.lines.len());

    let mut open: Option<OpenMultiline> = None;
    let mut absolute_unit: u32 = 0;

    for (line_index, line) in state.lines.iter().enumerate() {
        if let Some(error) = &line.error {
            return Err(error.clone());
        }

        trace!("lexer: checkpoint at line {line_index}");
        line_starts.push(absolute_unit);
        line_terminators.push(line.line_terminator);

        for line_token in &line.tokens {
            let abs_start = absolute_unit + line_token.line_start;
            let abs_end = absolute_unit + line_token.line_end;

            match line_token.kind {
                LineTokenKind::MultilineCommentStart => {
                    open = Some(OpenMultiline {
                        kind: MultilineTokenKind::MultilineComment,
                        start_line: line_index as u32,
                        start_line_code_unit: line_token.line_start,
                        start_absolute: abs_start,
                        literal: line_token.literal.clone(),
                    });
                }
                LineTokenKind::TextLiteralStart => {
                    open = Some(OpenMultiline {
                        kind: MultilineTokenKind::Text,
                        start_line: line_index as u32,
                        start_line_code_unit: line_token.line_start,
                        start_absolute: abs_start,
                        literal: line_token.literal.clone(),
                    });
                }
                LineTokenKind::QuotedIdentifierStart => {
                    open = Some(OpenMultiline {
                        kind: MultilineTokenKind::QuotedIdentifier,
                        start_line: line_index as u32,
                        start_line_code_unit: line_token.line_start,
                        start_absolute: abs_start,
                        literal: line_token.literal.clone(),
                    });
                }
                LineTokenKind::MultilineCommentContent
                | LineTokenKind::TextLiteralContent
                | LineTokenKind::QuotedIdentifierContent => {
                    if let Some(run) = open.as_mut() {
                        run.literal.push_str(&line_token.literal);
                    }
                }
                LineTokenKind::MultilineCommentEnd
                | LineTokenKind::TextLiteralEnd
                | LineTokenKind::QuotedIdentifierEnd => {
                    if let Some(run) = open.take() {
                        let mut literal = run.literal;
                        literal.push_str(&line_token.literal);
                        let fused_kind = line_token.token_kind().expect("end fragment always fuses");
                        let range = TokenRange::new(
                            SnapshotPosition::new(run.start_line, run.start_line_code_unit, run.start_absolute),
                            SnapshotPosition::new(line_index as u32, line_token.line_end, abs_end),
                        );
                        let token = Token {
                            kind: fused_kind,
                            literal,
                            range,
                        };
                        if fused_kind == TokenKind::MultilineComment {
                            comments.push(token);
                        } else {
                            tokens.push(token);
                        }
                    }
                }
                LineTokenKind::Complete(kind) => {
                    let range = TokenRange::new(
                        SnapshotPosition::new(line_index as u32, line_token.line_start, abs_start),
                        SnapshotPosition::new(line_index as u32, line_token.line_end, abs_end),
                    );
                    let token = Token {
                        kind,
                        literal: line_token.literal.clone(),
                        range,
                    };
                    if kind == TokenKind::LineComment {
                        comments.push(token);
                    } else {
                        tokens.push(token);
                    }
                }
            }
        }

        absolute_unit += line.len_code_units() + terminator_len(line.line_terminator);
    }

    if let Some(run) = open {
        return Err(LexError::UnterminatedMultilineToken {
            kind: run.kind,
            position: LexerPosition::with_code_unit(run.start_line, run.start_line_code_unit, run.start_absolute),
        });
    }

    Ok(LexerSnapshot {
        tokens,
        comments,
        line_terminators,
        line_starts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pq::cancellation::NeverCancelled;
    use crate::pq::lexer::try_lex;

    #[test]
    fn snapshot_fuses_multiline_comment_across_lines() {
        let state = try_lex("en-US", "/* start\nend */ 1", &NeverCancelled).unwrap();
        let snapshot = build(&state).unwrap();
        assert_eq!(snapshot.comments.len(), 1);
        assert_eq!(snapshot.comments[0].kind, TokenKind::MultilineComment);
        assert_eq!(snapshot.tokens.len(), 1);
        assert_eq!(snapshot.tokens[0].kind, TokenKind::NumericLiteral);
    }

    #[test]
    fn unterminated_block_comment_is_reported_at_snapshot_time() {
        let state = try_lex("en-US", "/* never closes", &NeverCancelled).unwrap();
        let result = build(&state);
        assert!(matches!(
            result,
            Err(LexError::UnterminatedMultilineToken {
                kind: MultilineTokenKind::MultilineComment,
                ..
            })
        ));
    }

    #[test]
    fn line_comments_are_stripped_into_the_side_channel() {
        let state = try_lex("en-US", "1 // trailing", &NeverCancelled).unwrap();
        let snapshot = build(&state).unwrap();
        assert_eq!(snapshot.tokens.len(), 1);
        assert_eq!(snapshot.comments.len(), 1);
    }

    #[test]
    fn position_at_resolves_to_correct_line() {
        let state = try_lex("en-US", "ab\ncd", &NeverCancelled).unwrap();
        let snapshot = build(&state).unwrap();
        let position = snapshot.position_at(3).unwrap();
        assert_eq!(position.line_number, 1);
        assert_eq!(position.line_code_unit, 0);
    }

    #[test]
    fn same_line_hex_expectation_error_propagates_not_as_unterminated() {
        let state = try_lex("en-US", "0x", &NeverCancelled).unwrap();
        let result = build(&state);
        assert!(matches!(result, Err(LexError::Expected { .. })));
    }
}
