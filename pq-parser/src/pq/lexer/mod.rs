//! `LexerState` — the incremental, line-oriented lexer (spec.md §4.1).
//!
//! Holds an ordered sequence of `Line`s where `lines[i].mode_start ==
//! lines[i - 1].mode_end` for every `i > 0`. Editing operations
//! (`try_append_line`/`try_delete_line`/`try_update_line`/`try_update_range`)
//! re-tokenize only the affected lines forward until that invariant
//! re-converges; unchanged trailing lines are kept by identity (not
//! re-allocated), matching spec.md §4.1's re-tokenization algorithm.

pub mod scan;
pub mod snapshot;

use log::{debug, trace};

use crate::pq::cancellation::CancellationToken;
use crate::pq::error::{BadLineNumberKind, BadRangeKind, LexError};
use crate::pq::token::line::{Line, LineMode, LineTerminator};

pub use snapshot::LexerSnapshot;

/// The lexer's held state: every line tokenized so far, plus the locale it
/// was built with (spec.md §3 `LexerState`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerState {
    pub lines: Vec<Line>,
    pub locale: String,
}

impl LexerState {
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    fn mode_end_of(&self, line_number: usize) -> LineMode {
        self.lines
            .get(line_number)
            .map(|line| line.mode_end)
            .unwrap_or(LineMode::Default)
    }

    fn bad_line_number(&self, line_number: usize) -> Option<LexError> {
        if self.lines.is_empty() {
            return Some(LexError::BadLineNumber(BadLineNumberKind::GreaterThanNumLines));
        }
        if line_number >= self.lines.len() {
            Some(LexError::BadLineNumber(BadLineNumberKind::GreaterThanNumLines))
        } else {
            None
        }
    }
}

/// Split `text` on `\n` / `\r\n` / `\r`, preserving which terminator
/// belonged to each line (spec.md §10 supplemented feature 2). A trailing
/// UTF-8 BOM is stripped before splitting.
fn split_lines(text: &str) -> Vec<(String, LineTerminator)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\n' => {
                lines.push((std::mem::take(&mut current), LineTerminator::Lf));
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                    lines.push((std::mem::take(&mut current), LineTerminator::CrLf));
                } else {
                    lines.push((std::mem::take(&mut current), LineTerminator::Cr));
                }
            }
            other => current.push(other),
        }
    }
    lines.push((current, LineTerminator::None));
    lines
}

fn tokenize_from(lines: &mut [Line], start: usize) {
    let mut mode = if start == 0 {
        LineMode::Default
    } else {
        lines[start - 1].mode_end
    };
    for (index, line) in lines.iter_mut().enumerate().skip(start) {
        *line = scan::tokenize_line(index as u32, &line.line_string, line.line_terminator, mode);
        mode = line.mode_end;
    }
}

/// Build a fresh `LexerState` from whole-document text (spec.md §4.1
/// `tryLex`).
pub fn try_lex(
    locale: impl Into<String>,
    text: &str,
    cancellation: &dyn CancellationToken,
) -> Result<LexerState, LexError> {
    let mut lines: Vec<Line> = split_lines(text)
        .into_iter()
        .map(|(line_string, terminator)| Line::new(line_string, terminator, LineMode::Default))
        .collect();
    debug!("lexer: tryLex starting over {} line(s)", lines.len());

    let mut mode = LineMode::Default;
    for (index, line) in lines.iter_mut().enumerate() {
        trace!("lexer: checkpoint at line {index}");
        cancellation_check(cancellation)?;
        *line = scan::tokenize_line(index as u32, &line.line_string, line.line_terminator, mode);
        mode = line.mode_end;
    }

    Ok(LexerState {
        lines,
        locale: locale.into(),
    })
}

/// Polled at the start of every line lexed (spec.md §5) — a fired
/// cancellation propagates as `LexError::Cancelled`, which phase entry
/// points (`pq::testing::snapshot_source` and any other `CommonError`
/// boundary) map onto `CommonError::Cancellation` rather than treating it
/// as an ordinary lex failure.
fn cancellation_check(cancellation: &dyn CancellationToken) -> Result<(), LexError> {
    cancellation.throw_if_cancelled().map_err(LexError::Cancelled)
}

/// Append one new line at the end of the document (spec.md §4.1
/// `tryAppendLine`).
pub fn try_append_line(
    state: &LexerState,
    text: &str,
    terminator: LineTerminator,
) -> Result<LexerState, LexError> {
    let mode_start = state
        .lines
        .last()
        .map(|line| line.mode_end)
        .unwrap_or(LineMode::Default);

    let mut lines = state.lines.clone();
    lines.push(Line::new(text, terminator, mode_start));
    let append_index = lines.len() - 1;
    tokenize_from(&mut lines, append_index);

    Ok(LexerState {
        lines,
        locale: state.locale.clone(),
    })
}

/// Remove `line_number` and re-tokenize everything after it, since the
/// following line now inherits a (possibly different) predecessor mode
/// (spec.md §4.1 `tryDeleteLine`).
pub fn try_delete_line(state: &LexerState, line_number: usize) -> Result<LexerState, LexError> {
    if let Some(err) = state.bad_line_number(line_number) {
        return Err(err);
    }

    let mut lines = state.lines.clone();
    lines.remove(line_number);
    if line_number < lines.len() {
        tokenize_from(&mut lines, line_number);
    }

    Ok(LexerState {
        lines,
        locale: state.locale.clone(),
    })
}

/// Replace the text of `line_number` in place, then re-tokenize forward
/// until the inherited mode re-converges with what it was before the edit
/// (spec.md §4.1 "After a range edit the lexer re-tokenizes... until the
/// inherited lineModeStart converges").
pub fn try_update_line(
    state: &LexerState,
    line_number: usize,
    text: &str,
) -> Result<LexerState, LexError> {
    if let Some(err) = state.bad_line_number(line_number) {
        return Err(err);
    }

    let previous_mode_end_after = state.mode_end_of(line_number);
    let mode_start = state.lines[line_number].mode_start;
    let terminator = state.lines[line_number].line_terminator;

    let mut lines = state.lines.clone();
    lines[line_number] = Line::new(text, terminator, mode_start);
    tokenize_from(&mut lines, line_number);

    reconverge(&mut lines, line_number, previous_mode_end_after);

    Ok(LexerState {
        lines,
        locale: state.locale.clone(),
    })
}

/// Replace a half-open `[start, end)` region, possibly spanning several
/// lines, with `text` — collapsing the affected lines into one edited
/// region, splitting the replacement back into lines, and re-tokenizing
/// forward (spec.md §4.1 `update(range, text)` / `tryUpdateRange`).
pub fn try_update_range(
    state: &LexerState,
    start_line: usize,
    start_code_unit: usize,
    end_line: usize,
    end_code_unit: usize,
    text: &str,
) -> Result<LexerState, LexError> {
    if start_line > end_line {
        return Err(LexError::BadRange(
            BadRangeKind::LineNumberStartGreaterThanLineNumberEnd,
        ));
    }
    if start_line >= state.lines.len() || end_line >= state.lines.len() {
        return Err(LexError::BadRange(BadRangeKind::LineNumberEndGreaterThanNumLines));
    }
    if start_line == end_line && start_code_unit > end_code_unit {
        return Err(LexError::BadRange(BadRangeKind::SameLineStartHigher));
    }

    let start_units: Vec<u16> = state.lines[start_line].line_string.encode_utf16().collect();
    let end_units: Vec<u16> = state.lines[end_line].line_string.encode_utf16().collect();
    if start_code_unit > start_units.len() {
        return Err(LexError::BadRange(BadRangeKind::LineCodeUnitStartGreaterThanLineLength));
    }
    if end_code_unit > end_units.len() {
        return Err(LexError::BadRange(BadRangeKind::LineCodeUnitEndGreaterThanLineLength));
    }

    let prefix = String::from_utf16_lossy(&start_units[..start_code_unit]);
    let suffix = String::from_utf16_lossy(&end_units[end_code_unit..]);
    let replacement_line = format!("{prefix}{text}{suffix}");

    let terminator = state.lines[end_line].line_terminator;
    let mode_start = state.lines[start_line].mode_start;
    let previous_mode_end_after = state.mode_end_of(end_line);

    let mut new_lines: Vec<Line> = split_lines(&replacement_line)
        .into_iter()
        .enumerate()
        .map(|(index, (line_string, split_terminator))| {
            let is_last = index == 0 && split_lines(&replacement_line).len() == 1;
            let line_terminator = if is_last { terminator } else { split_terminator };
            Line::new(line_string, line_terminator, mode_start)
        })
        .collect();
    if let Some(last) = new_lines.last_mut() {
        last.line_terminator = terminator;
    }

    let mut lines = state.lines.clone();
    lines.splice(start_line..=end_line, new_lines.drain(..));

    tokenize_from(&mut lines, start_line);
    reconverge(&mut lines, start_line, previous_mode_end_after);

    Ok(LexerState {
        lines,
        locale: state.locale.clone(),
    })
}

/// After re-tokenizing from `from`, keep tokenizing forward only while the
/// newly-computed mode differs from what the old document had at the same
/// line — once it converges, everything after is unaffected by the edit
/// and is left alone (it's already correct, since it was cloned from
/// `state`).
fn reconverge(lines: &mut [Line], from: usize, mut expected_old_mode_end: LineMode) {
    let mut index = from;
    while index < lines.len() {
        if lines[index].mode_end == expected_old_mode_end {
            break;
        }
        expected_old_mode_end = lines
            .get(index + 1)
            .map(|line| line.mode_end)
            .unwrap_or(LineMode::Default);
        index += 1;
        if index >= lines.len() {
            break;
        }
        let mode = lines[index - 1].mode_end;
        let retokenized = scan::tokenize_line(
            index as u32,
            &lines[index].line_string,
            lines[index].line_terminator,
            mode,
        );
        lines[index] = retokenized;
    }
}

/// Produce a flat, comment-stripped token stream from a `LexerState`
/// (spec.md §4.2 `trySnapshot`).
pub fn try_snapshot(state: &LexerState) -> Result<LexerSnapshot, LexError> {
    snapshot::build(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pq::cancellation::NeverCancelled;

    #[test]
    fn splits_mixed_line_terminators() {
        let state = try_lex("en-US", "a\nb\r\nc\rd", &NeverCancelled).unwrap();
        assert_eq!(state.lines.len(), 4);
        assert_eq!(state.lines[0].line_terminator, LineTerminator::Lf);
        assert_eq!(state.lines[1].line_terminator, LineTerminator::CrLf);
        assert_eq!(state.lines[2].line_terminator, LineTerminator::Cr);
        assert_eq!(state.lines[3].line_terminator, LineTerminator::None);
    }

    #[test]
    fn strips_leading_bom() {
        let state = try_lex("en-US", "\u{feff}let x = 1 in x", &NeverCancelled).unwrap();
        assert!(!state.lines[0].line_string.starts_with('\u{feff}'));
    }

    #[test]
    fn mode_start_matches_predecessor_mode_end_across_multiline_comment() {
        let state = try_lex("en-US", "/* start\nstill inside\nend */ x", &NeverCancelled).unwrap();
        for index in 1..state.lines.len() {
            assert_eq!(state.lines[index].mode_start, state.lines[index - 1].mode_end);
        }
        assert_eq!(state.lines[0].mode_end, LineMode::Comment);
        assert_eq!(state.lines[1].mode_end, LineMode::Comment);
        assert_eq!(state.lines[2].mode_end, LineMode::Default);
    }

    #[test]
    fn delete_line_retokenizes_forward() {
        let state = try_lex("en-US", "/*\ncomment\n*/\nx", &NeverCancelled).unwrap();
        let updated = try_delete_line(&state, 2).unwrap();
        // Deleting the closing `*/` line means line 2 ("x") now inherits
        // Comment mode and never escapes it.
        assert_eq!(updated.lines.len(), 3);
        assert_eq!(updated.lines[2].mode_start, LineMode::Comment);
    }

    #[test]
    fn update_line_bad_line_number_is_reported() {
        let state = try_lex("en-US", "x", &NeverCancelled).unwrap();
        let result = try_update_line(&state, 5, "y");
        assert!(matches!(
            result,
            Err(LexError::BadLineNumber(BadLineNumberKind::GreaterThanNumLines))
        ));
    }

    #[test]
    fn update_range_same_line_start_higher_is_bad_range() {
        let state = try_lex("en-US", "abcdef", &NeverCancelled).unwrap();
        let result = try_update_range(&state, 0, 4, 0, 1, "z");
        assert!(matches!(
            result,
            Err(LexError::BadRange(BadRangeKind::SameLineStartHigher))
        ));
    }

    #[test]
    fn update_range_matching_try_lex_on_full_range() {
        let state = try_lex("en-US", "let x = 1 in x", &NeverCancelled).unwrap();
        let full_len = state.lines[0].len_code_units() as usize;
        let updated = try_update_range(&state, 0, 0, 0, full_len, "let y = 2 in y").unwrap();
        let reference = try_lex("en-US", "let y = 2 in y", &NeverCancelled).unwrap();
        assert_eq!(updated.lines[0].tokens.len(), reference.lines[0].tokens.len());
    }
}
