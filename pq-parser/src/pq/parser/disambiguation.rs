//! Bounded-lookahead disambiguation — spec.md §4.4 "Ambiguous prefixes...
//! are resolved by a bounded lookahead that starts a context, attempts the
//! more specific production, and on failure restores the context and
//! retries."

use crate::pq::error::ParseError;

use super::state::ParserState;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pq::ast::NodeKind;
    use crate::pq::cancellation::NeverCancelled;
    use crate::pq::error::ParseErrorKind;
    use crate::pq::lexer::snapshot::Token;
    use crate::pq::position::{SnapshotPosition, TokenRange};
    use crate::pq::token::TokenKind;

    fn token(kind: TokenKind, literal: &str, start: u32, end: u32) -> Token {
        Token {
            kind,
            literal: literal.to_string(),
            range: TokenRange::new(SnapshotPosition::new(0, start, start), SnapshotPosition::new(0, end, end)),
        }
    }

    #[test]
    fn try_attempt_restores_the_token_cursor_on_failure() {
        let tokens = vec![token(TokenKind::Identifier, "x", 0, 1)];
        let mut state = ParserState::new(tokens, &NeverCancelled);

        let result: Result<u32, ParseError> = try_attempt(&mut state, |state| {
            state.advance()?;
            Err(state.raise(ParseErrorKind::ExpectedGeneralizedIdentifier))
        });

        assert!(result.is_err());
        assert_eq!(state.current_kind(), TokenKind::Identifier);
    }

    #[test]
    fn either_restores_tokens_consumed_by_a_failed_first_attempt() {
        let tokens = vec![token(TokenKind::Identifier, "x", 0, 1)];
        let mut state = ParserState::new(tokens, &NeverCancelled);

        let result: Result<u32, ParseError> = either(
            &mut state,
            |state| {
                // Consumes "x" before discovering the expected brace is missing.
                state.advance()?;
                Err(state.raise(ParseErrorKind::ExpectedTokenKind {
                    expected: TokenKind::LeftBrace,
                }))
            },
            |state| {
                // If the first attempt's consumption weren't rolled back, this
                // would see end-of-input instead.
                assert_eq!(state.current_kind(), TokenKind::Identifier);
                let builder = state.start_node(NodeKind::IdentifierExpression);
                state.advance()?;
                Ok(state.finish_node(builder))
            },
        );

        assert!(result.is_ok());
        assert!(state.is_at_end());
    }
}

/// Try `attempt`; on failure, restore every allocation it made (tokens
/// consumed, context nodes started, ast nodes promoted) and report the
/// failure so the caller can fall back to a less specific production.
pub fn try_attempt<T>(
    state: &mut ParserState,
    attempt: impl FnOnce(&mut ParserState) -> Result<T, ParseError>,
) -> Result<T, ParseError> {
    let checkpoint = state.checkpoint();
    match attempt(state) {
        Ok(value) => Ok(value),
        Err(error) => {
            state.restore(checkpoint);
            Err(error)
        }
    }
}

/// Run `first`; if it fails, restore and run `second` from the same
/// starting point. Used for the two-way prefixes named in spec.md §4.4:
/// `(x, y) => …` vs `(expr)`, and `[…]` record vs. field selector/
/// projection at a primary position.
pub fn either<T>(
    state: &mut ParserState,
    first: impl FnOnce(&mut ParserState) -> Result<T, ParseError>,
    second: impl FnOnce(&mut ParserState) -> Result<T, ParseError>,
) -> Result<T, ParseError> {
    match try_attempt(state, first) {
        Ok(value) => Ok(value),
        Err(_) => second(state),
    }
}
