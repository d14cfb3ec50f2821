//! The parser: two strategies — `RecursiveDescent` and `Combinatorial` —
//! sharing one token cursor / `ParseContext` interface (spec.md §4.4, §9
//! Design Notes "Two parsers, one interface").

pub mod combinatorial;
pub mod disambiguation;
pub mod recursive_descent;
pub mod shared;
pub mod state;

use crate::pq::cancellation::CancellationToken;
use crate::pq::error::{CommonError, ParseError, ParseErrorKind};
use crate::pq::lexer::snapshot::{LexerSnapshot, Token};
use crate::pq::node_id_map::Collection;

pub use combinatorial::CombinatorialParser;
pub use recursive_descent::RecursiveDescentParser;
use state::ParserState;

/// Which concrete grammar a `read` call enters through — spec.md §6
/// `parserEntryPoint` ("e.g. parameter list").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserEntryPoint {
    /// A full document: a `Section` or a bare `Expression`.
    Document,
    ParameterSpecificationList,
}

/// `parser: CombinatorialParser | RecursiveDescentParser` — spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    RecursiveDescent,
    Combinatorial,
}

/// Both parser strategies implement the same interface over the shared
/// `ParserState`: `read_expression` is the only piece that differs in
/// *how* it's written (cascade vs. precedence-climbing loop); every other
/// production lives once, in `shared`, and calls back into whichever
/// strategy is active for nested expressions.
pub trait Strategy {
    fn read_expression(&self, state: &mut ParserState) -> Result<u32, ParseError>;
}

pub struct ParseSuccess {
    pub root_id: u32,
    pub collection: Collection,
}

#[derive(Debug)]
pub enum ParseFailure {
    Common(CommonError),
    Parse(ParseError),
}

pub struct ParseFailureOutcome {
    pub failure: ParseFailure,
    pub collection: Collection,
}

/// `TriedParse` — spec.md §4.4 `read(state) -> TriedParse`. The `Err` arm
/// always carries the partial `Collection` built so far (spec.md §4.4
/// "Error recovery" / §7 "Parse errors always preserve context").
pub type TriedParse = Result<ParseSuccess, ParseFailureOutcome>;

fn strategy_for(kind: ParserKind) -> Box<dyn Strategy> {
    match kind {
        ParserKind::RecursiveDescent => Box::new(RecursiveDescentParser),
        ParserKind::Combinatorial => Box::new(CombinatorialParser),
    }
}

/// `Parser.tryRead(settings, lexerSnapshot) -> TriedParse` — spec.md §6.
pub fn try_read(
    snapshot: &LexerSnapshot,
    kind: ParserKind,
    entry_point: ParserEntryPoint,
    cancellation: &dyn CancellationToken,
) -> TriedParse {
    let strategy = strategy_for(kind);
    let tokens: Vec<Token> = snapshot.tokens.clone();
    let mut state = ParserState::new(tokens, cancellation);

    let result = (|| -> Result<u32, ParseError> {
        state
            .check_cancellation()
            .map_err(|err| state.raise(ParseErrorKind::Cancelled(err)))?;
        let root_id = match entry_point {
            ParserEntryPoint::Document => shared::parse_document(&mut state, strategy.as_ref())?,
            ParserEntryPoint::ParameterSpecificationList => {
                shared::parse_parameter_list(&mut state, strategy.as_ref())?
            }
        };
        if !state.is_at_end() {
            let leftover_literal = state.current_token().map(|token| token.literal.clone()).unwrap_or_default();
            return Err(state.raise(ParseErrorKind::UnusedTokensRemain { leftover_literal }));
        }
        Ok(root_id)
    })();

    match result {
        Ok(root_id) => Ok(ParseSuccess {
            root_id,
            collection: state.into_collection(),
        }),
        Err(error) => {
            let failure = match error.kind {
                ParseErrorKind::Cancelled(inner) => ParseFailure::Common(CommonError::Cancellation(inner)),
                _ => ParseFailure::Parse(error),
            };
            Err(ParseFailureOutcome {
                failure,
                collection: state.into_collection(),
            })
        }
    }
}

/// The specialized `readParameterSpecificationList` entry point named in
/// spec.md §4.4, exposed directly for callers that only want to parse an
/// isolated sub-grammar.
pub fn try_read_parameter_specification_list(
    snapshot: &LexerSnapshot,
    kind: ParserKind,
    cancellation: &dyn CancellationToken,
) -> TriedParse {
    try_read(snapshot, kind, ParserEntryPoint::ParameterSpecificationList, cancellation)
}

