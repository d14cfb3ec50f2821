//! Test-only helper: a one-shot `source, code_unit -> (Collection, position)`
//! pipeline, so every inspection module's tests can get straight to the
//! assertion instead of re-wiring lex/snapshot/parse by hand. Mirrors
//! `pq_parser::testing::parse_source`, extended to also resolve the cursor
//! position against the resulting snapshot.

use pq_parser::cancellation::NeverCancelled;
use pq_parser::error::ParseError;
use pq_parser::node_id_map::Collection;
use pq_parser::parser::{try_read, ParseFailure, ParserEntryPoint, ParserKind};
use pq_parser::position::SnapshotPosition;
use pq_parser::testing::snapshot_source;

/// Lex, snapshot, and parse `source` with the recursive-descent strategy,
/// then resolve `code_unit` (a byte-oriented offset into `source`, which is
/// ASCII in every fixture this helper is used with) to a `SnapshotPosition`.
/// Returns the `Collection` from whichever side of `TriedParse` came back —
/// inspection must work over a partial tree just as well as a complete one.
pub fn collection_and_position(source: &str, code_unit: u32) -> (Collection, SnapshotPosition) {
    let snapshot = snapshot_source(source, &NeverCancelled).expect("fixture source lexes cleanly");
    let position = snapshot
        .position_at(code_unit)
        .unwrap_or_else(|| panic!("{code_unit} is out of range for {source:?}"));
    let collection = match try_read(&snapshot, ParserKind::RecursiveDescent, ParserEntryPoint::Document, &NeverCancelled) {
        Ok(success) => success.collection,
        Err(outcome) => outcome.collection,
    };
    (collection, position)
}

/// Like `collection_and_position`, but also keeps the `ParseError` a failed
/// parse produced — `autocomplete::compute` needs the real error, not just
/// the collection, since a dangling optional trailer only shows up there.
pub fn collection_position_and_error(source: &str, code_unit: u32) -> (Collection, SnapshotPosition, Option<ParseError>) {
    let snapshot = snapshot_source(source, &NeverCancelled).expect("fixture source lexes cleanly");
    let position = snapshot
        .position_at(code_unit)
        .unwrap_or_else(|| panic!("{code_unit} is out of range for {source:?}"));
    match try_read(&snapshot, ParserKind::RecursiveDescent, ParserEntryPoint::Document, &NeverCancelled) {
        Ok(success) => (success.collection, position, None),
        Err(outcome) => {
            let error = match outcome.failure {
                ParseFailure::Parse(error) => Some(error),
                ParseFailure::Common(_) => None,
            };
            (outcome.collection, position, error)
        }
    }
}
