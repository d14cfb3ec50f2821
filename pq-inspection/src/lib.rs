//! # pq-inspection
//!
//! Position-driven analysis over a `pq-parser` CST: given a cursor and the
//! `NodeIdMap::Collection` a lex/parse pass produced (complete or partial —
//! a `ParseError` always preserves its in-flight context), answer "what
//! scope is visible here", "what identifier is the cursor on, and where was
//! it defined", "which invocation (if any) encloses the cursor, and which
//! argument", and "what could legally be typed next".
//!
//! Each answer is its own independent pass over the same `ActiveNode`
//! ancestry (spec.md §4.5): `scope`, `identifier`, `invoke_expression`, and
//! `autocomplete` don't depend on one another, only on `active_node`.

pub mod active_node;
pub mod autocomplete;
pub mod identifier;
pub mod invoke_expression;
pub mod scope;
mod support;
pub mod type_utils;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

use log::trace;
use pq_parser::cancellation::CancellationToken;
use pq_parser::error::{CommonError, ParseError};
use pq_parser::node_id_map::Collection;
use pq_parser::position::SnapshotPosition;

pub use active_node::{ActiveNode, LeafKind};
pub use autocomplete::Autocomplete;
pub use identifier::IdentifierUnderPosition;
pub use invoke_expression::InvokeExpressionInspection;
pub use scope::{Scope, ScopeItem};

/// The composite result of inspecting `position` against `collection` —
/// spec.md §4.5's four independent passes bundled into one value, plus the
/// `ActiveNode` they were all computed from.
#[derive(Debug)]
pub struct Inspected<'a> {
    pub active_node: ActiveNode<'a>,
    pub scope: Scope,
    pub identifier_under_position: Option<IdentifierUnderPosition>,
    pub invoke_expression: Option<InvokeExpressionInspection>,
    pub autocomplete: Autocomplete,
}

/// Nothing was started at all — an empty document, or a position the
/// collection has no node for.
#[derive(Debug)]
pub struct NothingToInspect;

/// Everything `try_from` can fail with: either there was nothing to
/// inspect, or the cancellation token fired partway through the traversal
/// (spec.md §5) and the `CommonError` it surfaced is handed back rather
/// than swallowed.
#[derive(Debug)]
pub enum InspectionFailure {
    NothingToInspect,
    Common(CommonError),
}

pub type TriedInspection<'a> = Result<Inspected<'a>, InspectionFailure>;

/// `Inspection.tryFrom(settings, position, nodeIdMapCollection, leafNodeIds, maybeParseError)`
/// — spec.md §4.5's entry point, §6's `settings` carrying the
/// `cancellationToken`. `leaf_node_ids` is read off `collection` itself
/// (`Collection::leaf_node_ids`) rather than threaded separately, since the
/// two are never out of sync in this implementation.
pub fn try_from<'a>(
    position: SnapshotPosition,
    collection: &'a Collection,
    maybe_parse_error: Option<&ParseError>,
    cancellation: &dyn CancellationToken,
) -> TriedInspection<'a> {
    trace!("inspection: resolving active node at {position}");
    let active_node = active_node::compute(collection, position, cancellation)
        .map_err(|err| InspectionFailure::Common(CommonError::Cancellation(err)))?
        .ok_or(InspectionFailure::NothingToInspect)?;
    trace!("inspection: active node is {:?} (leaf_kind {:?})", active_node.innermost().map(|n| n.kind()), active_node.leaf_kind);
    let scope = scope::compute(collection, &active_node, cancellation)
        .map_err(|err| InspectionFailure::Common(CommonError::Cancellation(err)))?;
    let identifier_under_position = identifier::compute(collection, &active_node, &scope);
    let invoke_expression = invoke_expression::compute(collection, &active_node, position);
    let autocomplete = autocomplete::compute(collection, &active_node, maybe_parse_error);

    Ok(Inspected {
        active_node,
        scope,
        identifier_under_position,
        invoke_expression,
        autocomplete,
    })
}
