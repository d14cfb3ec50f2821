//! `ActiveNode` — spec.md §4.5(a): the innermost node enclosing a cursor
//! position, climbed to the document root, plus a classification of how
//! the cursor relates to the node directly beneath it.
//!
//! `ContextNode` carries no completed `token_range` (it is still open), so
//! the containment search below only ever walks completed `AstNode`s. When
//! the parse failed mid-production the innermost node the cursor could be
//! "inside" is instead whichever context node was still on the parse stack
//! when the error was raised — tracked here as the context node with the
//! highest id, since ids are handed out in stack order and a recoverable,
//! single-threaded descent only ever has one live chain of open nodes.

use log::trace;

use pq_parser::cancellation::CancellationToken;
use pq_parser::error::CancellationError;
use pq_parser::node_id_map::{Collection, XorNode};
use pq_parser::position::SnapshotPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    /// The cursor lies strictly inside a completed leaf token.
    Default,
    /// The cursor sits at or past the end of the innermost completed leaf —
    /// e.g. the space after `true` in `try true ␣|`.
    ShiftedRight,
    /// The innermost enclosing node never closed.
    ContextNode,
}

/// Ancestry is innermost-first, root-last — the order `Collection::ancestry`
/// already returns.
#[derive(Debug, Clone)]
pub struct ActiveNode<'a> {
    pub position: SnapshotPosition,
    pub ancestry: Vec<XorNode<'a>>,
    pub leaf_kind: LeafKind,
}

impl<'a> ActiveNode<'a> {
    pub fn innermost(&self) -> Option<&XorNode<'a>> {
        self.ancestry.first()
    }

    pub fn ancestor_kinds(&self) -> impl Iterator<Item = pq_parser::ast::NodeKind> + '_ {
        self.ancestry.iter().map(|node| node.kind())
    }
}

/// Compute the `ActiveNode` for `position`, or `None` if `collection` is
/// empty (nothing was ever started). Polled at the start of every ancestor
/// visited while descending the tree (spec.md §5) — a fired cancellation
/// aborts the descent and surfaces as `Err`.
pub fn compute<'a>(
    collection: &'a Collection,
    position: SnapshotPosition,
    cancellation: &dyn CancellationToken,
) -> Result<Option<ActiveNode<'a>>, CancellationError> {
    if let Some(open_id) = deepest_open_context_id(collection) {
        let ancestry = collection.ancestry(open_id);
        return Ok(Some(ActiveNode {
            position,
            ancestry,
            leaf_kind: LeafKind::ContextNode,
        }));
    }

    let Some(root_id) = collection.root_id() else {
        return Ok(None);
    };
    let innermost_id = deepest_containing(collection, root_id, position, cancellation)?.unwrap_or(root_id);
    let ancestry = collection.ancestry(innermost_id);
    let leaf_kind = classify(collection, innermost_id, position);
    Ok(Some(ActiveNode {
        position,
        ancestry,
        leaf_kind,
    }))
}

fn deepest_open_context_id(collection: &Collection) -> Option<u32> {
    collection.context_nodes().map(|node| node.id).max()
}

fn deepest_containing(
    collection: &Collection,
    id: u32,
    position: SnapshotPosition,
    cancellation: &dyn CancellationToken,
) -> Result<Option<u32>, CancellationError> {
    trace!("inspection: ancestor checkpoint at node {id}");
    cancellation.throw_if_cancelled()?;
    let Some(node) = collection.get(id) else {
        return Ok(None);
    };
    let Some(range) = node.as_ast().map(|n| n.token_range) else {
        return Ok(None);
    };
    if !range.contains_inclusive(position) {
        return Ok(None);
    }
    for &child_id in collection.child_ids(id) {
        if let Some(found) = deepest_containing(collection, child_id, position, cancellation)? {
            return Ok(Some(found));
        }
    }
    Ok(Some(id))
}

fn classify(collection: &Collection, id: u32, position: SnapshotPosition) -> LeafKind {
    let Some(XorNode::Ast(node)) = collection.get(id) else {
        return LeafKind::ContextNode;
    };
    if collection.is_leaf(id) && position == node.token_range.end {
        LeafKind::ShiftedRight
    } else {
        LeafKind::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pq_parser::ast::{AstNode, NodeKind};
    use pq_parser::cancellation::NeverCancelled;
    use pq_parser::context::ContextNode;
    use pq_parser::position::TokenRange;

    fn pos(unit: u32) -> SnapshotPosition {
        SnapshotPosition::new(0, unit, unit)
    }

    #[test]
    fn finds_innermost_leaf_by_containment() {
        let mut collection = Collection::new();
        let outer_range = TokenRange::new(pos(0), pos(10));
        let inner_range = TokenRange::new(pos(2), pos(5));

        collection.end_ast(0, AstNode::new(0, NodeKind::LetExpression, outer_range, None));
        collection.end_ast(1, AstNode::new(1, NodeKind::Identifier, inner_range, Some(0)));
        collection.set_child_ids(0, vec![1]);
        collection.set_root_id(0);

        let active = compute(&collection, pos(3), &NeverCancelled).unwrap().unwrap();
        assert_eq!(active.innermost().unwrap().id(), 1);
        assert_eq!(active.leaf_kind, LeafKind::Default);
    }

    #[test]
    fn classifies_shifted_right_after_a_leaf() {
        let mut collection = Collection::new();
        let range = TokenRange::new(pos(0), pos(4));
        collection.end_ast(0, AstNode::new(0, NodeKind::LiteralExpression, range, None));
        collection.set_root_id(0);

        let active = compute(&collection, pos(4), &NeverCancelled).unwrap().unwrap();
        assert_eq!(active.leaf_kind, LeafKind::ShiftedRight);
    }

    #[test]
    fn prefers_the_deepest_open_context_node() {
        let mut collection = Collection::new();
        collection.insert_context_node(ContextNode {
            id: 0,
            kind: NodeKind::LetExpression,
            attribute_counter: 1,
            parent_id: None,
            children_ids: vec![1],
            token_start: Some(pos(0)),
        });
        collection.insert_context_node(ContextNode {
            id: 1,
            kind: NodeKind::IdentifierPairedExpression,
            attribute_counter: 0,
            parent_id: Some(0),
            children_ids: vec![],
            token_start: Some(pos(4)),
        });

        let active = compute(&collection, pos(4), &NeverCancelled).unwrap().unwrap();
        assert_eq!(active.leaf_kind, LeafKind::ContextNode);
        assert_eq!(active.innermost().unwrap().id(), 1);
    }
}
