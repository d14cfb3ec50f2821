//! Small CST-walking helpers shared by every inspection pass. Kept here
//! rather than duplicated per module since `scope`, `identifier`, and
//! `invoke_expression` all need the same "read a leaf's text" and
//! "find the Nth csv item" operations.

use pq_parser::ast::{LeafPayload, NodeKind};
use pq_parser::node_id_map::{Collection, XorNode};
use pq_parser::position::SnapshotPosition;

/// The identifier text a leaf node carries, with `@`-prefix preserved for
/// `Identifier` leaves — `None` for anything else, including a still-open
/// context node.
pub(crate) fn leaf_literal(node: &XorNode<'_>) -> Option<String> {
    let XorNode::Ast(ast) = node else {
        return None;
    };
    match ast.leaf.as_ref()? {
        LeafPayload::Identifier { literal, has_at_prefix } => {
            Some(if *has_at_prefix { format!("@{literal}") } else { literal.clone() })
        }
        LeafPayload::GeneralizedIdentifier { literal } => Some(literal.clone()),
        _ => None,
    }
}

pub(crate) fn leaf_literal_at(collection: &Collection, id: u32) -> Option<(String, SnapshotPosition)> {
    let node = collection.get(id)?;
    let start = node.token_start()?;
    leaf_literal(&node).map(|literal| (literal, start))
}

/// The first direct child of `parent_id` with kind `kind`, if any — used
/// where a production's fixed slot is sometimes preceded by an optional
/// one (e.g. `Parameter`'s leading `optional` constant).
pub(crate) fn find_child_of_kind(collection: &Collection, parent_id: u32, kind: NodeKind) -> Option<u32> {
    collection
        .child_ids(parent_id)
        .iter()
        .copied()
        .find(|&id| collection.get(id).map(|node| node.kind()) == Some(kind))
}

/// The item (first child) of each `Csv` under an `ArrayWrapper`, in order.
/// A `Csv` that never adopted an item (a dangling trailing comma before the
/// closing token) is silently skipped — right for scope contribution, which
/// has no identifier to bind for an empty slot, but wrong for *counting*
/// slots; use `csv_slot_ids` for that.
pub(crate) fn csv_item_ids(collection: &Collection, array_wrapper_id: u32) -> Vec<u32> {
    collection
        .child_ids(array_wrapper_id)
        .iter()
        .filter_map(|&csv_id| collection.child_ids(csv_id).first().copied())
        .collect()
}

/// Every `Csv` child of `array_wrapper_id`, in order — including one still
/// open with no item adopted yet. `invoke_expression::maybe_argument_position`
/// needs every slot counted, since a dangling trailing comma (`Foo(a,|)`)
/// still opens (and the cursor can sit in) an argument slot even though it
/// has no child to show for it.
pub(crate) fn csv_slot_ids(collection: &Collection, array_wrapper_id: u32) -> Vec<u32> {
    collection.child_ids(array_wrapper_id).to_vec()
}
