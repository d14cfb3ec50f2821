//! `InvokeExpression` inspection — spec.md §4.5(d): the first enclosing
//! call, its callee name if it's a bare identifier, and which argument (if
//! any) the cursor sits inside.

use pq_parser::ast::NodeKind;
use pq_parser::node_id_map::Collection;
use pq_parser::position::SnapshotPosition;

use crate::active_node::ActiveNode;
use crate::support::{csv_slot_ids, find_child_of_kind, leaf_literal_at};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentPosition {
    pub num_arguments: usize,
    pub position_argument_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeExpressionInspection {
    pub invoke_expression_node_id: u32,
    pub maybe_name: Option<String>,
    pub maybe_arguments: Option<ArgumentPosition>,
}

pub fn compute(collection: &Collection, active: &ActiveNode<'_>, position: SnapshotPosition) -> Option<InvokeExpressionInspection> {
    let invoke_id = active
        .ancestry
        .iter()
        .find(|node| node.kind() == NodeKind::InvokeExpression)?
        .id();

    let maybe_name = maybe_callee_name(collection, invoke_id);
    let maybe_arguments = maybe_argument_position(collection, invoke_id, position);

    Some(InvokeExpressionInspection {
        invoke_expression_node_id: invoke_id,
        maybe_name,
        maybe_arguments,
    })
}

/// The sibling immediately before `invoke_id` in its `RecursivePrimaryExpression`
/// parent's child list — the head expression when `invoke_id` is the first
/// suffix, or a prior suffix (`x[a](…)`) otherwise. Only a bare
/// `IdentifierExpression` counts as a name.
fn maybe_callee_name(collection: &Collection, invoke_id: u32) -> Option<String> {
    let parent_id = collection.parent_id(invoke_id)?;
    let siblings = collection.child_ids(parent_id);
    let index = siblings.iter().position(|&id| id == invoke_id)?;
    let callee_id = *siblings.get(index.checked_sub(1)?)?;
    if collection.get(callee_id)?.kind() != NodeKind::IdentifierExpression {
        return None;
    }
    let identifier_id = find_child_of_kind(collection, callee_id, NodeKind::Identifier)?;
    Some(leaf_literal_at(collection, identifier_id)?.0)
}

fn maybe_argument_position(collection: &Collection, invoke_id: u32, position: SnapshotPosition) -> Option<ArgumentPosition> {
    let array_wrapper_id = find_child_of_kind(collection, invoke_id, NodeKind::ArrayWrapper)?;
    // Every `Csv` slot counts, including a still-open one with no item
    // adopted yet (a dangling trailing comma before the closing token).
    let argument_ids = csv_slot_ids(collection, array_wrapper_id);
    if argument_ids.is_empty() {
        // Cursor inside `()` with no arguments yet still counts as argument 0.
        return Some(ArgumentPosition {
            num_arguments: 0,
            position_argument_index: 0,
        });
    }

    let num_arguments = argument_ids.len();
    let mut position_argument_index = 0;
    for (index, &argument_id) in argument_ids.iter().enumerate() {
        let Some(start) = collection.get(argument_id).and_then(|node| node.token_start()) else {
            continue;
        };
        if position >= start {
            position_argument_index = index;
        }
    }
    Some(ArgumentPosition {
        num_arguments,
        position_argument_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pq_parser::cancellation::NeverCancelled;

    use crate::active_node;
    use crate::testing::collection_and_position;

    fn invoke_at(source: &str, code_unit: u32) -> Option<InvokeExpressionInspection> {
        let (collection, position) = collection_and_position(source, code_unit);
        let active = active_node::compute(&collection, position, &NeverCancelled).unwrap().unwrap();
        compute(&collection, &active, position)
    }

    #[test]
    fn names_a_bare_identifier_callee() {
        let source = "foo(1, 2)";
        let result = invoke_at(source, 4).unwrap();
        assert_eq!(result.maybe_name.as_deref(), Some("foo"));
    }

    #[test]
    fn reports_second_argument_index() {
        let source = "foo(1, 2)";
        let cursor = source.find('2').unwrap() as u32;
        let result = invoke_at(source, cursor).unwrap();
        let args = result.maybe_arguments.unwrap();
        assert_eq!(args.num_arguments, 2);
        assert_eq!(args.position_argument_index, 1);
    }

    #[test]
    fn no_name_for_a_non_identifier_callee() {
        let source = "(each _)(1)";
        let cursor = source.find('1').unwrap() as u32;
        let result = invoke_at(source, cursor).unwrap();
        assert_eq!(result.maybe_name, None);
    }

    #[test]
    fn absent_outside_any_invocation() {
        assert!(invoke_at("1 + 2", 1).is_none());
    }

    #[test]
    fn dangling_trailing_comma_still_counts_its_empty_slot() {
        let source = "Foo(a,)";
        let cursor = source.find(')').unwrap() as u32;
        let result = invoke_at(source, cursor).unwrap();
        let args = result.maybe_arguments.unwrap();
        assert_eq!(args.num_arguments, 2);
        assert_eq!(args.position_argument_index, 1);
    }
}
