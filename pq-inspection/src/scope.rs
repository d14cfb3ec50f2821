//! `Scope` — spec.md §4.5(b): a top-down walk of `ActiveNode`'s ancestry
//! accumulating the identifier bindings visible at the cursor.
//!
//! Built from an `indexmap::IndexMap` rather than a `HashMap` so lookups by
//! name stay O(1) while iteration still reflects the order bindings were
//! discovered in — callers that want "nearest enclosing binding wins" or a
//! stable listing for autocomplete both need that order preserved.

use indexmap::IndexMap;

use pq_parser::ast::NodeKind;
use pq_parser::cancellation::CancellationToken;
use pq_parser::error::CancellationError;
use pq_parser::node_id_map::{Collection, XorNode};
use pq_parser::position::SnapshotPosition;

use crate::active_node::ActiveNode;
use crate::support::{csv_item_ids, find_child_of_kind, leaf_literal_at};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeItem {
    pub identifier: String,
    pub definition_node_id: u32,
    pub definition_position_start: SnapshotPosition,
}

pub type Scope = IndexMap<String, ScopeItem>;

/// Walk `active`'s ancestry outermost-to-innermost, contributing bindings
/// as each scope-introducing node is entered. The cursor's own
/// `IdentifierExpression` (spec.md §4.5(b)) is contributed first, ahead of
/// every ancestor's bindings, so it leads the iteration order rather than
/// trailing it. Polled at the start of every ancestor visited (spec.md §5).
pub fn compute(
    collection: &Collection,
    active: &ActiveNode<'_>,
    cancellation: &dyn CancellationToken,
) -> Result<Scope, CancellationError> {
    let mut scope = Scope::new();
    let ancestry = &active.ancestry;
    contribute_cursor_identifier(collection, ancestry, &mut scope);
    for i in (0..ancestry.len()).rev() {
        cancellation.throw_if_cancelled()?;
        contribute(collection, ancestry, i, &mut scope);
    }
    Ok(scope)
}

/// The cursor's own identifier, if it sits on (or shifted-right past) an
/// `IdentifierExpression` — e.g. `x` in `"let a = 1, b = 2 in x|"`, which
/// must appear in `scope` alongside whatever `a`/`b` bindings are visible.
fn contribute_cursor_identifier(collection: &Collection, ancestry: &[XorNode<'_>], scope: &mut Scope) {
    let Some(innermost) = ancestry.first() else {
        return;
    };
    let expression_id = match innermost.kind() {
        NodeKind::IdentifierExpression => Some(innermost.id()),
        NodeKind::Identifier if ancestry.get(1).map(|parent| parent.kind()) == Some(NodeKind::IdentifierExpression) => {
            Some(ancestry[1].id())
        }
        _ => None,
    };
    let Some(expression_id) = expression_id else {
        return;
    };
    let Some(identifier_id) = find_child_of_kind(collection, expression_id, NodeKind::Identifier) else {
        return;
    };
    if let Some((literal, start)) = leaf_literal_at(collection, identifier_id) {
        insert(scope, literal, expression_id, start);
    }
}

fn contribute(collection: &Collection, ancestry: &[XorNode<'_>], i: usize, scope: &mut Scope) {
    match ancestry[i].kind() {
        NodeKind::EachExpression => contribute_each(&ancestry[i], scope),
        NodeKind::FunctionExpression => contribute_function(collection, &ancestry[i], scope),
        NodeKind::LetExpression => contribute_let(collection, ancestry, i, scope),
        NodeKind::RecordExpression | NodeKind::RecordLiteral => contribute_record(collection, ancestry, i, scope),
        NodeKind::Section => contribute_section(collection, ancestry, i, scope),
        _ => {}
    }
}

fn insert(scope: &mut Scope, identifier: String, definition_node_id: u32, definition_position_start: SnapshotPosition) {
    scope.insert(
        identifier.clone(),
        ScopeItem {
            identifier,
            definition_node_id,
            definition_position_start,
        },
    );
}

fn contribute_each(node: &XorNode<'_>, scope: &mut Scope) {
    if let Some(start) = node.token_start() {
        insert(scope, "_".to_string(), node.id(), start);
    }
}

fn contribute_function(collection: &Collection, node: &XorNode<'_>, scope: &mut Scope) {
    let Some(parameter_list_id) = find_child_of_kind(collection, node.id(), NodeKind::ParameterList) else {
        return;
    };
    let Some(array_wrapper_id) = find_child_of_kind(collection, parameter_list_id, NodeKind::ArrayWrapper) else {
        return;
    };
    for parameter_id in csv_item_ids(collection, array_wrapper_id) {
        let Some(identifier_id) = find_child_of_kind(collection, parameter_id, NodeKind::Identifier) else {
            continue;
        };
        if let Some((literal, start)) = leaf_literal_at(collection, identifier_id) {
            insert(scope, literal, parameter_id, start);
        }
    }
}

/// `LetExpression` bindings are visible to every binding after them and to
/// the `in` body, never to themselves or to bindings before them in the
/// list — so a binding N positions before the one under the cursor stops
/// the walk right there.
fn contribute_let(collection: &Collection, ancestry: &[XorNode<'_>], i: usize, scope: &mut Scope) {
    let node_id = ancestry[i].id();
    let Some(bindings_wrapper_id) = find_child_of_kind(collection, node_id, NodeKind::ArrayWrapper) else {
        return;
    };
    let binding_ids = csv_item_ids(collection, bindings_wrapper_id);
    let cursor_binding_id = cursor_child_three_deep(ancestry, i, bindings_wrapper_id);

    for binding_id in binding_ids {
        if Some(binding_id) == cursor_binding_id {
            break;
        }
        add_named_binding(collection, binding_id, scope);
    }
}

/// `RecordExpression`/`RecordLiteral` fields are all visible to each other
/// except a field's own value excludes its own name — so unlike `let`,
/// fields *after* the cursor's field remain visible too.
fn contribute_record(collection: &Collection, ancestry: &[XorNode<'_>], i: usize, scope: &mut Scope) {
    let node_id = ancestry[i].id();
    let Some(fields_wrapper_id) = find_child_of_kind(collection, node_id, NodeKind::ArrayWrapper) else {
        return;
    };
    let field_ids = csv_item_ids(collection, fields_wrapper_id);
    let cursor_field_id = cursor_child_three_deep(ancestry, i, fields_wrapper_id);

    for field_id in field_ids {
        if Some(field_id) == cursor_field_id {
            continue;
        }
        add_named_binding(collection, field_id, scope);
    }
}

fn contribute_section(collection: &Collection, ancestry: &[XorNode<'_>], i: usize, scope: &mut Scope) {
    let node_id = ancestry[i].id();
    let Some(members_wrapper_id) = find_child_of_kind(collection, node_id, NodeKind::ArrayWrapper) else {
        return;
    };
    // Section members aren't comma-separated, so they sit directly under the
    // wrapper — one level shallower than let bindings or record fields.
    let member_ids = collection.child_ids(members_wrapper_id).to_vec();
    let cursor_member_id = (i >= 2 && ancestry[i - 1].id() == members_wrapper_id).then(|| ancestry[i - 2].id());

    for member_id in member_ids {
        let Some(paired_id) = find_child_of_kind(collection, member_id, NodeKind::IdentifierPairedExpression) else {
            continue;
        };
        if Some(member_id) == cursor_member_id {
            continue;
        }
        add_named_binding(collection, paired_id, scope);
    }
}

/// Given that `wrapper_id` is an `ArrayWrapper` child of the node at
/// `ancestry[i]`, find the csv item (three ancestry hops further in:
/// wrapper -> Csv -> item) that the cursor actually descended into, if any.
fn cursor_child_three_deep(ancestry: &[XorNode<'_>], i: usize, wrapper_id: u32) -> Option<u32> {
    if i >= 3 && ancestry[i - 1].id() == wrapper_id {
        Some(ancestry[i - 3].id())
    } else {
        None
    }
}

fn add_named_binding(collection: &Collection, paired_id: u32, scope: &mut Scope) {
    let Some(name_id) = collection.child_ids(paired_id).first().copied() else {
        return;
    };
    if let Some((literal, start)) = leaf_literal_at(collection, name_id) {
        insert(scope, literal, paired_id, start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pq_parser::cancellation::NeverCancelled;

    use crate::active_node;
    use crate::testing::collection_and_position;

    fn scope_at(source: &str, code_unit: u32) -> Scope {
        let (collection, position) = collection_and_position(source, code_unit);
        let active = active_node::compute(&collection, position, &NeverCancelled).unwrap().unwrap();
        compute(&collection, &active, &NeverCancelled).unwrap()
    }

    #[test]
    fn each_binds_underscore_in_body() {
        let scope = scope_at("each _ + 1", 6);
        assert!(scope.contains_key("_"));
    }

    #[test]
    fn let_binding_sees_earlier_siblings_not_later_ones() {
        let source = "let a = 1, b = a + 1, c = b + 1 in c";
        // Cursor inside `b`'s value (`a + 1`): sees `a`, not `b` or `c`.
        let cursor = source.find("a + 1").unwrap() as u32;
        let scope = scope_at(source, cursor);
        assert!(scope.contains_key("a"));
        assert!(!scope.contains_key("b"));
        assert!(!scope.contains_key("c"));
    }

    #[test]
    fn let_in_body_sees_every_binding() {
        let source = "let a = 1, b = 2 in a";
        let cursor = (source.len() - 1) as u32;
        let scope = scope_at(source, cursor);
        assert!(scope.contains_key("a"));
        assert!(scope.contains_key("b"));
    }

    #[test]
    fn function_parameters_visible_in_body() {
        let scope = scope_at("(x, y) => x + y", 11);
        assert!(scope.contains_key("x"));
        assert!(scope.contains_key("y"));
    }

    #[test]
    fn in_body_identifier_expression_leads_the_key_order() {
        let source = "let a = 1, b = 2 in x";
        let cursor = source.len() as u32;
        let scope = scope_at(source, cursor);
        let keys: Vec<&str> = scope.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["x", "a", "b"]);
    }
}
