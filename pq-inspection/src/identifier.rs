//! `IdentifierUnderPosition` — spec.md §4.5(c): when the cursor sits on an
//! identifier, where (if anywhere) it was bound.

use pq_parser::ast::NodeKind;
use pq_parser::node_id_map::Collection;
use pq_parser::position::SnapshotPosition;

use crate::active_node::ActiveNode;
use crate::scope::Scope;
use crate::support::{find_child_of_kind, leaf_literal, leaf_literal_at};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierUnderPosition {
    Local {
        identifier: String,
        definition_position_start: SnapshotPosition,
    },
    Undefined {
        identifier: String,
    },
}

pub fn compute(collection: &Collection, active: &ActiveNode<'_>, scope: &Scope) -> Option<IdentifierUnderPosition> {
    let innermost = active.innermost()?;
    let identifier = match innermost.kind() {
        NodeKind::Identifier | NodeKind::GeneralizedIdentifier => leaf_literal(innermost)?,
        NodeKind::IdentifierExpression => {
            let identifier_id = find_child_of_kind(collection, innermost.id(), NodeKind::Identifier)?;
            leaf_literal_at(collection, identifier_id)?.0
        }
        _ => return None,
    };

    Some(match scope.get(&identifier) {
        Some(item) => IdentifierUnderPosition::Local {
            identifier,
            definition_position_start: item.definition_position_start,
        },
        None => IdentifierUnderPosition::Undefined { identifier },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pq_parser::cancellation::NeverCancelled;

    use crate::{active_node, scope};
    use crate::testing::collection_and_position;

    fn identifier_at(source: &str, code_unit: u32) -> Option<IdentifierUnderPosition> {
        let (collection, position) = collection_and_position(source, code_unit);
        let active = active_node::compute(&collection, position, &NeverCancelled).unwrap().unwrap();
        let scope = scope::compute(&collection, &active, &NeverCancelled).unwrap();
        compute(&collection, &active, &scope)
    }

    #[test]
    fn resolves_a_local_binding() {
        let source = "let x = 1 in x";
        let cursor = (source.len() - 1) as u32;
        let result = identifier_at(source, cursor).unwrap();
        assert_eq!(
            result,
            IdentifierUnderPosition::Local {
                identifier: "x".to_string(),
                definition_position_start: SnapshotPosition::new(0, 4, 4),
            }
        );
    }

    #[test]
    fn reports_undefined_identifiers() {
        let source = "let x = 1 in y";
        let cursor = (source.len() - 1) as u32;
        let result = identifier_at(source, cursor).unwrap();
        assert_eq!(
            result,
            IdentifierUnderPosition::Undefined {
                identifier: "y".to_string()
            }
        );
    }

    #[test]
    fn absent_when_cursor_is_not_on_an_identifier() {
        assert!(identifier_at("1 + 2", 1).is_none());
    }
}
