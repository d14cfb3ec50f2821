//! `ParseContext` — the arena of in-flight node records a recoverable
//! parser builds up as it goes, keyed by id (spec.md §4.3).
//!
//! New relative to the teacher, which builds one owned, immutable tree once
//! parsing finishes successfully. A recoverable parser needs a structure
//! that's useful *mid-parse* and *on failure*, so node identity has to be an
//! id rather than a Rust reference — spec.md §9 Design Notes: "kept as
//! id→id indirections rather than direct references, eliminating cyclic
//! ownership, enabling arena storage." The doc-comment register and
//! `#[cfg(test)]`-at-bottom convention follow `lex::ast::error.rs`.

use std::collections::HashMap;

use crate::pq::ast::NodeKind;
use crate::pq::position::SnapshotPosition;

/// A not-yet-complete node. Becomes an `AstNode` (and leaves this arena)
/// when its production completes — see
/// `NodeIdMap::Collection::end_ast`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextNode {
    pub id: u32,
    pub kind: NodeKind,
    pub attribute_counter: u32,
    pub parent_id: Option<u32>,
    pub children_ids: Vec<u32>,
    /// Position of the first token this node claimed, if any were consumed
    /// before the node was abandoned — spec.md §3 `ContextNode.maybeTokenStart`.
    /// `None` for a node that was started but never advanced past.
    pub token_start: Option<SnapshotPosition>,
}

/// A backtrack point opaque to callers outside this module — the parser
/// only takes one inside an explicit disambiguation scope (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSnapshot {
    next_id: u32,
    stack_len: usize,
}

impl ContextSnapshot {
    /// The id that will be handed out next — every id allocated after this
    /// snapshot is `>=` this value, which is what lets a caller outside
    /// `ParseContext` (e.g. `NodeIdMap::Collection`) prune everything a
    /// `restore` undoes, including nodes that had already been promoted to
    /// `AstNode`s before the restore point.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }
}

/// The arena itself: every still-open node, keyed by id, plus the stack of
/// ids currently being built (innermost last) and the monotonic id
/// counter. The counter is immutable once issued and lives only inside one
/// parse's `ParseContext` — it is never shared across parses (spec.md §5
/// "Shared-resource policy").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseContext {
    nodes: HashMap<u32, ContextNode>,
    stack: Vec<u32>,
    next_id: u32,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new context node, push it onto the parse stack, and
    /// register it as a child of `parent_id` (if any) at the parent's
    /// current `attribute_counter`, which is then incremented.
    ///
    /// `token_start` is the position of the token the node is about to
    /// claim, if the cursor isn't at end-of-input — recorded up front so a
    /// node abandoned mid-parse still reports where it began (spec.md §3).
    pub fn start(&mut self, kind: NodeKind, parent_id: Option<u32>, token_start: Option<SnapshotPosition>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        if let Some(parent_id) = parent_id {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.children_ids.push(id);
                parent.attribute_counter += 1;
            }
        }

        self.nodes.insert(
            id,
            ContextNode {
                id,
                kind,
                attribute_counter: 0,
                parent_id,
                children_ids: Vec::new(),
                token_start,
            },
        );
        self.stack.push(id);
        id
    }

    /// The id currently on top of the parse stack, if any.
    pub fn current(&self) -> Option<u32> {
        self.stack.last().copied()
    }

    pub fn get(&self, id: u32) -> Option<&ContextNode> {
        self.nodes.get(&id)
    }

    /// Pop `id` off the context arena entirely — used both when a context
    /// completes into an `AstNode` (the caller owns removal so it can move
    /// the node's data out first) and when backtracking discards a
    /// speculative parse.
    pub fn take(&mut self, id: u32) -> Option<ContextNode> {
        if self.stack.last() == Some(&id) {
            self.stack.pop();
        }
        self.nodes.remove(&id)
    }

    /// Remove `id` and every descendant it still owns — used by
    /// backtracking. Decrements the parent's `attribute_counter` back to
    /// what it was before `id` was started, so a retried alternative
    /// production starts from the same attribute-index slot.
    pub fn delete(&mut self, id: u32) {
        let Some(node) = self.nodes.get(&id).cloned() else {
            return;
        };
        for child_id in node.children_ids.clone() {
            self.delete(child_id);
        }
        self.stack.retain(|&stacked| stacked != id);
        self.nodes.remove(&id);
        if let Some(parent_id) = node.parent_id {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.children_ids.retain(|&child| child != id);
                parent.attribute_counter = parent.attribute_counter.saturating_sub(1);
            }
        }
    }

    /// An opaque backtrack point: everything needed to undo allocations
    /// made after this call via `restore`.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            next_id: self.next_id,
            stack_len: self.stack.len(),
        }
    }

    /// Undo every `start` (and therefore every id) issued since
    /// `snapshot`. Ids are never reused — the monotonic counter is rewound
    /// to its value at the time of the snapshot, but an id that was handed
    /// out and discarded is simply never allocated again, by construction
    /// (the arena no longer holds it and nothing else refers to it).
    pub fn restore(&mut self, snapshot: ContextSnapshot) {
        let ids_to_delete: Vec<u32> = self
            .nodes
            .keys()
            .filter(|&&id| id >= snapshot.next_id)
            .copied()
            .collect();
        for id in ids_to_delete {
            self.nodes.remove(&id);
        }
        self.stack.truncate(snapshot.stack_len);
        self.next_id = snapshot.next_id;
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_registers_child_and_bumps_attribute_counter() {
        let mut ctx = ParseContext::new();
        let root = ctx.start(NodeKind::Section, None, None);
        let child_a = ctx.start(NodeKind::SectionMember, Some(root), None);
        let child_b = ctx.start(NodeKind::SectionMember, Some(root), None);

        let root_node = ctx.get(root).unwrap();
        assert_eq!(root_node.children_ids, vec![child_a, child_b]);
        assert_eq!(root_node.attribute_counter, 2);
    }

    #[test]
    fn delete_removes_descendants_and_decrements_parent_counter() {
        let mut ctx = ParseContext::new();
        let root = ctx.start(NodeKind::Section, None, None);
        let child = ctx.start(NodeKind::SectionMember, Some(root), None);
        let _grandchild = ctx.start(NodeKind::Constant, Some(child), None);

        ctx.delete(child);

        assert!(ctx.get(child).is_none());
        let root_node = ctx.get(root).unwrap();
        assert!(root_node.children_ids.is_empty());
        assert_eq!(root_node.attribute_counter, 0);
    }

    #[test]
    fn snapshot_restore_undoes_speculative_nodes() {
        let mut ctx = ParseContext::new();
        let root = ctx.start(NodeKind::Section, None, None);
        let snapshot = ctx.snapshot();

        ctx.start(NodeKind::SectionMember, Some(root), None);
        ctx.start(NodeKind::Constant, Some(root), None);
        assert_eq!(ctx.len(), 3);

        ctx.restore(snapshot);

        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.get(root).unwrap().children_ids.len(), 0);
        assert_eq!(ctx.get(root).unwrap().attribute_counter, 0);
        assert_eq!(ctx.current(), Some(root));
    }

    #[test]
    fn take_pops_only_the_matching_top_of_stack() {
        let mut ctx = ParseContext::new();
        let root = ctx.start(NodeKind::Section, None, None);
        assert_eq!(ctx.current(), Some(root));
        let taken = ctx.take(root).unwrap();
        assert_eq!(taken.id, root);
        assert_eq!(ctx.current(), None);
    }
}
