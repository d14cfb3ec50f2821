//! `NodeIdMap::Collection` — the composite, id-keyed view over completed
//! AST nodes and still-open context nodes (spec.md §3/§4.3).
//!
//! Five parallel maps rather than one tree of owning references, so a
//! context node can be replaced by its completed AST node in place (same
//! id, same parent/child edges) without walking or rebuilding anything
//! above or below it.

use std::collections::{HashMap, HashSet};

use crate::pq::ast::{AstNode, NodeKind};
use crate::pq::context::{ContextNode, ParseContext};

/// The sum of a completed `AstNode` and an in-progress `ContextNode` — the
/// unified element every inspection traversal walks (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XorNode<'a> {
    Ast(&'a AstNode),
    Context(&'a ContextNode),
}

impl<'a> XorNode<'a> {
    pub fn id(&self) -> u32 {
        match self {
            XorNode::Ast(node) => node.id,
            XorNode::Context(node) => node.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            XorNode::Ast(node) => node.kind,
            XorNode::Context(node) => node.kind,
        }
    }

    pub fn as_ast(&self) -> Option<&'a AstNode> {
        match self {
            XorNode::Ast(node) => Some(node),
            XorNode::Context(_) => None,
        }
    }

    pub fn is_context(&self) -> bool {
        matches!(self, XorNode::Context(_))
    }

    /// The best-known position where this node's first token begins — the
    /// full range's start for a completed node, the recorded claim point for
    /// one still open. `None` only for a context node that never advanced.
    pub fn token_start(&self) -> Option<crate::pq::position::SnapshotPosition> {
        match self {
            XorNode::Ast(node) => Some(node.token_range.start),
            XorNode::Context(node) => node.token_start,
        }
    }
}

/// The composite collection. `child_ids_by_id`/`parent_id_by_id` are kept
/// valid across the context→ast transition performed by `end_ast`: the
/// keys don't change, only which of `ast_node_by_id`/`context_node_by_id`
/// holds the id's data.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    ast_node_by_id: HashMap<u32, AstNode>,
    context_node_by_id: HashMap<u32, ContextNode>,
    child_ids_by_id: HashMap<u32, Vec<u32>>,
    parent_id_by_id: HashMap<u32, u32>,
    leaf_node_ids: HashSet<u32>,
    root_id: Option<u32>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_id(&self) -> Option<u32> {
        self.root_id
    }

    pub fn set_root_id(&mut self, id: u32) {
        self.root_id = Some(id);
    }

    /// Adopt every still-open node from a `ParseContext` as-is — used right
    /// after a parse fails, so inspection can operate on the partial tree
    /// (spec.md §4.4 "Error recovery").
    pub fn absorb_context(&mut self, context: &ParseContext) {
        for id in context_ids(context) {
            if let Some(node) = context.get(id) {
                self.insert_context_node(node.clone());
            }
        }
    }

    pub fn insert_context_node(&mut self, node: ContextNode) {
        let id = node.id;
        if let Some(parent_id) = node.parent_id {
            self.parent_id_by_id.insert(id, parent_id);
        }
        self.child_ids_by_id.insert(id, node.children_ids.clone());
        self.context_node_by_id.insert(id, node);
    }

    /// Replace a context node by its completed AST node: the context entry
    /// is removed, the ast entry is added, and the parent/child maps are
    /// left untouched (spec.md §3 "Lifecycle and ownership").
    pub fn end_ast(&mut self, id: u32, node: AstNode) {
        self.context_node_by_id.remove(&id);
        if node.kind.is_leaf_kind() {
            self.leaf_node_ids.insert(id);
        }
        self.ast_node_by_id.insert(id, node);
    }

    pub fn set_child_ids(&mut self, id: u32, child_ids: Vec<u32>) {
        for &child_id in &child_ids {
            self.parent_id_by_id.insert(child_id, id);
        }
        self.child_ids_by_id.insert(id, child_ids);
    }

    pub fn get(&self, id: u32) -> Option<XorNode<'_>> {
        if let Some(node) = self.ast_node_by_id.get(&id) {
            return Some(XorNode::Ast(node));
        }
        self.context_node_by_id.get(&id).map(XorNode::Context)
    }

    pub fn child_ids(&self, id: u32) -> &[u32] {
        self.child_ids_by_id
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn parent_id(&self, id: u32) -> Option<u32> {
        self.parent_id_by_id.get(&id).copied()
    }

    pub fn leaf_node_ids(&self) -> &HashSet<u32> {
        &self.leaf_node_ids
    }

    pub fn is_leaf(&self, id: u32) -> bool {
        self.leaf_node_ids.contains(&id)
    }

    /// The ancestry chain from `id` to the root, innermost first.
    pub fn ancestry(&self, id: u32) -> Vec<XorNode<'_>> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.get(node_id) else {
                break;
            };
            chain.push(node);
            current = self.parent_id(node_id);
        }
        chain
    }

    pub fn ast_nodes(&self) -> impl Iterator<Item = &AstNode> {
        self.ast_node_by_id.values()
    }

    pub fn context_nodes(&self) -> impl Iterator<Item = &ContextNode> {
        self.context_node_by_id.values()
    }

    pub fn len(&self) -> usize {
        self.ast_node_by_id.len() + self.context_node_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard every node whose id is `>= min_id` — the collection-side
    /// counterpart of `ParseContext::restore`, needed because a speculative
    /// attempt may have already promoted some of its nodes out of the
    /// context arena and into `ast_node_by_id` before the attempt failed.
    pub fn prune_from(&mut self, min_id: u32) {
        self.ast_node_by_id.retain(|&id, _| id < min_id);
        self.context_node_by_id.retain(|&id, _| id < min_id);
        self.child_ids_by_id.retain(|&id, _| id < min_id);
        self.parent_id_by_id.retain(|&id, _| id < min_id);
        self.leaf_node_ids.retain(|&id| id < min_id);
        if self.root_id.is_some_and(|id| id >= min_id) {
            self.root_id = None;
        }
        for children in self.child_ids_by_id.values_mut() {
            children.retain(|&id| id < min_id);
        }
    }
}

fn context_ids(context: &ParseContext) -> Vec<u32> {
    let mut ids: Vec<u32> = context
        .current()
        .into_iter()
        .flat_map(|id| collect_ids(context, id))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn collect_ids(context: &ParseContext, id: u32) -> Vec<u32> {
    let mut ids = vec![id];
    if let Some(node) = context.get(id) {
        for &child_id in &node.children_ids {
            ids.extend(collect_ids(context, child_id));
        }
        let mut ancestor = node.parent_id;
        while let Some(ancestor_id) = ancestor {
            ids.push(ancestor_id);
            ancestor = context.get(ancestor_id).and_then(|n| n.parent_id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_ast_preserves_child_and_parent_edges() {
        use crate::pq::ast::AstNode;
        use crate::pq::position::{SnapshotPosition, TokenRange};

        let mut collection = Collection::new();
        let range = TokenRange::new(SnapshotPosition::new(0, 0, 0), SnapshotPosition::new(0, 1, 1));

        collection.insert_context_node(ContextNode {
            id: 0,
            kind: NodeKind::Section,
            attribute_counter: 1,
            parent_id: None,
            children_ids: vec![1],
            token_start: None,
        });
        collection.insert_context_node(ContextNode {
            id: 1,
            kind: NodeKind::SectionMember,
            attribute_counter: 0,
            parent_id: Some(0),
            children_ids: vec![],
            token_start: None,
        });

        collection.end_ast(1, AstNode::new(1, NodeKind::SectionMember, range, Some(0)));

        assert!(matches!(collection.get(1), Some(XorNode::Ast(_))));
        assert_eq!(collection.parent_id(1), Some(0));
        assert_eq!(collection.child_ids(0), &[1]);
    }

    #[test]
    fn ancestry_climbs_to_root() {
        use crate::pq::ast::AstNode;
        use crate::pq::position::{SnapshotPosition, TokenRange};

        let mut collection = Collection::new();
        let range = TokenRange::new(SnapshotPosition::new(0, 0, 0), SnapshotPosition::new(0, 1, 1));
        collection.end_ast(0, AstNode::new(0, NodeKind::Section, range, None));
        collection.end_ast(1, AstNode::new(1, NodeKind::SectionMember, range, Some(0)));
        collection.set_child_ids(0, vec![1]);

        let ancestry: Vec<u32> = collection.ancestry(1).iter().map(|node| node.id()).collect();
        assert_eq!(ancestry, vec![1, 0]);
    }
}
