//! The token cursor and node-building surface shared by both parser
//! strategies (spec.md §4.4 "Both share the token cursor and ParseContext").

use log::trace;

use crate::pq::ast::{AstNode, LeafPayload, NodeKind};
use crate::pq::cancellation::CancellationToken;
use crate::pq::context::{ContextSnapshot, ParseContext};
use crate::pq::error::{CancellationError, ParseError, ParseErrorKind};
use crate::pq::lexer::snapshot::Token;
use crate::pq::node_id_map::{Collection, XorNode};
use crate::pq::position::{SnapshotPosition, TokenRange};
use crate::pq::token::TokenKind;

/// An in-flight node: the id allocated by `ParseContext::start`, its
/// attribute index among its parent's children, where it started, and the
/// child ids accumulated so far (in attribute order).
pub struct NodeBuilder {
    pub id: u32,
    pub kind: NodeKind,
    pub attribute_index: Option<u32>,
    pub start: SnapshotPosition,
    pub children: Vec<u32>,
}

/// Everything needed to undo speculative parsing inside a disambiguation
/// scope: the context arena snapshot and the token cursor position.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    context: ContextSnapshot,
    position: usize,
}

pub struct ParserState<'a> {
    tokens: Vec<Token>,
    position: usize,
    context: ParseContext,
    collection: Collection,
    cancellation: &'a dyn CancellationToken,
}

impl<'a> ParserState<'a> {
    pub fn new(tokens: Vec<Token>, cancellation: &'a dyn CancellationToken) -> Self {
        Self {
            tokens,
            position: 0,
            context: ParseContext::new(),
            collection: Collection::new(),
            cancellation,
        }
    }

    pub fn into_collection(self) -> Collection {
        self.collection
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn context(&self) -> &ParseContext {
        &self.context
    }

    pub fn current_kind(&self) -> TokenKind {
        self.tokens
            .get(self.position)
            .map(|token| token.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    pub fn is_kind(&self, kind: TokenKind) -> bool {
        self.current_kind() == kind
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// The kind of the token `offset` positions ahead of the cursor, or
    /// `Eof` past the end — used by `shared::parse_type` to tell a bare
    /// primitive type name (`function`, `table`) apart from the same word
    /// introducing a compound type (`function (...)`, `table [...]`)
    /// without a full disambiguation checkpoint.
    pub fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.position + offset)
            .map(|token| token.kind)
            .unwrap_or(TokenKind::Eof)
    }

    /// The position just past the last consumed token — used as a node's
    /// end position when closing it.
    fn cursor_position(&self) -> SnapshotPosition {
        if self.position == 0 {
            self.tokens
                .first()
                .map(|t| t.range.start)
                .unwrap_or_else(|| SnapshotPosition::new(0, 0, 0))
        } else {
            self.tokens[self.position - 1].range.end
        }
    }

    fn start_position(&self) -> SnapshotPosition {
        self.current_token()
            .map(|t| t.range.start)
            .unwrap_or_else(|| self.cursor_position())
    }

    pub fn check_cancellation(&self) -> Result<(), CancellationError> {
        trace!("parser: checkpoint at token {}", self.position);
        self.cancellation.throw_if_cancelled()
    }

    /// Consume and return the current token, or raise `ExpectedTokenKind`.
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.current_kind() == kind {
            self.advance()
        } else {
            Err(self.raise(ParseErrorKind::ExpectedTokenKind { expected: kind }))
        }
    }

    pub fn expect_any(&mut self, kinds: &[TokenKind]) -> Result<Token, ParseError> {
        if kinds.contains(&self.current_kind()) {
            self.advance()
        } else {
            Err(self.raise(ParseErrorKind::ExpectedAnyTokenKind {
                expected: kinds.to_vec(),
            }))
        }
    }

    /// Consume and return the current token. Polled at the start of every
    /// token consumed (spec.md §5) — a fired cancellation is raised as
    /// `ParseErrorKind::Cancelled` rather than silently advancing past it.
    pub fn advance(&mut self) -> Result<Token, ParseError> {
        self.check_cancellation()
            .map_err(|err| self.raise(ParseErrorKind::Cancelled(err)))?;
        let token = self.tokens[self.position].clone();
        self.position += 1;
        Ok(token)
    }

    pub fn raise(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.current_token().map(|t| t.kind), self.context.clone())
    }

    /// Start a new node as a child of whatever's currently on top of the
    /// parse stack, mirroring it into `collection` so inspection can see it
    /// immediately if parsing later fails.
    pub fn start_node(&mut self, kind: NodeKind) -> NodeBuilder {
        let parent_id = self.context.current();
        let attribute_index = parent_id.and_then(|id| self.context.get(id)).map(|node| node.attribute_counter);
        let token_start = self.current_token().map(|t| t.range.start);
        let id = self.context.start(kind, parent_id, token_start);
        if let Some(node) = self.context.get(id) {
            self.collection.insert_context_node(node.clone());
        }
        // `context.start` just appended `id` to the parent's own `children_ids`;
        // re-mirror the parent so a parse failure while this child is still
        // open leaves `collection` pointing at the up-to-date child list
        // rather than the empty one it had when the parent itself was started.
        if let Some(parent_id) = parent_id {
            if let Some(parent_node) = self.context.get(parent_id) {
                self.collection.insert_context_node(parent_node.clone());
            }
        }
        NodeBuilder {
            id,
            kind,
            attribute_index,
            start: self.start_position(),
            children: Vec::new(),
        }
    }

    /// Like `start_node`, but for a binary-expression wrapper whose first
    /// child (the already-parsed left operand) was parsed *before* this
    /// node was known to exist — its token range must start at that
    /// child's start, not at whatever token the cursor now sits on.
    pub fn start_node_from_child(&mut self, kind: NodeKind, first_child_id: u32) -> NodeBuilder {
        let mut builder = self.start_node(kind);
        if let Some(XorNode::Ast(node)) = self.collection.get(first_child_id) {
            builder.start = node.token_range.start;
        }
        builder
    }

    /// Record that `child_id` completed as a direct child of `builder`.
    pub fn adopt_child(&mut self, builder: &mut NodeBuilder, child_id: u32) {
        builder.children.push(child_id);
    }

    /// Complete a composite node: promote it from context to AST, wire up
    /// its children, and pop it off the context stack.
    pub fn finish_node(&mut self, builder: NodeBuilder) -> u32 {
        let range = TokenRange::new(builder.start, self.cursor_position());
        let node = AstNode::new(builder.id, builder.kind, range, builder.attribute_index);
        self.context.take(builder.id);
        self.collection.end_ast(builder.id, node);
        self.collection.set_child_ids(builder.id, builder.children);
        if self.context.is_empty() {
            self.collection.set_root_id(builder.id);
        }
        builder.id
    }

    /// Complete a leaf node consuming exactly the just-advanced token.
    pub fn finish_leaf(&mut self, builder: NodeBuilder, leaf: LeafPayload) -> u32 {
        let range = TokenRange::new(builder.start, self.cursor_position());
        let node = AstNode::new(builder.id, builder.kind, range, builder.attribute_index).with_leaf(leaf);
        self.context.take(builder.id);
        self.collection.end_ast(builder.id, node);
        builder.id
    }

    /// Abandon a speculative node and everything it started — used when a
    /// disambiguation attempt fails and must restore to a checkpoint taken
    /// before the node existed; callers normally prefer `restore`.
    pub fn abandon_node(&mut self, id: u32) {
        self.context.delete(id);
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            context: self.context.snapshot(),
            position: self.position,
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.collection.prune_from(checkpoint.context.next_id());
        self.context.restore(checkpoint.context);
        self.position = checkpoint.position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pq::cancellation::{NeverCancelled, TimedCancellation};

    fn token(kind: TokenKind, literal: &str, start: u32, end: u32) -> Token {
        Token {
            kind,
            literal: literal.to_string(),
            range: TokenRange::new(SnapshotPosition::new(0, start, start), SnapshotPosition::new(0, end, end)),
        }
    }

    #[test]
    fn advance_raises_cancelled_instead_of_consuming() {
        let tokens = vec![token(TokenKind::Identifier, "x", 0, 1)];
        let cancellation = TimedCancellation::new(0);
        let mut state = ParserState::new(tokens, &cancellation);

        let error = state.advance().unwrap_err();
        assert!(matches!(error.kind, ParseErrorKind::Cancelled(_)));
        // The failed check happens before consuming, so the cursor never moved.
        assert_eq!(state.current_kind(), TokenKind::Identifier);
    }

    #[test]
    fn checkpoint_restores_position_and_prunes_speculative_nodes() {
        let tokens = vec![token(TokenKind::Identifier, "a", 0, 1), token(TokenKind::Identifier, "b", 1, 2)];
        let mut state = ParserState::new(tokens, &NeverCancelled);

        let checkpoint = state.checkpoint();
        let builder = state.start_node(NodeKind::Identifier);
        state.advance().unwrap();
        let id = state.finish_leaf(
            builder,
            LeafPayload::Identifier {
                literal: "a".to_string(),
                has_at_prefix: false,
            },
        );
        assert!(state.collection().get(id).is_some());

        state.restore(checkpoint);
        assert_eq!(state.current_kind(), TokenKind::Identifier);
        assert!(state.collection().get(id).is_none());
    }
}
