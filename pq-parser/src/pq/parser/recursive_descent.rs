//! The recursive-descent `Strategy`: an explicit cascade of one function per
//! `BinOpKind` family, low to high — spec.md §4.4 "Grammar shape" / §9
//! Design Notes "Two parsers, one interface".

use crate::pq::ast::NodeKind;
use crate::pq::error::ParseError;
use crate::pq::token::grammar::KeywordKind;
use crate::pq::token::TokenKind;

use super::shared;
use super::state::ParserState;
use super::Strategy;

pub struct RecursiveDescentParser;

impl Strategy for RecursiveDescentParser {
    fn read_expression(&self, state: &mut ParserState) -> Result<u32, ParseError> {
        read_meta_expression(state)
    }
}

fn read_meta_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut left = read_or_expression(state)?;
    while state.is_kind(TokenKind::Keyword(KeywordKind::Meta)) {
        left = shared::parse_binary_trailer(
            state,
            NodeKind::MetadataExpression,
            left,
            TokenKind::Keyword(KeywordKind::Meta),
            read_or_expression,
        )?;
    }
    Ok(left)
}

fn read_or_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut left = read_and_expression(state)?;
    while state.is_kind(TokenKind::Keyword(KeywordKind::Or)) {
        left = shared::parse_binary_trailer(
            state,
            NodeKind::LogicalExpression,
            left,
            TokenKind::Keyword(KeywordKind::Or),
            read_and_expression,
        )?;
    }
    Ok(left)
}

fn read_and_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut left = read_null_coalescing_expression(state)?;
    while state.is_kind(TokenKind::Keyword(KeywordKind::And)) {
        left = shared::parse_binary_trailer(
            state,
            NodeKind::LogicalExpression,
            left,
            TokenKind::Keyword(KeywordKind::And),
            read_null_coalescing_expression,
        )?;
    }
    Ok(left)
}

/// Right-associative (spec.md §4.4), so the recursive call is on the right
/// rather than the usual left-folding `while` loop.
fn read_null_coalescing_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let left = read_relational_expression(state)?;
    if state.is_kind(TokenKind::NullCoalescing) {
        shared::parse_binary_trailer(
            state,
            NodeKind::NullCoalescingExpression,
            left,
            TokenKind::NullCoalescing,
            read_null_coalescing_expression,
        )
    } else {
        Ok(left)
    }
}

fn read_relational_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut left = read_equality_expression(state)?;
    loop {
        let operator_kind = state.current_kind();
        if !matches!(
            operator_kind,
            TokenKind::LessThan | TokenKind::LessThanEqualTo | TokenKind::GreaterThan | TokenKind::GreaterThanEqualTo
        ) {
            break;
        }
        left = shared::parse_binary_trailer(
            state,
            NodeKind::RelationalExpression,
            left,
            operator_kind,
            read_equality_expression,
        )?;
    }
    Ok(left)
}

fn read_equality_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut left = read_as_expression(state)?;
    loop {
        let operator_kind = state.current_kind();
        if !matches!(operator_kind, TokenKind::Equal | TokenKind::NotEqual) {
            break;
        }
        left = shared::parse_binary_trailer(state, NodeKind::EqualityExpression, left, operator_kind, read_as_expression)?;
    }
    Ok(left)
}

/// `as` takes a `NullablePrimitiveType` on its right, not a recursively
/// parsed expression (spec.md §4.4) — delegates to `shared::parse_as_trailer`
/// rather than looping with a sub-expression reader.
fn read_as_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut left = read_is_expression(state)?;
    while state.is_kind(TokenKind::Keyword(KeywordKind::As)) {
        left = shared::parse_as_trailer(state, left)?;
    }
    Ok(left)
}

fn read_is_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut left = read_additive_expression(state)?;
    while state.is_kind(TokenKind::Keyword(KeywordKind::Is)) {
        left = shared::parse_is_trailer(state, left)?;
    }
    Ok(left)
}

fn read_additive_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut left = read_multiplicative_expression(state)?;
    loop {
        let operator_kind = state.current_kind();
        if !matches!(operator_kind, TokenKind::Plus | TokenKind::Minus | TokenKind::Ampersand) {
            break;
        }
        left = shared::parse_binary_trailer(
            state,
            NodeKind::ArithmeticExpression,
            left,
            operator_kind,
            read_multiplicative_expression,
        )?;
    }
    Ok(left)
}

fn read_multiplicative_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut left = read_unary_expression(state)?;
    loop {
        let operator_kind = state.current_kind();
        if !matches!(operator_kind, TokenKind::Asterisk | TokenKind::Division) {
            break;
        }
        left = shared::parse_binary_trailer(
            state,
            NodeKind::ArithmeticExpression,
            left,
            operator_kind,
            read_unary_expression,
        )?;
    }
    Ok(left)
}

fn read_unary_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    shared::parse_unary_expression(state, &RecursiveDescentParser)
}

#[cfg(test)]
mod tests {
    use crate::pq::ast::LeafPayload;
    use crate::pq::parser::ParserKind;
    use crate::pq::testing::parse_source;

    use super::*;

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let outcome = parse_source("1 + 2 * 3", ParserKind::RecursiveDescent)
            .expect("lexes and snapshots cleanly")
            .expect("parses cleanly");

        let root = outcome.collection.get(outcome.root_id).expect("root resolves");
        assert_eq!(root.kind(), NodeKind::ArithmeticExpression);

        let children = outcome.collection.child_ids(outcome.root_id);
        assert_eq!(children.len(), 3);
        let operator = outcome
            .collection
            .get(children[1])
            .and_then(|node| node.as_ast())
            .expect("the operator slot is a Constant leaf");
        assert_eq!(operator.leaf, Some(LeafPayload::Constant { literal: "+".to_string() }));

        // The right operand of the `+` is itself an `ArithmeticExpression`
        // for `2 * 3` — multiplication bound tighter and was parsed first.
        let right = outcome.collection.get(children[2]).expect("right operand resolves");
        assert_eq!(right.kind(), NodeKind::ArithmeticExpression);
        let right_children = outcome.collection.child_ids(children[2]);
        let right_operator = outcome
            .collection
            .get(right_children[1])
            .and_then(|node| node.as_ast())
            .expect("the nested operator slot is a Constant leaf");
        assert_eq!(right_operator.leaf, Some(LeafPayload::Constant { literal: "*".to_string() }));
    }
}
