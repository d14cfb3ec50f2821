//! The combinatorial `Strategy`: a single table-driven precedence-climbing
//! loop instead of one function per operator family — spec.md §9 Design
//! Notes "Two parsers, one interface" ("interchangeable... expected to
//! produce equivalent trees"). `as`/`is` are still special-cased since their
//! right-hand side is a type, not a recursively climbed expression.

use crate::pq::ast::NodeKind;
use crate::pq::error::ParseError;
use crate::pq::token::grammar::{Associativity, BinOpKind};
use crate::pq::token::TokenKind;

use super::shared;
use super::state::ParserState;
use super::Strategy;

pub struct CombinatorialParser;

impl Strategy for CombinatorialParser {
    fn read_expression(&self, state: &mut ParserState) -> Result<u32, ParseError> {
        climb(state, 0)
    }
}

/// The `NodeKind` a binary operator token wraps its operands in, alongside
/// the `BinOpKind` family used to look up precedence/associativity.
fn operator_info(kind: TokenKind) -> Option<(BinOpKind, NodeKind)> {
    use crate::pq::token::grammar::KeywordKind;
    match kind {
        TokenKind::Keyword(KeywordKind::Meta) => Some((BinOpKind::Meta, NodeKind::MetadataExpression)),
        TokenKind::Keyword(KeywordKind::Or) => Some((BinOpKind::Or, NodeKind::LogicalExpression)),
        TokenKind::Keyword(KeywordKind::And) => Some((BinOpKind::And, NodeKind::LogicalExpression)),
        TokenKind::NullCoalescing => Some((BinOpKind::NullCoalescing, NodeKind::NullCoalescingExpression)),
        TokenKind::LessThan
        | TokenKind::LessThanEqualTo
        | TokenKind::GreaterThan
        | TokenKind::GreaterThanEqualTo => Some((BinOpKind::Relational, NodeKind::RelationalExpression)),
        TokenKind::Equal | TokenKind::NotEqual => Some((BinOpKind::Equality, NodeKind::EqualityExpression)),
        TokenKind::Keyword(KeywordKind::As) => Some((BinOpKind::As, NodeKind::AsExpression)),
        TokenKind::Keyword(KeywordKind::Is) => Some((BinOpKind::Is, NodeKind::IsExpression)),
        TokenKind::Plus | TokenKind::Minus | TokenKind::Ampersand => {
            Some((BinOpKind::Additive, NodeKind::ArithmeticExpression))
        }
        TokenKind::Asterisk | TokenKind::Division => Some((BinOpKind::Multiplicative, NodeKind::ArithmeticExpression)),
        _ => None,
    }
}

fn climb(state: &mut ParserState, min_precedence: u8) -> Result<u32, ParseError> {
    let mut left = shared::parse_unary_expression(state, &CombinatorialParser)?;

    loop {
        let Some((family, node_kind)) = operator_info(state.current_kind()) else {
            break;
        };
        if family.precedence() < min_precedence {
            break;
        }

        if family == BinOpKind::As {
            left = shared::parse_as_trailer(state, left)?;
            continue;
        }
        if family == BinOpKind::Is {
            left = shared::parse_is_trailer(state, left)?;
            continue;
        }

        let operator_kind = state.current_kind();
        let next_min_precedence = match family.associativity() {
            Associativity::Left => family.precedence() + 1,
            Associativity::Right => family.precedence(),
        };
        left = shared::parse_binary_trailer(state, node_kind, left, operator_kind, |state| {
            climb(state, next_min_precedence)
        })?;
    }

    Ok(left)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::pq::testing::strategies_agree;

    /// Small arithmetic expressions over `+ - * /` and parenthesization —
    /// enough to exercise every precedence tier `climb` and the
    /// recursive-descent cascade both implement.
    fn arithmetic_expression_strategy() -> impl Strategy<Value = String> {
        let leaf = (1u8..9).prop_map(|n| n.to_string());
        leaf.prop_recursive(4, 64, 4, |inner| {
            prop_oneof![
                (inner.clone(), prop_oneof![Just("+"), Just("-"), Just("*"), Just("/")], inner.clone())
                    .prop_map(|(left, op, right)| format!("{left} {op} {right}")),
                inner.prop_map(|expr| format!("({expr})")),
            ]
        })
    }

    proptest! {
        #[test]
        fn both_strategies_agree_on_generated_arithmetic_expressions(expr in arithmetic_expression_strategy()) {
            prop_assert!(strategies_agree(&expr));
        }
    }
}
