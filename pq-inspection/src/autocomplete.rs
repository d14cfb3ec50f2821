//! Autocomplete — spec.md §4.5(e): which keywords could legally appear
//! next, and whether exactly one of them is required.
//!
//! Pure in `(ActiveNode, NodeIdMap, maybeParseError)`: most of the work is
//! read straight off the `ParseError` a failed parse already carries — the
//! set of `TokenKind`s the parser wanted next at the point it gave up is
//! exactly the candidate keyword set, no separate grammar table walk
//! needed. The exception is `UnusedTokensRemain`: a dangling optional
//! trailer (`try true oth|`) parses to completion with no structured
//! "expected" set at all, so that case falls back to reading `active`
//! itself and prefix-matching the leftover token's text against the
//! grammar-legal continuations at that node.

use pq_parser::ast::NodeKind;
use pq_parser::error::{ParseError, ParseErrorKind};
use pq_parser::node_id_map::Collection;
use pq_parser::token::grammar::{KeywordKind, EXPRESSION_KEYWORDS};
use pq_parser::token::TokenKind;

use crate::active_node::ActiveNode;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Autocomplete {
    pub allowed_autocomplete_keywords: Vec<KeywordKind>,
    pub maybe_required_autocomplete: Option<KeywordKind>,
}

impl Autocomplete {
    fn empty() -> Self {
        Self::default()
    }
}

pub fn compute(collection: &Collection, active: &ActiveNode<'_>, maybe_parse_error: Option<&ParseError>) -> Autocomplete {
    let Some(error) = maybe_parse_error else {
        return Autocomplete::empty();
    };

    if let ParseErrorKind::UnusedTokensRemain { leftover_literal } = &error.kind {
        return compute_from_active_node(collection, active, leftover_literal);
    }

    let expected = expected_token_kinds(&error.kind);
    if expected.is_empty() {
        return Autocomplete::empty();
    }

    let expected_keywords: Vec<KeywordKind> = expected.iter().filter_map(|kind| keyword_of(*kind)).collect();

    // Exactly one legal token and it's a keyword: nothing else could
    // possibly complete the parse, so it's required rather than merely
    // allowed (spec.md: `if 1 t|` -> `then`).
    if expected.len() == 1 {
        if let Some(&only) = expected_keywords.first() {
            return Autocomplete {
                allowed_autocomplete_keywords: Vec::new(),
                maybe_required_autocomplete: Some(only),
            };
        }
    }

    if expects_expression(&expected) {
        return Autocomplete {
            allowed_autocomplete_keywords: EXPRESSION_KEYWORDS.clone(),
            maybe_required_autocomplete: None,
        };
    }

    Autocomplete {
        allowed_autocomplete_keywords: expected_keywords,
        maybe_required_autocomplete: None,
    }
}

fn expected_token_kinds(kind: &ParseErrorKind) -> Vec<TokenKind> {
    match kind {
        ParseErrorKind::ExpectedTokenKind { expected } => vec![*expected],
        ParseErrorKind::ExpectedAnyTokenKind { expected } => expected.clone(),
        ParseErrorKind::ExpectedGeneralizedIdentifier => Vec::new(),
        ParseErrorKind::InvalidPrimitiveType { .. } => Vec::new(),
        ParseErrorKind::Cancelled(_) | ParseErrorKind::UnusedTokensRemain { .. } => Vec::new(),
    }
}

/// `active`'s grammar-legal keyword continuations, narrowed by the
/// leftover token's literal text — the `UnusedTokensRemain` path, where no
/// `ParseErrorKind` names an expected set directly.
fn compute_from_active_node(collection: &Collection, active: &ActiveNode<'_>, leftover_literal: &str) -> Autocomplete {
    let Some(candidates) = grammar_legal_keywords(collection, active) else {
        return Autocomplete::empty();
    };

    let matches: Vec<KeywordKind> = candidates
        .into_iter()
        .filter(|keyword| keyword.as_str().starts_with(leftover_literal))
        .collect();

    match matches.as_slice() {
        [] => Autocomplete::empty(),
        [only] => Autocomplete {
            allowed_autocomplete_keywords: Vec::new(),
            maybe_required_autocomplete: Some(*only),
        },
        _ => Autocomplete {
            allowed_autocomplete_keywords: matches,
            maybe_required_autocomplete: None,
        },
    }
}

/// The keywords legal right after `active`'s node, grammar shape alone —
/// currently recognizes the one case spec.md §8 exercises: a closed
/// `ErrorHandlingExpression` (`try <expr>`) that hasn't taken an
/// `OtherwiseExpression`/`CatchExpression` trailer yet can still take
/// `otherwise`, `catch`, or (the protected expression sitting at the
/// lowest binary-operator precedence) `or`.
fn grammar_legal_keywords(collection: &Collection, active: &ActiveNode<'_>) -> Option<Vec<KeywordKind>> {
    let innermost = active.innermost()?;
    if innermost.kind() != NodeKind::ErrorHandlingExpression {
        return None;
    }
    let has_trailer = collection.child_ids(innermost.id()).iter().any(|&child_id| {
        matches!(
            collection.get(child_id).map(|node| node.kind()),
            Some(NodeKind::OtherwiseExpression) | Some(NodeKind::CatchExpression)
        )
    });
    if has_trailer {
        return None;
    }
    Some(vec![KeywordKind::Or, KeywordKind::Otherwise, KeywordKind::Catch])
}

fn keyword_of(kind: TokenKind) -> Option<KeywordKind> {
    match kind {
        TokenKind::Keyword(keyword) | TokenKind::HashKeyword(keyword) => Some(keyword),
        _ => None,
    }
}

/// The expected set names at least one primary-expression starter — a
/// literal, an identifier, `(`, `{`, `[`, or a unary sign — meaning any
/// expression keyword is also a legal continuation here even if the parser
/// didn't spell every one of them out.
fn expects_expression(expected: &[TokenKind]) -> bool {
    expected.iter().any(|kind| {
        matches!(
            kind,
            TokenKind::Identifier
                | TokenKind::QuotedIdentifier
                | TokenKind::NumericLiteral
                | TokenKind::HexLiteral
                | TokenKind::TextLiteral
                | TokenKind::NullLiteral
                | TokenKind::LeftParenthesis
                | TokenKind::LeftBrace
                | TokenKind::LeftBracket
                | TokenKind::Minus
                | TokenKind::Plus
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pq_parser::cancellation::NeverCancelled;
    use pq_parser::context::ParseContext;

    use crate::active_node;
    use crate::testing::collection_position_and_error;

    fn autocomplete_at(source: &str, code_unit: u32) -> Autocomplete {
        let (collection, position, maybe_error) = collection_position_and_error(source, code_unit);
        let active = active_node::compute(&collection, position, &NeverCancelled).unwrap().unwrap();
        compute(&collection, &active, maybe_error.as_ref())
    }

    fn error_expecting(expected: Vec<TokenKind>) -> ParseError {
        let kind = match expected.as_slice() {
            [single] => ParseErrorKind::ExpectedTokenKind { expected: *single },
            _ => ParseErrorKind::ExpectedAnyTokenKind { expected },
        };
        ParseError::new(kind, None, ParseContext::new())
    }

    #[test]
    fn no_error_means_nothing_required() {
        let collection = Collection::new();
        let active = ActiveNode {
            position: pq_parser::position::SnapshotPosition::new(0, 0, 0),
            ancestry: Vec::new(),
            leaf_kind: crate::active_node::LeafKind::Default,
        };
        let result = compute(&collection, &active, None);
        assert_eq!(result, Autocomplete::empty());
    }

    #[test]
    fn a_single_expected_keyword_is_required() {
        let error = error_expecting(vec![TokenKind::Keyword(KeywordKind::Then)]);
        let expected = expected_token_kinds(&error.kind);
        assert_eq!(expected, vec![TokenKind::Keyword(KeywordKind::Then)]);
        let keywords: Vec<_> = expected.iter().filter_map(|k| keyword_of(*k)).collect();
        assert_eq!(keywords, vec![KeywordKind::Then]);
    }

    #[test]
    fn expression_starters_yield_the_expression_keyword_set() {
        let expected = vec![TokenKind::Identifier, TokenKind::LeftParenthesis, TokenKind::NumericLiteral];
        assert!(expects_expression(&expected));
    }

    #[test]
    fn several_keywords_with_no_expression_starter_are_all_allowed() {
        let expected = vec![TokenKind::Keyword(KeywordKind::Or), TokenKind::Keyword(KeywordKind::Otherwise)];
        assert!(!expects_expression(&expected));
        let keywords: Vec<_> = expected.iter().filter_map(|k| keyword_of(*k)).collect();
        assert_eq!(keywords, vec![KeywordKind::Or, KeywordKind::Otherwise]);
    }

    #[test]
    fn dangling_trailer_prefix_narrows_to_the_one_legal_keyword() {
        // `oth` is a prefix of `otherwise` but not of `or` or `catch`.
        let result = autocomplete_at("try true oth", 12);
        assert_eq!(result.allowed_autocomplete_keywords, Vec::new());
        assert_eq!(result.maybe_required_autocomplete, Some(KeywordKind::Otherwise));
    }

    #[test]
    fn dangling_trailer_prefix_allows_both_matching_keywords() {
        // `o` is a prefix of both `or` and `otherwise`, but not `catch`.
        let result = autocomplete_at("try true o", 10);
        assert_eq!(result.maybe_required_autocomplete, None);
        assert_eq!(result.allowed_autocomplete_keywords, vec![KeywordKind::Or, KeywordKind::Otherwise]);
    }
}
