//! Every production that doesn't differ between the two parser strategies —
//! spec.md §4.4 "Both share the token cursor and ParseContext... only
//! `read_expression`'s binary-operator cascade differs." Each function here
//! takes the active `Strategy` and calls back into `strategy.read_expression`
//! wherever the grammar recurses into a full expression, so a nested
//! `let`/`if`/record field/argument is parsed by whichever strategy the
//! caller chose at the top.

use super::disambiguation;
use super::state::ParserState;
use super::Strategy;
use crate::pq::ast::{LeafPayload, NodeKind};
use crate::pq::error::{ParseError, ParseErrorKind};
use crate::pq::lexer::snapshot::Token;
use crate::pq::token::grammar::KeywordKind;
use crate::pq::token::TokenKind;

// ---------------------------------------------------------------------
// Small helpers used throughout the grammar below.
// ---------------------------------------------------------------------

fn is_generalized_identifier_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier
            | TokenKind::QuotedIdentifier
            | TokenKind::Keyword(_)
            | TokenKind::HashKeyword(_)
            | TokenKind::NumericLiteral
    )
}

fn is_identifier_literal(state: &ParserState, word: &str) -> bool {
    state.is_kind(TokenKind::Identifier)
        && state
            .current_token()
            .map(|token| token.literal == word)
            .unwrap_or(false)
}

/// Wrap an already-consumed token as a `Constant` leaf — used when the
/// token was pulled off the cursor by something other than `expect`
/// (e.g. `consume_identifier_literal_constant`'s literal check).
fn finish_constant_from(state: &mut ParserState, token: Token) -> u32 {
    let mut builder = state.start_node(NodeKind::Constant);
    builder.start = token.range.start;
    state.finish_leaf(builder, LeafPayload::Constant { literal: token.literal })
}

/// Consume a token of `kind` and record it as a `Constant` leaf — every
/// retained keyword/punctuation token in the CST goes through this (Glossary:
/// "CST: concrete syntax tree retaining every token, including
/// constants/punctuation").
fn consume_constant(state: &mut ParserState, kind: TokenKind) -> Result<u32, ParseError> {
    let token = state.expect(kind)?;
    Ok(finish_constant_from(state, token))
}

/// Consume a plain `Identifier` token whose literal must equal `word` —
/// used for the contextual `function`/`table` type introducers, which are
/// ordinary identifiers rather than reserved keywords.
fn consume_identifier_literal_constant(state: &mut ParserState, word: &str) -> Result<u32, ParseError> {
    if is_identifier_literal(state, word) {
        let token = state.expect(TokenKind::Identifier)?;
        Ok(finish_constant_from(state, token))
    } else {
        Err(state.raise(ParseErrorKind::ExpectedTokenKind {
            expected: TokenKind::Identifier,
        }))
    }
}

fn empty_array_wrapper(state: &mut ParserState) -> u32 {
    let builder = state.start_node(NodeKind::ArrayWrapper);
    state.finish_node(builder)
}

/// One or more comma-separated items, each wrapped in a `Csv` node holding
/// the item and (for all but the last) the trailing comma `Constant`,
/// collected under an `ArrayWrapper`.
fn parse_csv(
    state: &mut ParserState,
    mut parse_item: impl FnMut(&mut ParserState) -> Result<u32, ParseError>,
) -> Result<u32, ParseError> {
    let mut wrapper = state.start_node(NodeKind::ArrayWrapper);
    loop {
        let mut csv_builder = state.start_node(NodeKind::Csv);
        let item_id = parse_item(state)?;
        state.adopt_child(&mut csv_builder, item_id);
        if state.is_kind(TokenKind::Comma) {
            let comma_id = consume_constant(state, TokenKind::Comma)?;
            state.adopt_child(&mut csv_builder, comma_id);
            let csv_id = state.finish_node(csv_builder);
            state.adopt_child(&mut wrapper, csv_id);
            continue;
        }
        let csv_id = state.finish_node(csv_builder);
        state.adopt_child(&mut wrapper, csv_id);
        break;
    }
    Ok(state.finish_node(wrapper))
}

fn unescape_doubled_quotes(inner: &str) -> String {
    inner.replace("\"\"", "\"")
}

fn strip_quotes(raw: &str) -> &str {
    raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(raw)
}

fn text_literal_value(raw: &str) -> String {
    unescape_doubled_quotes(strip_quotes(raw))
}

/// `#"my name"` -> `my name`.
fn quoted_identifier_name(raw: &str) -> String {
    let without_hash = raw.strip_prefix('#').unwrap_or(raw);
    unescape_doubled_quotes(strip_quotes(without_hash))
}

fn is_primitive_type_name(word: &str) -> bool {
    matches!(
        word,
        "any" | "anynonnull"
            | "binary"
            | "date"
            | "datetime"
            | "datetimezone"
            | "duration"
            | "function"
            | "list"
            | "logical"
            | "none"
            | "number"
            | "record"
            | "table"
            | "text"
            | "time"
    )
}

// ---------------------------------------------------------------------
// Identifiers and literals.
// ---------------------------------------------------------------------

/// A `GeneralizedIdentifier`: one or more dot-joined segments, each an
/// identifier, a keyword used as a bare word, a quoted identifier, or a
/// numeric literal (spec.md §4.4 "Generalized identifiers accept a wider
/// token set than plain identifiers"). Always a leaf — its literal is the
/// joined source text, not a child list.
pub(super) fn parse_generalized_identifier(state: &mut ParserState) -> Result<u32, ParseError> {
    let builder = state.start_node(NodeKind::GeneralizedIdentifier);
    let mut literal = String::new();
    let mut consumed_any = false;

    loop {
        if !is_generalized_identifier_start(state.current_kind()) {
            break;
        }
        let token = state.advance()?;
        literal.push_str(&token.literal);
        consumed_any = true;

        if state.is_kind(TokenKind::Dot) {
            let dot = state.advance()?;
            literal.push_str(&dot.literal);
        } else {
            break;
        }
    }

    if !consumed_any {
        return Err(state.raise(ParseErrorKind::ExpectedGeneralizedIdentifier));
    }
    Ok(state.finish_leaf(builder, LeafPayload::GeneralizedIdentifier { literal }))
}

/// A plain `Identifier` leaf: `Identifier | QuotedIdentifier`, optionally
/// `@`-prefixed. `allow_at_prefix` is false in binding-name positions
/// (parameters, section members) where `@` has no meaning.
fn parse_identifier_leaf(state: &mut ParserState, allow_at_prefix: bool) -> Result<u32, ParseError> {
    let builder = state.start_node(NodeKind::Identifier);
    let has_at_prefix = allow_at_prefix && state.is_kind(TokenKind::At);
    if has_at_prefix {
        state.advance()?;
    }
    let token = state.expect_any(&[TokenKind::Identifier, TokenKind::QuotedIdentifier])?;
    let literal = match token.kind {
        TokenKind::QuotedIdentifier => quoted_identifier_name(&token.literal),
        _ => token.literal,
    };
    Ok(state.finish_leaf(builder, LeafPayload::Identifier { literal, has_at_prefix }))
}

/// `IdentifierExpression`: an `Identifier` leaf used at expression position,
/// with its `@` prefix (if any) baked into the leaf itself rather than
/// represented as a sibling `Constant` — spec.md §4.4 "The `@` prefix...
/// binds tighter than any suffix".
fn parse_identifier_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::IdentifierExpression);
    let identifier_id = parse_identifier_leaf(state, true)?;
    state.adopt_child(&mut builder, identifier_id);
    Ok(state.finish_node(builder))
}

/// A `#date(...)`-style hash keyword used as an invocation target: it reads
/// like an identifier (an `InvokeExpression` follows in
/// `parse_recursive_primary_expression`) but the token itself isn't
/// `Identifier`/`QuotedIdentifier`.
fn parse_hash_keyword_invocation_target(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::IdentifierExpression);
    if !matches!(state.current_kind(), TokenKind::HashKeyword(_)) {
        return Err(state.raise(ParseErrorKind::ExpectedGeneralizedIdentifier));
    }
    let inner_builder = state.start_node(NodeKind::Identifier);
    let token = state.advance()?;
    let inner_id = state.finish_leaf(
        inner_builder,
        LeafPayload::Identifier {
            literal: token.literal,
            has_at_prefix: false,
        },
    );
    state.adopt_child(&mut builder, inner_id);
    Ok(state.finish_node(builder))
}

fn parse_literal_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let builder = state.start_node(NodeKind::LiteralExpression);
    match state.current_kind() {
        TokenKind::NumericLiteral => {
            let token = state.advance()?;
            Ok(state.finish_leaf(builder, LeafPayload::NumericLiteral { literal: token.literal }))
        }
        TokenKind::HexLiteral => {
            let token = state.advance()?;
            Ok(state.finish_leaf(builder, LeafPayload::HexLiteral { literal: token.literal }))
        }
        TokenKind::TextLiteral => {
            let token = state.advance()?;
            let value = text_literal_value(&token.literal);
            Ok(state.finish_leaf(builder, LeafPayload::TextLiteral { value }))
        }
        TokenKind::NullLiteral => {
            state.advance()?;
            Ok(state.finish_leaf(builder, LeafPayload::NullLiteral))
        }
        TokenKind::Keyword(KeywordKind::True) | TokenKind::Keyword(KeywordKind::False) => {
            let token = state.advance()?;
            Ok(state.finish_leaf(builder, LeafPayload::Constant { literal: token.literal }))
        }
        _ => Err(state.raise(ParseErrorKind::ExpectedAnyTokenKind {
            expected: vec![
                TokenKind::NumericLiteral,
                TokenKind::HexLiteral,
                TokenKind::TextLiteral,
                TokenKind::NullLiteral,
            ],
        })),
    }
}

// ---------------------------------------------------------------------
// Types. Primitive type names (`number`, `table`, `function`, ...) are
// ordinary identifiers recognized by literal text, not reserved keywords —
// matching real M, and matching `ParseErrorKind::InvalidPrimitiveType`
// existing as a distinct error from `ExpectedTokenKind`.
// ---------------------------------------------------------------------

fn parse_primitive_type(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::PrimitiveType);
    let token = state.expect_any(&[TokenKind::Identifier, TokenKind::Keyword(KeywordKind::Type)])?;
    if token.kind == TokenKind::Identifier && !is_primitive_type_name(&token.literal) {
        return Err(state.raise(ParseErrorKind::InvalidPrimitiveType { literal: token.literal }));
    }
    let constant_id = finish_constant_from(state, token);
    state.adopt_child(&mut builder, constant_id);
    Ok(state.finish_node(builder))
}

/// `NullablePrimitiveType`: `'nullable'? PrimitiveType` — the restricted
/// type grammar allowed at declaration sites (parameter annotations,
/// function return types), as opposed to the full `parse_type` allowed
/// after `type`.
fn parse_nullable_primitive_type(state: &mut ParserState) -> Result<u32, ParseError> {
    if state.is_kind(TokenKind::Keyword(KeywordKind::Nullable)) {
        let mut builder = state.start_node(NodeKind::NullablePrimitiveType);
        let nullable_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Nullable))?;
        state.adopt_child(&mut builder, nullable_id);
        let inner_id = parse_primitive_type(state)?;
        state.adopt_child(&mut builder, inner_id);
        Ok(state.finish_node(builder))
    } else {
        parse_primitive_type(state)
    }
}

pub(super) fn parse_as_nullable_primitive_type(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::AsNullablePrimitiveType);
    let as_id = consume_constant(state, TokenKind::Keyword(KeywordKind::As))?;
    state.adopt_child(&mut builder, as_id);
    let ty_id = parse_nullable_primitive_type(state)?;
    state.adopt_child(&mut builder, ty_id);
    Ok(state.finish_node(builder))
}

/// The general type grammar reachable after a `type` keyword: a primitive
/// name, `nullable <type>`, `{ <type> }`, `[ <field-spec-list> ]`, or the
/// `function`/`table` compound forms (disambiguated from the plain
/// primitive-type names of the same spelling by what follows).
fn parse_type(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    if state.is_kind(TokenKind::Keyword(KeywordKind::Nullable)) {
        let mut builder = state.start_node(NodeKind::NullableType);
        let nullable_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Nullable))?;
        state.adopt_child(&mut builder, nullable_id);
        let inner_id = parse_type(state, strategy)?;
        state.adopt_child(&mut builder, inner_id);
        return Ok(state.finish_node(builder));
    }
    if state.is_kind(TokenKind::LeftBrace) {
        return parse_list_type(state, strategy);
    }
    if state.is_kind(TokenKind::LeftBracket) {
        return parse_record_type(state, strategy);
    }
    if is_identifier_literal(state, "function") && state.peek_kind(1) == TokenKind::LeftParenthesis {
        return parse_function_type(state, strategy);
    }
    if is_identifier_literal(state, "table") && state.peek_kind(1) == TokenKind::LeftBracket {
        return parse_table_type(state, strategy);
    }
    parse_primitive_type(state)
}

fn parse_list_type(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::ListType);
    let lbrace_id = consume_constant(state, TokenKind::LeftBrace)?;
    state.adopt_child(&mut builder, lbrace_id);
    let inner_id = parse_type(state, strategy)?;
    state.adopt_child(&mut builder, inner_id);
    let rbrace_id = consume_constant(state, TokenKind::RightBrace)?;
    state.adopt_child(&mut builder, rbrace_id);
    Ok(state.finish_node(builder))
}

fn parse_record_type(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::RecordType);
    let lbracket_id = consume_constant(state, TokenKind::LeftBracket)?;
    state.adopt_child(&mut builder, lbracket_id);
    let list_id = parse_field_specification_list(state, strategy)?;
    state.adopt_child(&mut builder, list_id);
    let rbracket_id = consume_constant(state, TokenKind::RightBracket)?;
    state.adopt_child(&mut builder, rbracket_id);
    Ok(state.finish_node(builder))
}

/// `FieldSpecificationList`: a csv of `FieldSpecification`s plus an optional
/// trailing `...` open-record marker (`[a = number, ...]`) — handled as a
/// bespoke loop rather than `parse_csv` because `...` can stand in for the
/// next item instead of another field.
fn parse_field_specification_list(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::FieldSpecificationList);
    let mut wrapper = state.start_node(NodeKind::ArrayWrapper);
    let mut open_marker: Option<u32> = None;

    loop {
        if state.is_kind(TokenKind::RightBracket) {
            break;
        }
        if state.is_kind(TokenKind::Ellipsis) {
            open_marker = Some(consume_constant(state, TokenKind::Ellipsis)?);
            break;
        }
        let mut csv_builder = state.start_node(NodeKind::Csv);
        let field_id = parse_field_specification(state, strategy)?;
        state.adopt_child(&mut csv_builder, field_id);
        if state.is_kind(TokenKind::Comma) {
            let comma_id = consume_constant(state, TokenKind::Comma)?;
            state.adopt_child(&mut csv_builder, comma_id);
            let csv_id = state.finish_node(csv_builder);
            state.adopt_child(&mut wrapper, csv_id);
            continue;
        }
        let csv_id = state.finish_node(csv_builder);
        state.adopt_child(&mut wrapper, csv_id);
        break;
    }

    let wrapper_id = state.finish_node(wrapper);
    state.adopt_child(&mut builder, wrapper_id);
    if let Some(open_id) = open_marker {
        state.adopt_child(&mut builder, open_id);
    }
    Ok(state.finish_node(builder))
}

fn parse_field_specification(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::FieldSpecification);
    if state.is_kind(TokenKind::Keyword(KeywordKind::Optional)) {
        let optional_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Optional))?;
        state.adopt_child(&mut builder, optional_id);
    }
    let name_id = parse_generalized_identifier(state)?;
    state.adopt_child(&mut builder, name_id);
    if state.is_kind(TokenKind::Equal) {
        let mut type_spec_builder = state.start_node(NodeKind::FieldTypeSpecification);
        let eq_id = consume_constant(state, TokenKind::Equal)?;
        state.adopt_child(&mut type_spec_builder, eq_id);
        let ty_id = parse_type(state, strategy)?;
        state.adopt_child(&mut type_spec_builder, ty_id);
        let type_spec_id = state.finish_node(type_spec_builder);
        state.adopt_child(&mut builder, type_spec_id);
    }
    Ok(state.finish_node(builder))
}

/// `table [a = number, ...]` — the implicit row-type form. The function-row
/// form (`table <row-type-expression>`) is out of scope; see DESIGN.md.
fn parse_table_type(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::TableType);
    let table_id = consume_identifier_literal_constant(state, "table")?;
    state.adopt_child(&mut builder, table_id);
    let row_id = parse_record_type(state, strategy)?;
    state.adopt_child(&mut builder, row_id);
    Ok(state.finish_node(builder))
}

fn parse_function_type(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::FunctionType);
    let function_id = consume_identifier_literal_constant(state, "function")?;
    state.adopt_child(&mut builder, function_id);
    let params_id = parse_parameter_list(state, strategy)?;
    state.adopt_child(&mut builder, params_id);
    let return_type_id = parse_as_nullable_primitive_type(state)?;
    state.adopt_child(&mut builder, return_type_id);
    Ok(state.finish_node(builder))
}

/// `TypePrimaryType`: the `type <type>` primary expression.
fn parse_type_primary_type(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::TypePrimaryType);
    let type_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Type))?;
    state.adopt_child(&mut builder, type_id);
    let inner_id = parse_type(state, strategy)?;
    state.adopt_child(&mut builder, inner_id);
    Ok(state.finish_node(builder))
}

// ---------------------------------------------------------------------
// Name/value pairs.
// ---------------------------------------------------------------------

fn parse_identifier_paired_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::IdentifierPairedExpression);
    let name_id = parse_identifier_leaf(state, false)?;
    state.adopt_child(&mut builder, name_id);
    let eq_id = consume_constant(state, TokenKind::Equal)?;
    state.adopt_child(&mut builder, eq_id);
    let value_id = strategy.read_expression(state)?;
    state.adopt_child(&mut builder, value_id);
    Ok(state.finish_node(builder))
}

fn parse_generalized_identifier_paired_expression(
    state: &mut ParserState,
    strategy: &dyn Strategy,
) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::GeneralizedIdentifierPairedExpression);
    let name_id = parse_generalized_identifier(state)?;
    state.adopt_child(&mut builder, name_id);
    let eq_id = consume_constant(state, TokenKind::Equal)?;
    state.adopt_child(&mut builder, eq_id);
    let value_id = strategy.read_expression(state)?;
    state.adopt_child(&mut builder, value_id);
    Ok(state.finish_node(builder))
}

fn parse_generalized_identifier_paired_any_literal(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::GeneralizedIdentifierPairedAnyLiteral);
    let name_id = parse_generalized_identifier(state)?;
    state.adopt_child(&mut builder, name_id);
    let eq_id = consume_constant(state, TokenKind::Equal)?;
    state.adopt_child(&mut builder, eq_id);
    let value_id = parse_any_literal(state)?;
    state.adopt_child(&mut builder, value_id);
    Ok(state.finish_node(builder))
}

/// `AnyLiteral`: a literal, or a nested list/record built entirely out of
/// further `AnyLiteral`s — the restricted sub-grammar `RecordLiteral` and
/// `ListLiteral` fields are built from.
fn parse_any_literal(state: &mut ParserState) -> Result<u32, ParseError> {
    match state.current_kind() {
        TokenKind::LeftBracket => parse_record_literal(state),
        TokenKind::LeftBrace => parse_list_literal(state),
        _ => parse_literal_expression(state),
    }
}

// ---------------------------------------------------------------------
// Records and lists. `[...]`/`{...}` at a primary position is tried first
// as the literal-only form (`RecordLiteral`/`ListLiteral`) and falls back
// to the general expression form on the first non-literal field/item —
// see DESIGN.md for why both forms exist.
// ---------------------------------------------------------------------

fn parse_record_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::RecordExpression);
    let lbracket_id = consume_constant(state, TokenKind::LeftBracket)?;
    state.adopt_child(&mut builder, lbracket_id);
    let fields_id = if state.is_kind(TokenKind::RightBracket) {
        empty_array_wrapper(state)
    } else {
        parse_csv(state, |state| parse_generalized_identifier_paired_expression(state, strategy))?
    };
    state.adopt_child(&mut builder, fields_id);
    let rbracket_id = consume_constant(state, TokenKind::RightBracket)?;
    state.adopt_child(&mut builder, rbracket_id);
    Ok(state.finish_node(builder))
}

fn parse_record_literal(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::RecordLiteral);
    let lbracket_id = consume_constant(state, TokenKind::LeftBracket)?;
    state.adopt_child(&mut builder, lbracket_id);
    let fields_id = if state.is_kind(TokenKind::RightBracket) {
        empty_array_wrapper(state)
    } else {
        parse_csv(state, parse_generalized_identifier_paired_any_literal)?
    };
    state.adopt_child(&mut builder, fields_id);
    let rbracket_id = consume_constant(state, TokenKind::RightBracket)?;
    state.adopt_child(&mut builder, rbracket_id);
    Ok(state.finish_node(builder))
}

fn parse_list_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::ListExpression);
    let lbrace_id = consume_constant(state, TokenKind::LeftBrace)?;
    state.adopt_child(&mut builder, lbrace_id);
    let items_id = if state.is_kind(TokenKind::RightBrace) {
        empty_array_wrapper(state)
    } else {
        parse_csv(state, |state| parse_list_item(state, strategy))?
    };
    state.adopt_child(&mut builder, items_id);
    let rbrace_id = consume_constant(state, TokenKind::RightBrace)?;
    state.adopt_child(&mut builder, rbrace_id);
    Ok(state.finish_node(builder))
}

fn parse_list_literal(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::ListLiteral);
    let lbrace_id = consume_constant(state, TokenKind::LeftBrace)?;
    state.adopt_child(&mut builder, lbrace_id);
    let items_id = if state.is_kind(TokenKind::RightBrace) {
        empty_array_wrapper(state)
    } else {
        parse_csv(state, parse_any_literal)?
    };
    state.adopt_child(&mut builder, items_id);
    let rbrace_id = consume_constant(state, TokenKind::RightBrace)?;
    state.adopt_child(&mut builder, rbrace_id);
    Ok(state.finish_node(builder))
}

/// A list item, or `item..item` — the `{1..2}` `RangeExpression` shorthand.
fn parse_list_item(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let first_id = strategy.read_expression(state)?;
    if state.is_kind(TokenKind::DotDot) {
        let mut range_builder = state.start_node_from_child(NodeKind::RangeExpression, first_id);
        state.adopt_child(&mut range_builder, first_id);
        let dotdot_id = consume_constant(state, TokenKind::DotDot)?;
        state.adopt_child(&mut range_builder, dotdot_id);
        let second_id = strategy.read_expression(state)?;
        state.adopt_child(&mut range_builder, second_id);
        return Ok(state.finish_node(range_builder));
    }
    Ok(first_id)
}

fn parse_bracket_primary(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    disambiguation::either(
        state,
        |state| parse_record_literal(state),
        |state| parse_record_expression(state, strategy),
    )
}

fn parse_brace_primary(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    disambiguation::either(
        state,
        |state| parse_list_literal(state),
        |state| parse_list_expression(state, strategy),
    )
}

// ---------------------------------------------------------------------
// Control-flow and error-handling expressions.
// ---------------------------------------------------------------------

fn parse_let_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::LetExpression);
    let let_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Let))?;
    state.adopt_child(&mut builder, let_id);
    let bindings_id = parse_csv(state, |state| parse_generalized_identifier_paired_expression(state, strategy))?;
    state.adopt_child(&mut builder, bindings_id);
    let in_id = consume_constant(state, TokenKind::Keyword(KeywordKind::In))?;
    state.adopt_child(&mut builder, in_id);
    let body_id = strategy.read_expression(state)?;
    state.adopt_child(&mut builder, body_id);
    Ok(state.finish_node(builder))
}

fn parse_if_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::IfExpression);
    let if_id = consume_constant(state, TokenKind::Keyword(KeywordKind::If))?;
    state.adopt_child(&mut builder, if_id);
    let condition_id = strategy.read_expression(state)?;
    state.adopt_child(&mut builder, condition_id);
    let then_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Then))?;
    state.adopt_child(&mut builder, then_id);
    let true_id = strategy.read_expression(state)?;
    state.adopt_child(&mut builder, true_id);
    let else_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Else))?;
    state.adopt_child(&mut builder, else_id);
    let false_id = strategy.read_expression(state)?;
    state.adopt_child(&mut builder, false_id);
    Ok(state.finish_node(builder))
}

fn parse_each_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::EachExpression);
    let each_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Each))?;
    state.adopt_child(&mut builder, each_id);
    let body_id = strategy.read_expression(state)?;
    state.adopt_child(&mut builder, body_id);
    Ok(state.finish_node(builder))
}

fn parse_error_raising_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::ErrorRaisingExpression);
    let error_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Error))?;
    state.adopt_child(&mut builder, error_id);
    let value_id = strategy.read_expression(state)?;
    state.adopt_child(&mut builder, value_id);
    Ok(state.finish_node(builder))
}

/// `try <expr> [otherwise <expr> | catch (param) => <expr>]`. The `catch`
/// trailer is this implementation's resolution of spec.md's open question
/// on catch-clause support: modeled as a first-class alternative to
/// `otherwise`, taking a handler function over the caught error record.
fn parse_error_handling_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::ErrorHandlingExpression);
    let try_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Try))?;
    state.adopt_child(&mut builder, try_id);
    let protected_id = strategy.read_expression(state)?;
    state.adopt_child(&mut builder, protected_id);

    if state.is_kind(TokenKind::Keyword(KeywordKind::Otherwise)) {
        let mut trailer = state.start_node(NodeKind::OtherwiseExpression);
        let otherwise_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Otherwise))?;
        state.adopt_child(&mut trailer, otherwise_id);
        let handler_id = strategy.read_expression(state)?;
        state.adopt_child(&mut trailer, handler_id);
        let trailer_id = state.finish_node(trailer);
        state.adopt_child(&mut builder, trailer_id);
    } else if state.is_kind(TokenKind::Keyword(KeywordKind::Catch)) {
        let mut trailer = state.start_node(NodeKind::CatchExpression);
        let catch_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Catch))?;
        state.adopt_child(&mut trailer, catch_id);
        let handler_id = parse_function_expression(state, strategy)?;
        state.adopt_child(&mut trailer, handler_id);
        let trailer_id = state.finish_node(trailer);
        state.adopt_child(&mut builder, trailer_id);
    }

    Ok(state.finish_node(builder))
}

fn parse_not_implemented_expression(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::NotImplementedExpression);
    let ellipsis_id = consume_constant(state, TokenKind::Ellipsis)?;
    state.adopt_child(&mut builder, ellipsis_id);
    Ok(state.finish_node(builder))
}

// ---------------------------------------------------------------------
// Functions and parameters.
// ---------------------------------------------------------------------

fn parse_parameter(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::Parameter);
    if state.is_kind(TokenKind::Keyword(KeywordKind::Optional)) {
        let optional_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Optional))?;
        state.adopt_child(&mut builder, optional_id);
    }
    let name_id = parse_identifier_leaf(state, false)?;
    state.adopt_child(&mut builder, name_id);
    if state.is_kind(TokenKind::Keyword(KeywordKind::As)) {
        let type_id = parse_as_nullable_primitive_type(state)?;
        state.adopt_child(&mut builder, type_id);
    }
    Ok(state.finish_node(builder))
}

pub(super) fn parse_parameter_list(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::ParameterList);
    let lparen_id = consume_constant(state, TokenKind::LeftParenthesis)?;
    state.adopt_child(&mut builder, lparen_id);
    let params_id = if state.is_kind(TokenKind::RightParenthesis) {
        empty_array_wrapper(state)
    } else {
        parse_csv(state, |state| parse_parameter(state))?
    };
    state.adopt_child(&mut builder, params_id);
    let rparen_id = consume_constant(state, TokenKind::RightParenthesis)?;
    state.adopt_child(&mut builder, rparen_id);
    let _ = strategy;
    Ok(state.finish_node(builder))
}

fn parse_function_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::FunctionExpression);
    let params_id = parse_parameter_list(state, strategy)?;
    state.adopt_child(&mut builder, params_id);
    if state.is_kind(TokenKind::Keyword(KeywordKind::As)) {
        let return_type_id = parse_as_nullable_primitive_type(state)?;
        state.adopt_child(&mut builder, return_type_id);
    }
    let arrow_id = consume_constant(state, TokenKind::FatArrow)?;
    state.adopt_child(&mut builder, arrow_id);
    let body_id = strategy.read_expression(state)?;
    state.adopt_child(&mut builder, body_id);
    Ok(state.finish_node(builder))
}

fn parse_parenthesized_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::ParenthesizedExpression);
    let lparen_id = consume_constant(state, TokenKind::LeftParenthesis)?;
    state.adopt_child(&mut builder, lparen_id);
    let inner_id = strategy.read_expression(state)?;
    state.adopt_child(&mut builder, inner_id);
    let rparen_id = consume_constant(state, TokenKind::RightParenthesis)?;
    state.adopt_child(&mut builder, rparen_id);
    Ok(state.finish_node(builder))
}

/// `(x, y) => ...` vs `(expr)` — spec.md §4.4's two-way prefix ambiguity,
/// resolved by attempting the function form first.
fn parse_function_or_parenthesized_expression(
    state: &mut ParserState,
    strategy: &dyn Strategy,
) -> Result<u32, ParseError> {
    disambiguation::either(
        state,
        |state| parse_function_expression(state, strategy),
        |state| parse_parenthesized_expression(state, strategy),
    )
}

// ---------------------------------------------------------------------
// `RecursivePrimaryExpression`: a primary expression followed by zero or
// more postfix operators (spec.md §4.4 "chains InvokeExpression |
// ItemAccessExpression | FieldSelector | FieldProjection left-to-right").
// ---------------------------------------------------------------------

fn parse_invoke_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::InvokeExpression);
    let lparen_id = consume_constant(state, TokenKind::LeftParenthesis)?;
    state.adopt_child(&mut builder, lparen_id);
    let args_id = if state.is_kind(TokenKind::RightParenthesis) {
        empty_array_wrapper(state)
    } else {
        parse_csv(state, |state| strategy.read_expression(state))?
    };
    state.adopt_child(&mut builder, args_id);
    let rparen_id = consume_constant(state, TokenKind::RightParenthesis)?;
    state.adopt_child(&mut builder, rparen_id);
    Ok(state.finish_node(builder))
}

fn parse_item_access_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::ItemAccessExpression);
    let lbrace_id = consume_constant(state, TokenKind::LeftBrace)?;
    state.adopt_child(&mut builder, lbrace_id);
    let index_id = strategy.read_expression(state)?;
    state.adopt_child(&mut builder, index_id);
    let rbrace_id = consume_constant(state, TokenKind::RightBrace)?;
    state.adopt_child(&mut builder, rbrace_id);
    if state.is_kind(TokenKind::QuestionMark) {
        let optional_id = consume_constant(state, TokenKind::QuestionMark)?;
        state.adopt_child(&mut builder, optional_id);
    }
    Ok(state.finish_node(builder))
}

fn parse_field_selector(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::FieldSelector);
    let lbracket_id = consume_constant(state, TokenKind::LeftBracket)?;
    state.adopt_child(&mut builder, lbracket_id);
    let name_id = parse_generalized_identifier(state)?;
    state.adopt_child(&mut builder, name_id);
    let rbracket_id = consume_constant(state, TokenKind::RightBracket)?;
    state.adopt_child(&mut builder, rbracket_id);
    if state.is_kind(TokenKind::QuestionMark) {
        let optional_id = consume_constant(state, TokenKind::QuestionMark)?;
        state.adopt_child(&mut builder, optional_id);
    }
    Ok(state.finish_node(builder))
}

/// `record[[a], [b]]` — an outer bracket around a csv of single-field
/// selectors.
fn parse_field_projection(state: &mut ParserState) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::FieldProjection);
    let lbracket_id = consume_constant(state, TokenKind::LeftBracket)?;
    state.adopt_child(&mut builder, lbracket_id);
    let selectors_id = parse_csv(state, parse_field_selector)?;
    state.adopt_child(&mut builder, selectors_id);
    let rbracket_id = consume_constant(state, TokenKind::RightBracket)?;
    state.adopt_child(&mut builder, rbracket_id);
    if state.is_kind(TokenKind::QuestionMark) {
        let optional_id = consume_constant(state, TokenKind::QuestionMark)?;
        state.adopt_child(&mut builder, optional_id);
    }
    Ok(state.finish_node(builder))
}

fn parse_recursive_primary_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::RecursivePrimaryExpression);
    let head_id = parse_primary_expression(state, strategy)?;
    state.adopt_child(&mut builder, head_id);

    loop {
        match state.current_kind() {
            TokenKind::LeftParenthesis => {
                let invoke_id = parse_invoke_expression(state, strategy)?;
                state.adopt_child(&mut builder, invoke_id);
            }
            TokenKind::LeftBrace => {
                let item_access_id = parse_item_access_expression(state, strategy)?;
                state.adopt_child(&mut builder, item_access_id);
            }
            TokenKind::LeftBracket => {
                let selector_or_projection_id =
                    disambiguation::either(state, |state| parse_field_selector(state), parse_field_projection)?;
                state.adopt_child(&mut builder, selector_or_projection_id);
            }
            _ => break,
        }
    }

    Ok(state.finish_node(builder))
}

fn parse_primary_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    match state.current_kind() {
        TokenKind::LeftParenthesis => parse_function_or_parenthesized_expression(state, strategy),
        TokenKind::LeftBracket => parse_bracket_primary(state, strategy),
        TokenKind::LeftBrace => parse_brace_primary(state, strategy),
        TokenKind::Keyword(KeywordKind::Let) => parse_let_expression(state, strategy),
        TokenKind::Keyword(KeywordKind::If) => parse_if_expression(state, strategy),
        TokenKind::Keyword(KeywordKind::Each) => parse_each_expression(state, strategy),
        TokenKind::Keyword(KeywordKind::Error) => parse_error_raising_expression(state, strategy),
        TokenKind::Keyword(KeywordKind::Try) => parse_error_handling_expression(state, strategy),
        TokenKind::Keyword(KeywordKind::Type) => parse_type_primary_type(state, strategy),
        TokenKind::Keyword(KeywordKind::True) | TokenKind::Keyword(KeywordKind::False) => {
            parse_literal_expression(state)
        }
        TokenKind::Ellipsis => parse_not_implemented_expression(state),
        TokenKind::At | TokenKind::Identifier | TokenKind::QuotedIdentifier => parse_identifier_expression(state),
        TokenKind::HashKeyword(_) => parse_hash_keyword_invocation_target(state),
        kind if kind.is_literal() => parse_literal_expression(state),
        _ => Err(state.raise(ParseErrorKind::ExpectedAnyTokenKind {
            expected: vec![TokenKind::Identifier, TokenKind::LeftParenthesis, TokenKind::LeftBracket],
        })),
    }
}

/// The floor of every binary-operator cascade: `('+' | '-' | 'not')
/// UnaryExpression | RecursivePrimaryExpression`.
pub(super) fn parse_unary_expression(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    if matches!(
        state.current_kind(),
        TokenKind::Plus | TokenKind::Minus | TokenKind::Keyword(KeywordKind::Not)
    ) {
        let mut builder = state.start_node(NodeKind::UnaryExpression);
        let operator_kind = state.current_kind();
        let operator_id = consume_constant(state, operator_kind)?;
        state.adopt_child(&mut builder, operator_id);
        let operand_id = parse_unary_expression(state, strategy)?;
        state.adopt_child(&mut builder, operand_id);
        return Ok(state.finish_node(builder));
    }
    parse_recursive_primary_expression(state, strategy)
}

// ---------------------------------------------------------------------
// Binary-operator trailer builders, shared by both strategies' cascades so
// neither can silently build a differently-shaped wrapper node. `as`/`is`
// get their own helpers because their right-hand side is a type, not a
// recursively-parsed expression (spec.md §4.4).
// ---------------------------------------------------------------------

pub(super) fn parse_binary_trailer(
    state: &mut ParserState,
    kind: NodeKind,
    left_id: u32,
    operator_kind: TokenKind,
    parse_right: impl FnOnce(&mut ParserState) -> Result<u32, ParseError>,
) -> Result<u32, ParseError> {
    let mut builder = state.start_node_from_child(kind, left_id);
    state.adopt_child(&mut builder, left_id);
    let operator_id = consume_constant(state, operator_kind)?;
    state.adopt_child(&mut builder, operator_id);
    let right_id = parse_right(state)?;
    state.adopt_child(&mut builder, right_id);
    Ok(state.finish_node(builder))
}

pub(super) fn parse_as_trailer(state: &mut ParserState, left_id: u32) -> Result<u32, ParseError> {
    let mut builder = state.start_node_from_child(NodeKind::AsExpression, left_id);
    state.adopt_child(&mut builder, left_id);
    let as_id = consume_constant(state, TokenKind::Keyword(KeywordKind::As))?;
    state.adopt_child(&mut builder, as_id);
    let ty_id = parse_nullable_primitive_type(state)?;
    state.adopt_child(&mut builder, ty_id);
    Ok(state.finish_node(builder))
}

pub(super) fn parse_is_trailer(state: &mut ParserState, left_id: u32) -> Result<u32, ParseError> {
    let mut builder = state.start_node_from_child(NodeKind::IsExpression, left_id);
    state.adopt_child(&mut builder, left_id);
    let is_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Is))?;
    state.adopt_child(&mut builder, is_id);
    let ty_id = parse_nullable_primitive_type(state)?;
    state.adopt_child(&mut builder, ty_id);
    Ok(state.finish_node(builder))
}

// ---------------------------------------------------------------------
// Document / section.
// ---------------------------------------------------------------------

fn parse_identifier_paired_expression_member(
    state: &mut ParserState,
    strategy: &dyn Strategy,
) -> Result<u32, ParseError> {
    parse_identifier_paired_expression(state, strategy)
}

fn parse_section_member(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::SectionMember);
    if state.is_kind(TokenKind::Keyword(KeywordKind::Shared)) {
        let shared_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Shared))?;
        state.adopt_child(&mut builder, shared_id);
    }
    let paired_id = parse_identifier_paired_expression_member(state, strategy)?;
    state.adopt_child(&mut builder, paired_id);
    let semicolon_id = consume_constant(state, TokenKind::Semicolon)?;
    state.adopt_child(&mut builder, semicolon_id);
    Ok(state.finish_node(builder))
}

fn parse_section(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    let mut builder = state.start_node(NodeKind::Section);
    let section_id = consume_constant(state, TokenKind::Keyword(KeywordKind::Section))?;
    state.adopt_child(&mut builder, section_id);
    if is_generalized_identifier_start(state.current_kind()) {
        let name_id = parse_generalized_identifier(state)?;
        state.adopt_child(&mut builder, name_id);
    }
    let semicolon_id = consume_constant(state, TokenKind::Semicolon)?;
    state.adopt_child(&mut builder, semicolon_id);

    let mut members_wrapper = state.start_node(NodeKind::ArrayWrapper);
    while matches!(
        state.current_kind(),
        TokenKind::Keyword(KeywordKind::Shared) | TokenKind::Identifier | TokenKind::QuotedIdentifier
    ) {
        state
            .check_cancellation()
            .map_err(|err| state.raise(ParseErrorKind::Cancelled(err)))?;
        let member_id = parse_section_member(state, strategy)?;
        state.adopt_child(&mut members_wrapper, member_id);
    }
    let members_id = state.finish_node(members_wrapper);
    state.adopt_child(&mut builder, members_id);

    Ok(state.finish_node(builder))
}

/// `Document`: a `Section`, or a bare `Expression` — spec.md §4.4.
pub(super) fn parse_document(state: &mut ParserState, strategy: &dyn Strategy) -> Result<u32, ParseError> {
    if state.is_kind(TokenKind::Keyword(KeywordKind::Section)) {
        parse_section(state, strategy)
    } else {
        strategy.read_expression(state)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::pq::node_id_map::Collection;
    use crate::pq::parser::ParserKind;
    use crate::pq::testing::parse_source;

    use super::*;

    fn child_kind(collection: &Collection, id: u32) -> NodeKind {
        collection.get(id).expect("child id resolves to a node").kind()
    }

    #[rstest(kind => [ParserKind::RecursiveDescent, ParserKind::Combinatorial])]
    fn let_expression_has_its_four_top_level_children(kind: ParserKind) {
        let outcome = parse_source("let x = 1 in x", kind)
            .expect("lexes and snapshots cleanly")
            .expect("parses cleanly");

        // Every primary is wrapped in a `RecursivePrimaryExpression`, so the
        // document root is that wrapper around the `let`, not the `let` itself.
        let root = outcome.collection.get(outcome.root_id).expect("root id resolves");
        assert_eq!(root.kind(), NodeKind::RecursivePrimaryExpression);
        let wrapped = outcome.collection.child_ids(outcome.root_id);
        assert_eq!(wrapped.len(), 1);
        assert_eq!(child_kind(&outcome.collection, wrapped[0]), NodeKind::LetExpression);

        let let_children = outcome.collection.child_ids(wrapped[0]);
        let kinds: Vec<NodeKind> = let_children.iter().map(|&id| child_kind(&outcome.collection, id)).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Constant,              // `let`
                NodeKind::ArrayWrapper,           // `x = 1`
                NodeKind::Constant,               // `in`
                NodeKind::RecursivePrimaryExpression, // `x`
            ]
        );
    }

    #[rstest(kind => [ParserKind::RecursiveDescent, ParserKind::Combinatorial])]
    fn a_dangling_trailing_comma_leaves_an_unfinished_csv_slot(kind: ParserKind) {
        let outcome = parse_source("Foo(a,)", kind).expect("lexes and snapshots cleanly");
        let failure = outcome.expect_err("a csv item can't start at ')'");

        let invoke = failure
            .collection
            .context_nodes()
            .find(|node| node.kind == NodeKind::InvokeExpression)
            .expect("the open InvokeExpression survives as a context node");

        let args_wrapper_id = failure
            .collection
            .child_ids(invoke.id)
            .iter()
            .copied()
            .find(|&id| child_kind(&failure.collection, id) == NodeKind::ArrayWrapper)
            .expect("InvokeExpression's argument list starts even though it never finishes");

        let csv_ids = failure.collection.child_ids(args_wrapper_id);
        assert_eq!(csv_ids.len(), 2, "one finished csv slot for `a,`, one dangling slot for the trailing comma");

        // The dangling slot never got an item adopted into it — the only
        // thing under it is the `RecursivePrimaryExpression` that was opened
        // (and immediately abandoned) trying to read one starting at `)`.
        let dangling_children = failure.collection.child_ids(csv_ids[1]);
        assert_eq!(dangling_children.len(), 1);
        assert_eq!(child_kind(&failure.collection, dangling_children[0]), NodeKind::RecursivePrimaryExpression);
        assert!(failure.collection.child_ids(dangling_children[0]).is_empty());
    }
}
