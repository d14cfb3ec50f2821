//! Settings — spec.md §6 "Settings (enumerated)": `locale`, `parser`,
//! `parserEntryPoint`, `cancellationToken`.
//!
//! Plain builder-style structs assembled by the embedding tool at each call
//! site, not a loaded/layered configuration object — there is no
//! deployment-scoped config here, only call-scoped choices (see SPEC_FULL.md
//! §6 Ambient note). Mirrors how the teacher's `lex-analysis` crate takes a
//! `Document`/`Position` pair as plain arguments rather than a config type.

use crate::pq::cancellation::{CancellationToken, NeverCancelled};
use crate::pq::parser::{ParserEntryPoint, ParserKind};

/// Settings for `Lexer::try_lex`.
#[derive(Clone, Copy)]
pub struct LexSettings<'a> {
    pub locale: &'a str,
    pub cancellation: &'a dyn CancellationToken,
}

impl<'a> LexSettings<'a> {
    pub fn new(locale: &'a str, cancellation: &'a dyn CancellationToken) -> Self {
        Self { locale, cancellation }
    }
}

impl Default for LexSettings<'static> {
    fn default() -> Self {
        Self {
            locale: "en-US",
            cancellation: &NeverCancelled,
        }
    }
}

/// Settings for `Parser::try_read`; extends `LexSettings` with the two
/// parser-specific knobs.
#[derive(Clone, Copy)]
pub struct ParseSettings<'a> {
    pub locale: &'a str,
    pub parser_kind: ParserKind,
    pub parser_entry_point: ParserEntryPoint,
    pub cancellation: &'a dyn CancellationToken,
}

impl<'a> ParseSettings<'a> {
    pub fn new(
        locale: &'a str,
        parser_kind: ParserKind,
        parser_entry_point: ParserEntryPoint,
        cancellation: &'a dyn CancellationToken,
    ) -> Self {
        Self {
            locale,
            parser_kind,
            parser_entry_point,
            cancellation,
        }
    }

    pub fn with_parser_kind(mut self, parser_kind: ParserKind) -> Self {
        self.parser_kind = parser_kind;
        self
    }

    pub fn with_entry_point(mut self, entry_point: ParserEntryPoint) -> Self {
        self.parser_entry_point = entry_point;
        self
    }
}

impl Default for ParseSettings<'static> {
    fn default() -> Self {
        Self {
            locale: "en-US",
            parser_kind: ParserKind::RecursiveDescent,
            parser_entry_point: ParserEntryPoint::Document,
            cancellation: &NeverCancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parse_settings_pick_recursive_descent_and_document_entry() {
        let settings = ParseSettings::default();
        assert_eq!(settings.parser_kind, ParserKind::RecursiveDescent);
        assert_eq!(settings.parser_entry_point, ParserEntryPoint::Document);
    }

    #[test]
    fn with_parser_kind_overrides_default() {
        let settings = ParseSettings::default().with_parser_kind(ParserKind::Combinatorial);
        assert_eq!(settings.parser_kind, ParserKind::Combinatorial);
    }
}
