//! # pq-parser
//!
//! Lexer, grammar tables, and recoverable CST parser for the Power Query / M
//! formula language.
//!
//! File layout
//!
//! Two parser strategies live side by side under `pq::parser`:
//! `recursive_descent` (a hand-written cascade) and `combinatorial` (a
//! table-driven, Pratt-style reader for binary operators). Both consume the
//! same `pq::lexer::snapshot::LexerSnapshot` and build into the same
//! `pq::ast`/`pq::context` shape through the shared `ParserState` cursor, so
//! the two designs can be compared token-for-token and node-for-node without
//! either one committing the other to implementation details.
//!
//! The lexer (`pq::lexer`) is line-oriented and resumable: editing one line
//! only re-tokenizes downstream lines until the inherited line-mode
//! reconverges. `pq::lexer::snapshot` then flattens that per-line state into
//! the single linear token stream the parser actually reads.

pub mod pq;

pub use pq::ast;
pub use pq::cancellation;
pub use pq::context;
pub use pq::error;
pub use pq::lexer;
pub use pq::node_id_map;
pub use pq::parser;
pub use pq::position;
pub use pq::settings;
pub use pq::token;

#[cfg(any(test, feature = "test-support"))]
pub use pq::testing;
