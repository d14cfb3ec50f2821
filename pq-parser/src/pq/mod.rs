//! Core module tree: lexer, grammar tables, parse context arena, the two
//! parser strategies, the node-id map, and the shared error taxonomy.

pub mod ast;
pub mod cancellation;
pub mod context;
pub mod error;
pub mod lexer;
pub mod node_id_map;
pub mod parser;
pub mod position;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod token;
