//! Parser for module scripts.
//!
//! Converts a token stream into an Abstract Syntax Tree (AST). Every
//! statement must be terminated by a semicolon; there is no automatic
//! semicolon insertion.

#[allow(clippy::module_inception)]
mod parser;

pub use parser::Parser;
