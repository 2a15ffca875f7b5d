/*!
# Rust Language Module

This Rust module provides lexical analysis and compilation of the
macro language into stack machine programs.

*/

/// Character position in macro source text.
pub type Offset = usize;

#[macro_use]
mod error;
mod lex;
mod parse;

pub mod define;
pub mod token;

pub use define::{Driver, Item};
pub use error::Error;
pub use error::ErrorCode;
pub use lex::{delete_is_keyword, lex, Lexer};
pub use parse::{check, compile, compile_with, is_valid, Compilation};
