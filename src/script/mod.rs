//! TorqueScript front end: just enough of a lexer and parser to recover
//! function declarations and variable references from a source file.

pub mod ast;
mod lexer;
mod parser;

pub use lexer::tokenize;
pub use parser::parse;

use ast::Stmt;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },
    #[error("line {line}: unterminated block comment")]
    UnterminatedComment { line: usize },
    #[error("line {line}: expected {expected}, found `{found}`")]
    Unexpected {
        line: usize,
        expected: &'static str,
        found: String,
    },
    #[error("unexpected end of file, expected {expected}")]
    UnexpectedEof { expected: &'static str },
}

/// Tokenize and parse a whole source file.
pub fn parse_source(source: &str) -> Result<Vec<Stmt>, ParseError> {
    parse(tokenize(source)?)
}
