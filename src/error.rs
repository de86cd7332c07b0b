use thiserror::Error;

use crate::bytecode::CompileError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::semantic::SemanticError;
use crate::vm::VmError;

/// Any failure of the source-to-result pipeline, tagged with its stage.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error("Parse error: {0}")]
    Parse(ParseError),
    #[error("Semantic error: {0}")]
    Semantic(#[from] SemanticError),
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] VmError),
}

impl From<ParseError> for Error {
    fn from(error: ParseError) -> Self {
        // Lexing happens inside parsing; keep the lex stage visible.
        match error {
            ParseError::Lex(error) => Error::Lex(error),
            other => Error::Parse(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
