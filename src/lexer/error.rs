use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("Invalid number literal '{literal}' at position {position}")]
    InvalidNumberLiteral { literal: String, position: usize },
}

pub type LexResult<T> = Result<T, LexError>;
