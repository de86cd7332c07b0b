use std::fmt;

use crate::ast::BinaryOperator;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    Number(Value),
    Identifier(&'a str),

    // Keywords
    Function,

    // Operators
    Assign,                   // =
    Operator(BinaryOperator), // + - * / ^

    // Delimiters
    Comma,  // ,
    LParen, // (
    RParen, // )

    // Structural
    Newline,
    EOF,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind<'a>, span: Span) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(value) => write!(f, "NUMBER({value})"),
            TokenKind::Identifier(name) => write!(f, "ID({name})"),
            TokenKind::Function => write!(f, "FUNCTION"),
            TokenKind::Assign => write!(f, "ASSIGN"),
            TokenKind::Operator(op) => write!(f, "OP({op})"),
            TokenKind::Comma => write!(f, "COMMA"),
            TokenKind::LParen => write!(f, "LPAREN"),
            TokenKind::RParen => write!(f, "RPAREN"),
            TokenKind::Newline => write!(f, "NEWLINE"),
            TokenKind::EOF => write!(f, "EOF"),
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.kind, self.span.start)
    }
}
