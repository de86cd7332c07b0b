use std::{iter::Peekable, str::CharIndices};

use crate::ast::BinaryOperator;
use crate::token::{Span, Token, TokenKind};
use crate::value::Value;

mod error;

pub use error::{LexError, LexResult};

/// Lazily turns source text into tokens.
///
/// Iteration yields exactly one `EOF` token and then stops. The first
/// unrecognised character ends the stream with an error.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            finished: false,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        self.skip_whitespace();

        let Some(&(start, ch)) = self.chars.peek() else {
            let end = self.input.len();
            return Ok(Token::new(TokenKind::EOF, Span { start: end, end }));
        };

        let kind = match ch {
            c if c.is_ascii_digit() => return self.read_number(start),
            c if c.is_ascii_alphabetic() || c == '_' => return Ok(self.read_identifier(start)),
            '=' => TokenKind::Assign,
            ',' => TokenKind::Comma,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '+' => TokenKind::Operator(BinaryOperator::Add),
            '-' => TokenKind::Operator(BinaryOperator::Sub),
            '*' => TokenKind::Operator(BinaryOperator::Mul),
            '/' => TokenKind::Operator(BinaryOperator::Div),
            '^' => TokenKind::Operator(BinaryOperator::Pow),
            '\n' => TokenKind::Newline,
            _ => {
                return Err(LexError::UnexpectedCharacter {
                    character: ch,
                    position: start,
                });
            }
        };
        self.chars.next();
        Ok(Token::new(
            kind,
            Span {
                start,
                end: start + 1,
            },
        ))
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if matches!(c, ' ' | '\t' | '\r') {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        self.chars.next(); // Consume first char
        let end = self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_');

        let ident = &self.input[start..end];
        let kind = match ident {
            "function" => TokenKind::Function,
            _ => TokenKind::Identifier(ident),
        };
        Token::new(kind, Span { start, end })
    }

    fn read_number(&mut self, start: usize) -> LexResult<Token<'a>> {
        let mut end = self.consume_while(|c| c.is_ascii_digit());

        // A '.' only belongs to the literal when digits follow it.
        let mut lookahead = self.chars.clone();
        let is_float = matches!(lookahead.next(), Some((_, '.')))
            && matches!(lookahead.peek(), Some((_, c)) if c.is_ascii_digit());
        if is_float {
            self.chars.next(); // Consume '.'
            end = self.consume_while(|c| c.is_ascii_digit());
        }

        let literal = &self.input[start..end];
        let invalid = || LexError::InvalidNumberLiteral {
            literal: literal.to_string(),
            position: start,
        };
        let value = if is_float {
            Value::Float(literal.parse::<f64>().map_err(|_| invalid())?)
        } else {
            Value::Integer(literal.parse::<i64>().map_err(|_| invalid())?)
        };
        Ok(Token::new(TokenKind::Number(value), Span { start, end }))
    }

    /// Consumes characters matching `predicate` and returns the end offset.
    fn consume_while(&mut self, predicate: impl Fn(char) -> bool) -> usize {
        while let Some(&(_, c)) = self.chars.peek() {
            if predicate(c) {
                self.chars.next();
            } else {
                break;
            }
        }
        self.current_index()
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) if token.kind == TokenKind::EOF => self.finished = true,
            Err(_) => self.finished = true,
            Ok(_) => {}
        }
        Some(result)
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token<'_>>> {
    Lexer::new(input).collect()
}
