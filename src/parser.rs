use thiserror::Error;

use crate::ast::{BinaryOperator, Expression, Program, Statement};
use crate::lexer::{LexError, tokenize};
use crate::token::{Span, Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("Expected {expected} at position {position}, got {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        position: usize,
    },
    #[error("Expression nested deeper than {limit} levels at position {position}")]
    TooDeep { limit: usize, position: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser over a fully tokenized program.
///
/// Precedence from loosest to tightest: `+ -`, `* /`, `^`, call, primary.
/// Every binary level is left-associative, `^` included, so `2 ^ 3 ^ 2`
/// groups as `(2 ^ 3) ^ 2`.
///
/// Expressions are capped at [`MAX_NESTING`] levels of parentheses or call
/// arguments and at [`MAX_EXPRESSION_HEIGHT`] operator and call nodes along
/// any path, so later tree walks stay within the host stack.
pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    nesting: usize,
}

pub const MAX_NESTING: usize = 200;
pub const MAX_EXPRESSION_HEIGHT: usize = 1000;

/// An expression together with the height of its tree.
type Parsed = (Expression, usize);

impl<'a> Parser<'a> {
    pub fn new(mut tokens: Vec<Token<'a>>) -> Self {
        if !matches!(tokens.last(), Some(token) if token.kind == TokenKind::EOF) {
            let end = tokens.last().map(|token| token.span.end).unwrap_or(0);
            tokens.push(Token::new(TokenKind::EOF, Span { start: end, end }));
        }
        Self {
            tokens,
            pos: 0,
            nesting: 0,
        }
    }

    pub fn from_source(input: &'a str) -> ParseResult<Self> {
        Ok(Self::new(tokenize(input)?))
    }

    pub fn parse(mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::EOF) {
            if self.check(TokenKind::Newline) {
                self.advance();
                continue;
            }
            statements.push(self.parse_statement()?);
            // The terminator is optional: `x = 1 y = 2` is two statements.
            if self.check(TokenKind::Newline) {
                self.advance();
            }
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current_kind() {
            TokenKind::Function => self.parse_function_def(),
            TokenKind::Identifier(_) if self.peek_kind() == Some(TokenKind::Assign) => {
                self.parse_assignment()
            }
            _ => Ok(Statement::Expr(self.parse_expression()?)),
        }
    }

    fn parse_function_def(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::Function, "function")?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen, "(")?;

        let mut params = Vec::new();
        if matches!(self.current_kind(), TokenKind::Identifier(_)) {
            params.push(self.expect_identifier()?);
            while self.check(TokenKind::Comma) {
                self.advance();
                params.push(self.expect_identifier()?);
            }
        }
        self.expect(TokenKind::RParen, ")")?;
        self.expect(TokenKind::Assign, "=")?;
        let body = self.parse_expression()?;

        Ok(Statement::FunctionDef { name, params, body })
    }

    fn parse_assignment(&mut self) -> ParseResult<Statement> {
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Assign, "=")?;
        let value = self.parse_expression()?;
        Ok(Statement::Assign { name, value })
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        let (expr, _) = self.parse_nested()?;
        Ok(expr)
    }

    fn parse_nested(&mut self) -> ParseResult<Parsed> {
        if self.nesting >= MAX_NESTING {
            return Err(ParseError::TooDeep {
                limit: MAX_NESTING,
                position: self.current().span.start,
            });
        }
        self.nesting += 1;
        let parsed = self.parse_add_sub();
        self.nesting -= 1;
        parsed
    }

    fn parse_add_sub(&mut self) -> ParseResult<Parsed> {
        self.parse_left_assoc(
            &[BinaryOperator::Add, BinaryOperator::Sub],
            Self::parse_mul_div,
        )
    }

    fn parse_mul_div(&mut self) -> ParseResult<Parsed> {
        self.parse_left_assoc(
            &[BinaryOperator::Mul, BinaryOperator::Div],
            Self::parse_power,
        )
    }

    fn parse_power(&mut self) -> ParseResult<Parsed> {
        self.parse_left_assoc(&[BinaryOperator::Pow], Self::parse_call)
    }

    fn parse_left_assoc(
        &mut self,
        operators: &[BinaryOperator],
        mut operand: impl FnMut(&mut Self) -> ParseResult<Parsed>,
    ) -> ParseResult<Parsed> {
        let (mut expr, mut height) = operand(self)?;
        while let TokenKind::Operator(op) = self.current_kind() {
            if !operators.contains(&op) {
                break;
            }
            let position = self.current().span.start;
            self.advance();
            let (right, right_height) = operand(self)?;
            height = grow(height.max(right_height), position)?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok((expr, height))
    }

    fn parse_call(&mut self) -> ParseResult<Parsed> {
        let (mut expr, mut height) = self.parse_primary()?;
        while self.check(TokenKind::LParen) {
            let position = self.current().span.start;
            self.advance();
            let mut args = Vec::new();
            let mut args_height = 0;
            if !self.check(TokenKind::RParen) {
                loop {
                    let (arg, arg_height) = self.parse_nested()?;
                    args.push(arg);
                    args_height = args_height.max(arg_height);
                    if !self.check(TokenKind::Comma) {
                        break;
                    }
                    self.advance();
                }
            }
            self.expect(TokenKind::RParen, ")")?;
            height = grow(height.max(args_height), position)?;
            expr = Expression::Call {
                callee: Box::new(expr),
                args,
            };
        }
        Ok((expr, height))
    }

    fn parse_primary(&mut self) -> ParseResult<Parsed> {
        match self.current_kind() {
            TokenKind::Number(value) => {
                self.advance();
                Ok((Expression::Number(value), 0))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok((Expression::Var(name.to_string()), 0))
            }
            TokenKind::LParen => {
                self.advance();
                let parsed = self.parse_nested()?;
                self.expect(TokenKind::RParen, ")")?;
                Ok(parsed)
            }
            _ => Err(self.error("expression")),
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        if let TokenKind::Identifier(name) = self.current_kind() {
            self.advance();
            Ok(name.to_string())
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect(&mut self, kind: TokenKind<'a>, expected: &'static str) -> ParseResult<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn check(&self, kind: TokenKind<'a>) -> bool {
        self.current_kind() == kind
    }

    fn current_kind(&self) -> TokenKind<'a> {
        self.current().kind
    }

    fn current(&self) -> &Token<'a> {
        // `new` guarantees a trailing EOF, and `advance` never moves past it.
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> Option<TokenKind<'a>> {
        self.tokens.get(self.pos + 1).map(|token| token.kind)
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error(&self, expected: &'static str) -> ParseError {
        let token = self.current();
        ParseError::UnexpectedToken {
            expected,
            found: token.kind.to_string(),
            position: token.span.start,
        }
    }
}

fn grow(height: usize, position: usize) -> ParseResult<usize> {
    if height >= MAX_EXPRESSION_HEIGHT {
        return Err(ParseError::TooDeep {
            limit: MAX_EXPRESSION_HEIGHT,
            position,
        });
    }
    Ok(height + 1)
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> ParseResult<Program> {
    Parser::new(tokens).parse()
}

pub fn parse(input: &str) -> ParseResult<Program> {
    Parser::from_source(input)?.parse()
}
