//! Syntax tree built by the parser.
//!
//! The semantic analyzer only reads it and the compiler lowers it into
//! bytecode. Assignments and function definitions are statements, so they can
//! never appear nested inside an expression.

use std::fmt;

use crate::value::Value;

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Number(Value),
    Var(String),
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    /// The callee is any expression syntactically; only a bare `Var` names a
    /// callable function.
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Expression,
    },
    Assign {
        name: String,
        value: Expression,
    },
    Expr(Expression),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Expression {
    /// Name of the function a call expression targets, if it is a plain name.
    pub fn callee_name(&self) -> Option<&str> {
        match self {
            Expression::Var(name) => Some(name),
            _ => None,
        }
    }
}

impl BinaryOperator {
    pub fn symbol(self) -> char {
        match self {
            BinaryOperator::Add => '+',
            BinaryOperator::Sub => '-',
            BinaryOperator::Mul => '*',
            BinaryOperator::Div => '/',
            BinaryOperator::Pow => '^',
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// Indented tree dump, one node per line.

fn write_expression(f: &mut fmt::Formatter<'_>, expr: &Expression, depth: usize) -> fmt::Result {
    let pad = "  ".repeat(depth);
    match expr {
        Expression::Number(value) => writeln!(f, "{pad}Number({value})"),
        Expression::Var(name) => writeln!(f, "{pad}Var({name})"),
        Expression::BinaryOp { left, op, right } => {
            writeln!(f, "{pad}BinaryOp({op})")?;
            write_expression(f, left, depth + 1)?;
            write_expression(f, right, depth + 1)
        }
        Expression::Call { callee, args } => {
            match callee.callee_name() {
                Some(name) => writeln!(f, "{pad}Call({name})")?,
                None => {
                    writeln!(f, "{pad}Call(<expr>)")?;
                    write_expression(f, callee, depth + 1)?;
                }
            }
            for arg in args {
                write_expression(f, arg, depth + 1)?;
            }
            Ok(())
        }
    }
}

fn write_statement(f: &mut fmt::Formatter<'_>, statement: &Statement, depth: usize) -> fmt::Result {
    let pad = "  ".repeat(depth);
    match statement {
        Statement::FunctionDef { name, params, body } => {
            writeln!(f, "{pad}FunctionDef({name}, params=[{}])", params.join(", "))?;
            write_expression(f, body, depth + 1)
        }
        Statement::Assign { name, value } => {
            writeln!(f, "{pad}Assign({name})")?;
            write_expression(f, value, depth + 1)
        }
        Statement::Expr(expr) => write_expression(f, expr, depth),
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_statement(f, self, 0)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Program:")?;
        for statement in &self.statements {
            write_statement(f, statement, 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn renders_program_tree() {
        let program = Program {
            statements: vec![
                Statement::FunctionDef {
                    name: "f".to_string(),
                    params: vec!["x".to_string(), "y".to_string()],
                    body: Expression::BinaryOp {
                        left: Box::new(Expression::Var("x".to_string())),
                        op: BinaryOperator::Pow,
                        right: Box::new(Expression::Var("y".to_string())),
                    },
                },
                Statement::Assign {
                    name: "result".to_string(),
                    value: Expression::Call {
                        callee: Box::new(Expression::Var("f".to_string())),
                        args: vec![
                            Expression::Number(Value::Integer(2)),
                            Expression::Number(Value::Float(0.5)),
                        ],
                    },
                },
            ],
        };

        let expected = indoc! {"
            Program:
              FunctionDef(f, params=[x, y])
                BinaryOp(^)
                  Var(x)
                  Var(y)
              Assign(result)
                Call(f)
                  Number(2)
                  Number(0.5)
        "};
        assert_eq!(program.to_string(), expected);
    }

    #[test]
    fn callee_name_only_for_plain_names() {
        let nested = Expression::Call {
            callee: Box::new(Expression::Var("f".to_string())),
            args: vec![],
        };
        assert_eq!(Expression::Var("f".to_string()).callee_name(), Some("f"));
        assert_eq!(nested.callee_name(), None);
    }
}
