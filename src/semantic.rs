//! Static checks run between parsing and compilation.
//!
//! Two passes over the program: the first records every function signature,
//! the second walks statements top to bottom, checking names and call arity.
//! A global is only known once its assignment has been visited, so a variable
//! must be assigned by an earlier statement before it is read.

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::ast::{Expression, Program, Statement};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("Function '{name}' already defined")]
    DuplicateFunction { name: String },
    #[error("Function '{function}' declares parameter '{name}' more than once")]
    DuplicateParameter { function: String, name: String },
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Call to undefined function '{name}'")]
    UndefinedFunction { name: String },
    #[error("Function '{name}' expected {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Unsupported call expression: only named functions can be called")]
    UnsupportedCallTarget,
}

pub type SemanticResult<T> = Result<T, SemanticError>;

/// Validates a parsed program without transforming it.
///
/// The analyzer keeps no state between calls, so analyzing the same program
/// twice always yields the same verdict.
#[derive(Debug, Default)]
pub struct SemanticAnalyzer;

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, program: &Program) -> SemanticResult<()> {
        let functions = collect_signatures(program)?;
        let mut checker = Checker {
            functions: &functions,
            globals: FxHashSet::default(),
        };
        for statement in &program.statements {
            checker.check_statement(statement)?;
        }
        debug!(
            "semantic analysis passed: {} statements, {} functions, {} globals",
            program.statements.len(),
            functions.len(),
            checker.globals.len()
        );
        Ok(())
    }
}

pub fn analyze(program: &Program) -> SemanticResult<()> {
    SemanticAnalyzer::new().analyze(program)
}

fn collect_signatures(program: &Program) -> SemanticResult<FxHashMap<&str, usize>> {
    let mut functions = FxHashMap::default();
    for statement in &program.statements {
        if let Statement::FunctionDef { name, params, .. } = statement {
            if functions.insert(name.as_str(), params.len()).is_some() {
                return Err(SemanticError::DuplicateFunction { name: name.clone() });
            }
        }
    }
    Ok(functions)
}

struct Checker<'p> {
    functions: &'p FxHashMap<&'p str, usize>,
    globals: FxHashSet<&'p str>,
}

impl<'p> Checker<'p> {
    fn check_statement(&mut self, statement: &'p Statement) -> SemanticResult<()> {
        match statement {
            Statement::FunctionDef { name, params, body } => {
                let mut seen = FxHashSet::default();
                for param in params {
                    if !seen.insert(param.as_str()) {
                        return Err(SemanticError::DuplicateParameter {
                            function: name.clone(),
                            name: param.clone(),
                        });
                    }
                }
                self.check_expression(body, params)
            }
            Statement::Assign { name, value } => {
                // The target becomes visible only after its own value, so
                // `x = x + 1` needs an earlier assignment of `x`.
                self.check_expression(value, &[])?;
                self.globals.insert(name.as_str());
                Ok(())
            }
            Statement::Expr(expr) => self.check_expression(expr, &[]),
        }
    }

    fn check_expression(&self, expr: &Expression, params: &[String]) -> SemanticResult<()> {
        match expr {
            Expression::Number(_) => Ok(()),
            Expression::Var(name) => {
                if params.contains(name) || self.globals.contains(name.as_str()) {
                    Ok(())
                } else {
                    Err(SemanticError::UndefinedVariable { name: name.clone() })
                }
            }
            Expression::BinaryOp { left, right, .. } => {
                self.check_expression(left, params)?;
                self.check_expression(right, params)
            }
            Expression::Call { callee, args } => {
                let name = callee
                    .callee_name()
                    .ok_or(SemanticError::UnsupportedCallTarget)?;
                let expected = *self.functions.get(name).ok_or_else(|| {
                    SemanticError::UndefinedFunction {
                        name: name.to_string(),
                    }
                })?;
                if args.len() != expected {
                    return Err(SemanticError::ArityMismatch {
                        name: name.to_string(),
                        expected,
                        found: args.len(),
                    });
                }
                args.iter()
                    .try_for_each(|arg| self.check_expression(arg, params))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use indoc::indoc;

    fn analyze_source(input: &str) -> SemanticResult<()> {
        let program = parse(input).expect("parse failed");
        analyze(&program)
    }

    #[test]
    fn accepts_valid_program() {
        let input = indoc! {"
            function sq(x) = x * x
            function hyp(a, b) = sq(a) + sq(b)
            base = 3
            result = hyp(base, 4) ^ 0.5
        "};
        analyze_source(input).expect("analysis should pass");
    }

    #[test]
    fn rejects_wrong_arity() {
        let err = analyze_source("function f(x) = x + 1\nresult = f(1,2)\n")
            .expect_err("expected arity failure");
        assert_eq!(
            err,
            SemanticError::ArityMismatch {
                name: "f".to_string(),
                expected: 1,
                found: 2,
            }
        );
        assert!(err.to_string().contains("expected 1 arguments, got 2"));
    }

    #[test]
    fn rejects_too_few_arguments() {
        let err = analyze_source("function add(a, b) = a + b\nadd(1)\n")
            .expect_err("expected arity failure");
        assert!(matches!(
            err,
            SemanticError::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn rejects_undefined_variable() {
        let err = analyze_source("x = y + 1\n").expect_err("expected undefined variable");
        assert_eq!(
            err,
            SemanticError::UndefinedVariable {
                name: "y".to_string()
            }
        );
    }

    #[test]
    fn global_must_be_assigned_by_an_earlier_statement() {
        analyze_source("y = 1\nx = y + 1\n").expect("assignment before use");
        let err = analyze_source("x = y + 1\ny = 1\n").expect_err("use before assignment");
        assert!(matches!(err, SemanticError::UndefinedVariable { ref name } if name == "y"));
    }

    #[test]
    fn self_referential_assignment_needs_prior_definition() {
        analyze_source("x = x + 1\n").expect_err("x unknown on first assignment");
        analyze_source("x = 1\nx = x + 1\n").expect("x known from earlier statement");
    }

    #[test]
    fn function_body_sees_only_earlier_globals() {
        analyze_source("scale = 2\nfunction f(x) = x * scale\n").expect("scale assigned first");
        analyze_source("function f(x) = x * scale\nscale = 2\n")
            .expect_err("scale assigned after the function");
    }

    #[test]
    fn parameters_do_not_leak_into_globals() {
        let err = analyze_source("function f(x) = x\nresult = x\n")
            .expect_err("parameter is not a global");
        assert!(matches!(err, SemanticError::UndefinedVariable { ref name } if name == "x"));
    }

    #[test]
    fn functions_are_not_values() {
        analyze_source("function f(x) = x\ng = f\n").expect_err("function used as value");
    }

    #[test]
    fn calls_may_reference_later_functions() {
        analyze_source("function a(x) = b(x)\nfunction b(x) = x\nresult = a(1)\n")
            .expect("signatures are collected before bodies are checked");
    }

    #[test]
    fn rejects_duplicate_function() {
        let err = analyze_source("function f(x) = x\nfunction f(y) = y\n")
            .expect_err("expected duplicate failure");
        assert_eq!(err.to_string(), "Function 'f' already defined");
    }

    #[test]
    fn rejects_duplicate_parameter() {
        let err =
            analyze_source("function f(x, x) = x\n").expect_err("expected duplicate parameter");
        assert!(matches!(err, SemanticError::DuplicateParameter { .. }));
    }

    #[test]
    fn rejects_undefined_function() {
        let err = analyze_source("result = g(1)\n").expect_err("expected undefined function");
        assert_eq!(err.to_string(), "Call to undefined function 'g'");
    }

    #[test]
    fn rejects_chained_calls() {
        let err = analyze_source("function f(x) = x\nf(1)(2)\n")
            .expect_err("expected unsupported call target");
        assert_eq!(err, SemanticError::UnsupportedCallTarget);
    }

    #[test]
    fn analysis_is_repeatable() {
        let analyzer = SemanticAnalyzer::new();
        let good = parse("function f(x) = x\nresult = f(2)\n").expect("parse failed");
        let bad = parse("result = f(2)\n").expect("parse failed");

        assert!(analyzer.analyze(&good).is_ok());
        assert!(analyzer.analyze(&good).is_ok());
        assert_eq!(analyzer.analyze(&bad), analyzer.analyze(&bad));
        assert!(analyzer.analyze(&bad).is_err());
    }
}
