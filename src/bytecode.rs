use std::fmt;
use std::rc::Rc;

use log::debug;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::ast::{BinaryOperator, Expression, Program, Statement};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    PushConst(usize),
    LoadVar(String),
    StoreVar(String),
    LoadLocal(String),
    Pop,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Call { name: String, argc: usize },
    Ret,
}

/// One compiled unit: the top-level program or a single function body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeObject {
    pub instructions: Vec<Instruction>,
    pub constants: Vec<Value>,
    /// Parameter names in declaration order; empty for top-level code.
    pub params: Vec<String>,
}

/// Compiled functions by name, shared read-only by every call frame.
pub type FunctionTable = FxHashMap<String, Rc<CodeObject>>;

#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub main: CodeObject,
    pub functions: FunctionTable,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Duplicate function definition '{name}'")]
    DuplicateFunction { name: String },
    #[error("Unsupported call target: only named functions can be called")]
    UnsupportedCallTarget,
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Lowers a validated program into bytecode.
///
/// Function bodies are compiled first, each into its own code object, then
/// the remaining top-level statements are compiled into the main object.
#[derive(Debug, Default)]
pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Self
    }

    pub fn compile(&self, program: &Program) -> CompileResult<CompiledProgram> {
        let mut functions = FunctionTable::default();
        for statement in &program.statements {
            if let Statement::FunctionDef { name, params, body } = statement {
                if functions.contains_key(name) {
                    return Err(CompileError::DuplicateFunction { name: name.clone() });
                }
                let code = compile_function(params, body)?;
                functions.insert(name.clone(), Rc::new(code));
            }
        }

        let mut unit = CodeUnit::top_level();
        for statement in &program.statements {
            match statement {
                Statement::FunctionDef { .. } => {}
                Statement::Assign { name, value } => {
                    unit.emit_expression(value)?;
                    unit.emit(Instruction::StoreVar(name.clone()));
                }
                Statement::Expr(expr) => {
                    unit.emit_expression(expr)?;
                    unit.emit(Instruction::Pop);
                }
            }
        }
        let main = unit.finish();

        debug!(
            "compiled {} top-level instructions and {} functions",
            main.instructions.len(),
            functions.len()
        );
        Ok(CompiledProgram { main, functions })
    }
}

pub fn compile(program: &Program) -> CompileResult<CompiledProgram> {
    Compiler::new().compile(program)
}

fn compile_function(params: &[String], body: &Expression) -> CompileResult<CodeObject> {
    let mut unit = CodeUnit::function(params);
    unit.emit_expression(body)?;
    Ok(unit.finish())
}

/// Private state for compiling one code object.
struct CodeUnit<'a> {
    instructions: Vec<Instruction>,
    constants: Vec<Value>,
    params: &'a [String],
}

impl<'a> CodeUnit<'a> {
    fn top_level() -> Self {
        Self::function(&[])
    }

    fn function(params: &'a [String]) -> Self {
        Self {
            instructions: Vec::new(),
            constants: Vec::new(),
            params,
        }
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    fn emit_expression(&mut self, expr: &Expression) -> CompileResult<()> {
        match expr {
            Expression::Number(value) => {
                let index = self.add_constant(*value);
                self.emit(Instruction::PushConst(index));
            }
            Expression::Var(name) => {
                if self.params.contains(name) {
                    self.emit(Instruction::LoadLocal(name.clone()));
                } else {
                    self.emit(Instruction::LoadVar(name.clone()));
                }
            }
            Expression::BinaryOp { left, op, right } => {
                self.emit_expression(left)?;
                self.emit_expression(right)?;
                self.emit(match op {
                    BinaryOperator::Add => Instruction::Add,
                    BinaryOperator::Sub => Instruction::Sub,
                    BinaryOperator::Mul => Instruction::Mul,
                    BinaryOperator::Div => Instruction::Div,
                    BinaryOperator::Pow => Instruction::Pow,
                });
            }
            Expression::Call { callee, args } => {
                let name = callee
                    .callee_name()
                    .ok_or(CompileError::UnsupportedCallTarget)?;
                for arg in args {
                    self.emit_expression(arg)?;
                }
                self.emit(Instruction::Call {
                    name: name.to_string(),
                    argc: args.len(),
                });
            }
        }
        Ok(())
    }

    /// Returns the pool slot for `value`, reusing an equal constant. Kinds are
    /// compared too, so `1` and `1.0` get separate slots.
    fn add_constant(&mut self, value: Value) -> usize {
        if let Some(index) = self.constants.iter().position(|c| *c == value) {
            return index;
        }
        self.constants.push(value);
        self.constants.len() - 1
    }

    fn finish(mut self) -> CodeObject {
        self.emit(Instruction::Ret);
        CodeObject {
            instructions: self.instructions,
            constants: self.constants,
            params: self.params.to_vec(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::PushConst(index) => write!(f, "PUSH_CONST {index}"),
            Instruction::LoadVar(name) => write!(f, "LOAD_VAR {name}"),
            Instruction::StoreVar(name) => write!(f, "STORE_VAR {name}"),
            Instruction::LoadLocal(name) => write!(f, "LOAD_LOCAL {name}"),
            Instruction::Pop => write!(f, "POP"),
            Instruction::Add => write!(f, "ADD"),
            Instruction::Sub => write!(f, "SUB"),
            Instruction::Mul => write!(f, "MUL"),
            Instruction::Div => write!(f, "DIV"),
            Instruction::Pow => write!(f, "POW"),
            Instruction::Call { name, argc } => write!(f, "CALL {name} {argc}"),
            Instruction::Ret => write!(f, "RET"),
        }
    }
}

impl fmt::Display for CodeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (offset, instruction) in self.instructions.iter().enumerate() {
            write!(f, "{offset:>4}  {instruction}")?;
            if let Instruction::PushConst(index) = instruction
                && let Some(constant) = self.constants.get(*index)
            {
                write!(f, "  ({constant})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.functions.keys().collect::<Vec<_>>();
        names.sort();
        for name in names {
            let code = &self.functions[name];
            writeln!(f, "function {name}({}):", code.params.join(", "))?;
            write!(f, "{code}")?;
        }
        writeln!(f, "main:")?;
        write!(f, "{}", self.main)
    }
}
