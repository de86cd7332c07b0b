//! A tiny arithmetic language compiled to bytecode and run on a stack VM.
//!
//! Pipeline: [`lexer`] → [`parser`] → [`semantic`] → [`bytecode`] → [`vm`].
//! Each stage fails fast with its own error type; [`Error`] wraps them all for
//! the one-shot helpers below.

pub mod ast;
pub mod bytecode;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod token;
pub mod value;
pub mod vm;

use log::debug;

use crate::bytecode::{CompiledProgram, Compiler};
use crate::semantic::SemanticAnalyzer;
use crate::value::Value;
use crate::vm::{Globals, VM, VmConfig};

pub use error::{Error, Result};

/// Outcome of running a whole program.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub value: Option<Value>,
    pub globals: Globals,
}

impl Execution {
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).copied()
    }

    /// One `name = value` line per global, sorted by name.
    pub fn render_globals(&self) -> String {
        let mut entries = self.globals.iter().collect::<Vec<_>>();
        entries.sort_by(|(left, _), (right, _)| left.cmp(right));
        entries
            .into_iter()
            .map(|(name, value)| format!("{name} = {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Tokenizes, parses, checks and compiles `source`.
pub fn compile_source(source: &str) -> Result<CompiledProgram> {
    let tokens = lexer::tokenize(source)?;
    debug!("lexed {} tokens", tokens.len());
    let program = parser::parse_tokens(tokens)?;
    debug!("parsed {} statements", program.statements.len());
    SemanticAnalyzer::new().analyze(&program)?;
    Ok(Compiler::new().compile(&program)?)
}

pub fn run_source(source: &str) -> Result<Execution> {
    run_source_with_config(source, VmConfig::default())
}

pub fn run_source_with_config(source: &str, config: VmConfig) -> Result<Execution> {
    let compiled = compile_source(source)?;
    let mut vm = VM::from_program(compiled, config);
    let value = vm.run()?;
    Ok(Execution {
        value,
        globals: vm.into_globals(),
    })
}
