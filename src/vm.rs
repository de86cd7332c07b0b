use std::rc::Rc;

use log::{Level, debug, log_enabled, trace};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::bytecode::{CodeObject, CompiledProgram, FunctionTable, Instruction};
use crate::value::{OverflowError, Value};

pub type Globals = FxHashMap<String, Value>;

type VmResult<T> = std::result::Result<T, VmError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Undefined local '{name}'")]
    UndefinedLocal { name: String },
    #[error("Call to undefined function '{name}'")]
    UndefinedFunction { name: String },
    #[error("Function '{name}' expected {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Function '{name}' returned no value")]
    MissingReturnValue { name: String },
    #[error("Constant index {index} out of range")]
    InvalidConstant { index: usize },
    #[error("Maximum call depth of {limit} exceeded")]
    RecursionLimit { limit: usize },
    #[error(transparent)]
    IntegerOverflow(#[from] OverflowError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Deepest allowed nesting of function frames; the top-level frame is
    /// depth zero.
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
        }
    }
}

/// A single activation of a code object.
#[derive(Debug)]
struct Frame {
    name: String,
    code: Rc<CodeObject>,
    ip: usize,
    stack: Vec<Value>,
    locals: FxHashMap<String, Value>,
    depth: usize,
}

impl Frame {
    fn new(
        name: String,
        code: Rc<CodeObject>,
        locals: FxHashMap<String, Value>,
        depth: usize,
    ) -> Self {
        Self {
            name,
            code,
            ip: 0,
            stack: Vec::new(),
            locals,
            depth,
        }
    }
}

/// What the dispatch loop does after one instruction.
enum Step {
    Continue,
    Call(Frame),
    Return(Option<Value>),
}

/// Stack machine executing a main code object against a function table.
///
/// Execution is strictly linear inside a code object. `CALL` pushes a fresh
/// frame that runs to completion before the caller resumes; frames live on a
/// heap-allocated stack, so call depth is bounded only by
/// [`VmConfig::max_call_depth`]. All frames of a run share the same globals.
pub struct VM {
    main: Rc<CodeObject>,
    functions: FunctionTable,
    globals: Globals,
    config: VmConfig,
}

impl VM {
    pub fn new(main: CodeObject, functions: FunctionTable) -> Self {
        Self::with_config(main, functions, VmConfig::default())
    }

    pub fn with_config(main: CodeObject, functions: FunctionTable, config: VmConfig) -> Self {
        Self {
            main: Rc::new(main),
            functions,
            globals: Globals::default(),
            config,
        }
    }

    pub fn from_program(program: CompiledProgram, config: VmConfig) -> Self {
        Self::with_config(program.main, program.functions, config)
    }

    /// Runs the main code object with fresh globals and returns the value of
    /// its final `RET`, if the stack held one.
    pub fn run(&mut self) -> VmResult<Option<Value>> {
        self.globals.clear();
        let main = Frame::new(
            "main".to_string(),
            Rc::clone(&self.main),
            FxHashMap::default(),
            0,
        );
        let result = self.execute(main)?;
        debug!("vm finished with {} globals", self.globals.len());
        Ok(result)
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).copied()
    }

    pub fn into_globals(self) -> Globals {
        self.globals
    }

    fn execute(&mut self, main: Frame) -> VmResult<Option<Value>> {
        let mut frames = vec![main];
        while let Some(frame) = frames.last_mut() {
            match self.step(frame)? {
                Step::Continue => {}
                Step::Call(callee) => frames.push(callee),
                Step::Return(value) => {
                    let Some(finished) = frames.pop() else {
                        break;
                    };
                    let Some(caller) = frames.last_mut() else {
                        return Ok(value);
                    };
                    let value = value.ok_or(VmError::MissingReturnValue {
                        name: finished.name,
                    })?;
                    caller.stack.push(value);
                }
            }
        }
        Ok(None)
    }

    fn step(&mut self, frame: &mut Frame) -> VmResult<Step> {
        let code = Rc::clone(&frame.code);
        // Running off the end behaves like a `RET` on an empty stack.
        let Some(instruction) = code.instructions.get(frame.ip) else {
            return Ok(Step::Return(None));
        };
        if log_enabled!(Level::Trace) {
            trace!(
                "[depth {}] {:>4}  {}  stack={:?}",
                frame.depth, frame.ip, instruction, frame.stack
            );
        }
        frame.ip += 1;

        match instruction {
            Instruction::PushConst(index) => {
                let value = code
                    .constants
                    .get(*index)
                    .copied()
                    .ok_or(VmError::InvalidConstant { index: *index })?;
                frame.stack.push(value);
            }
            Instruction::LoadVar(name) => {
                let value = frame
                    .locals
                    .get(name)
                    .or_else(|| self.globals.get(name))
                    .copied()
                    .ok_or_else(|| VmError::UndefinedVariable { name: name.clone() })?;
                frame.stack.push(value);
            }
            Instruction::StoreVar(name) => {
                // Assignments always target globals, even from a function frame.
                let value = Self::pop_stack(&mut frame.stack)?;
                self.globals.insert(name.clone(), value);
            }
            Instruction::LoadLocal(name) => {
                let value = frame
                    .locals
                    .get(name)
                    .copied()
                    .ok_or_else(|| VmError::UndefinedLocal { name: name.clone() })?;
                frame.stack.push(value);
            }
            Instruction::Pop => {
                Self::pop_stack(&mut frame.stack)?;
            }
            Instruction::Add => Self::binary_op(&mut frame.stack, |l, r| Ok(l.add(r)?))?,
            Instruction::Sub => Self::binary_op(&mut frame.stack, |l, r| Ok(l.sub(r)?))?,
            Instruction::Mul => Self::binary_op(&mut frame.stack, |l, r| Ok(l.mul(r)?))?,
            Instruction::Div => Self::binary_op(&mut frame.stack, |l, r| Ok(l.div(r)))?,
            Instruction::Pow => Self::binary_op(&mut frame.stack, |l, r| Ok(l.pow(r)))?,
            Instruction::Call { name, argc } => {
                return self.enter_function(frame, name, *argc).map(Step::Call);
            }
            Instruction::Ret => return Ok(Step::Return(frame.stack.pop())),
        }
        Ok(Step::Continue)
    }

    fn enter_function(&self, caller: &mut Frame, name: &str, argc: usize) -> VmResult<Frame> {
        let function = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| VmError::UndefinedFunction {
                name: name.to_string(),
            })?;
        if argc != function.params.len() {
            return Err(VmError::ArityMismatch {
                name: name.to_string(),
                expected: function.params.len(),
                found: argc,
            });
        }
        let depth = caller.depth + 1;
        if depth > self.config.max_call_depth {
            return Err(VmError::RecursionLimit {
                limit: self.config.max_call_depth,
            });
        }

        let split = caller
            .stack
            .len()
            .checked_sub(argc)
            .ok_or(VmError::StackUnderflow)?;
        let args = caller.stack.split_off(split);
        let locals = function.params.iter().cloned().zip(args).collect();

        Ok(Frame::new(name.to_string(), function, locals, depth))
    }

    fn binary_op(
        stack: &mut Vec<Value>,
        op: impl FnOnce(Value, Value) -> VmResult<Value>,
    ) -> VmResult<()> {
        // The right operand was pushed last.
        let right = Self::pop_stack(stack)?;
        let left = Self::pop_stack(stack)?;
        stack.push(op(left, right)?);
        Ok(())
    }

    fn pop_stack(stack: &mut Vec<Value>) -> VmResult<Value> {
        stack.pop().ok_or(VmError::StackUnderflow)
    }
}
