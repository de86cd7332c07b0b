use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result, anyhow, bail};
use log::{LevelFilter, info};

use minicomp::bytecode::Compiler;
use minicomp::semantic::SemanticAnalyzer;
use minicomp::vm::{VM, VmConfig};
use minicomp::{Execution, lexer, parser};

#[derive(Debug, Default)]
struct Options {
    dump_tokens: bool,
    dump_ast: bool,
    dump_bytecode: bool,
    config: VmConfig,
    input_path: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut options = Options::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--tokens" => options.dump_tokens = true,
            "--ast" => options.dump_ast = true,
            "--bytecode" => options.dump_bytecode = true,
            "--max-call-depth" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing value after {arg}"))?;
                options.config.max_call_depth = value
                    .parse()
                    .with_context(|| format!("Invalid call depth '{value}'"))?;
            }
            flag if flag.starts_with("--") => bail!("Unknown option '{flag}'"),
            _ => {
                if options.input_path.is_some() {
                    bail!("Only one input file is supported");
                }
                options.input_path = Some(arg);
            }
        }
    }

    Ok(options)
}

fn read_source(path: Option<&str>) -> Result<String> {
    if let Some(path) = path {
        return fs::read_to_string(path).with_context(|| format!("Reading {path}"));
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Reading stdin")?;
    Ok(buffer)
}

fn main() -> Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()
        .context("Installing logger")?;

    let options = parse_args(std::env::args().skip(1))?;
    let source = read_source(options.input_path.as_deref())?;

    // Mirrors `minicomp::run_source_with_config`, with dumps between stages.
    let tokens = lexer::tokenize(&source)?;
    if options.dump_tokens {
        for token in &tokens {
            println!("{token}");
        }
    }

    let program = parser::parse_tokens(tokens)?;
    if options.dump_ast {
        print!("{program}");
    }

    SemanticAnalyzer::new().analyze(&program)?;
    let compiled = Compiler::new().compile(&program)?;
    if options.dump_bytecode {
        print!("{compiled}");
    }

    let mut vm = VM::from_program(compiled, options.config);
    let value = vm.run()?;
    info!("program returned {value:?}");

    let execution = Execution {
        value,
        globals: vm.into_globals(),
    };
    let output = execution.render_globals();
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parses_flags_and_input() {
        let options = parse_args(args(&["--ast", "--max-call-depth", "50", "prog.pcg"]))
            .expect("arguments should parse");
        assert!(options.dump_ast);
        assert!(!options.dump_tokens);
        assert_eq!(options.config.max_call_depth, 50);
        assert_eq!(options.input_path.as_deref(), Some("prog.pcg"));
    }

    #[test]
    fn rejects_unknown_flag() {
        let err = parse_args(args(&["--jit"])).expect_err("expected failure");
        assert_eq!(err.to_string(), "Unknown option '--jit'");
    }

    #[test]
    fn rejects_second_input() {
        parse_args(args(&["a.pcg", "b.pcg"])).expect_err("expected failure");
    }

    #[test]
    fn rejects_bad_depth() {
        let err = parse_args(args(&["--max-call-depth", "deep"])).expect_err("expected failure");
        assert!(err.to_string().contains("Invalid call depth 'deep'"));
    }
}
