#![allow(dead_code)]
use std::path::Path;

use minicomp::ast::Program;
use minicomp::parser;
use test_support::bench_cases;

/// `(label, source)` for every fixture case with benchmarking enabled.
pub fn workloads() -> Vec<(String, String)> {
    let cases = bench_cases(Path::new("tests/programs"))
        .unwrap_or_else(|err| panic!("load bench cases: {err:#}"));
    assert!(!cases.is_empty(), "no fixture cases enabled for benchmarking");
    cases
        .into_iter()
        .map(|case| {
            let source = case
                .read_program()
                .unwrap_or_else(|err| panic!("read {}: {err:#}", case.name));
            (case.name, source)
        })
        .collect()
}

pub fn load_program(source: &str) -> Program {
    parser::parse(source).unwrap_or_else(|err| panic!("parse: {err}"))
}
