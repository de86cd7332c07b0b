use std::path::Path;

use anyhow::{Context, Result, ensure};

use minicomp::vm::VmConfig;
use minicomp::{Error, run_source_with_config};
use test_support::{Case, CaseClass, load_cases, normalize_output};

fn config_for(case: &Case) -> VmConfig {
    let mut config = VmConfig::default();
    if let Some(depth) = case.spec.max_call_depth {
        config.max_call_depth = depth;
    }
    config
}

fn stage_matches(class: CaseClass, error: &Error) -> bool {
    match class {
        CaseClass::FrontendError => matches!(error, Error::Lex(_) | Error::Parse(_)),
        CaseClass::SemanticError => matches!(error, Error::Semantic(_)),
        CaseClass::RuntimeError => matches!(error, Error::Runtime(_)),
        CaseClass::RuntimeSuccess => false,
    }
}

fn check_case(case: &Case) -> Result<()> {
    let source = case.read_program()?;
    let result = run_source_with_config(&source, config_for(case));

    match case.spec.class {
        CaseClass::RuntimeSuccess => {
            let execution = result.with_context(|| format!("Running {}", case.name))?;
            let expected = case.expected_output()?;
            let actual = normalize_output(&execution.render_globals());
            assert_eq!(actual, expected, "Output mismatch for {}", case.name);
        }
        class => {
            let expected_error = case.expected_error()?;
            let error = match result {
                Ok(execution) => anyhow::bail!(
                    "Expected {class:?} in {}, but the run succeeded with:\n{}",
                    case.name,
                    execution.render_globals()
                ),
                Err(error) => error,
            };
            ensure!(
                stage_matches(class, &error),
                "Expected {class:?} in {}, got '{error}'",
                case.name
            );
            let actual = error.to_string();
            ensure!(
                actual.contains(&expected_error),
                "Expected error containing '{expected_error}' in {}, got '{actual}'",
                case.name
            );
        }
    }
    Ok(())
}

#[test]
fn runs_fixture_programs() -> Result<()> {
    let cases = load_cases(Path::new("tests/programs"))?;
    for case in &cases {
        if case.spec.bench.enabled {
            ensure!(
                !case.spec.bench.tags.is_empty(),
                "Case {} has bench enabled but no tags",
                case.name
            );
        }
        check_case(case)?;
    }
    Ok(())
}

#[test]
fn analysis_verdict_is_stable_across_fixtures() -> Result<()> {
    use minicomp::parser::parse;
    use minicomp::semantic::SemanticAnalyzer;

    let analyzer = SemanticAnalyzer::new();
    for case in load_cases(Path::new("tests/programs"))? {
        let source = case.read_program()?;
        let Ok(program) = parse(&source) else {
            continue;
        };
        let first = analyzer.analyze(&program);
        let second = analyzer.analyze(&program);
        ensure!(first == second, "Unstable verdict for {}", case.name);
    }
    Ok(())
}
