use crate::backend::Interpreter;
use crate::expect::unescape_quotes;
use crate::types::{CaseResult, Mismatch, Summary, TestCase, TestSuite};
use anyhow::Result;
use rayon::prelude::*;

/// Length first, then line by line.
pub fn first_mismatch(expected: &[String], actual: &[String]) -> Option<Mismatch> {
    if expected.len() != actual.len() {
        return Some(Mismatch::Length {
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e != a)
        .map(|index| Mismatch::Line {
            index,
            expected: expected[index].clone(),
            actual: actual[index].clone(),
        })
}

/// Compare one run's outcome against the case's expectations.
pub fn judge(suite: &str, case: &TestCase, outcome: Result<Vec<String>>) -> CaseResult {
    let expected: Vec<String> = case.expect.iter().map(|e| unescape_quotes(e)).collect();
    match outcome {
        Ok(actual) => {
            let mismatch = first_mismatch(&expected, &actual);
            CaseResult {
                suite: suite.to_string(),
                name: case.name.clone(),
                script: case.script.clone(),
                passed: mismatch.is_none(),
                expected,
                actual,
                mismatch,
                error: None,
            }
        }
        Err(e) => CaseResult {
            suite: suite.to_string(),
            name: case.name.clone(),
            script: case.script.clone(),
            expected,
            actual: vec![],
            mismatch: None,
            error: Some(format!("{e:#}")),
            passed: false,
        },
    }
}

/// Run every case, one interpreter process each, in parallel.
pub fn run_suites<I: Interpreter>(interpreter: &I, suites: &[TestSuite]) -> Summary {
    let mut all_cases = Vec::new();
    for s in suites {
        for c in &s.cases {
            all_cases.push((s.name.as_str(), c));
        }
    }
    let results: Vec<CaseResult> = all_cases
        .par_iter()
        .map(|(suite, case)| judge(suite, case, interpreter.run(&case.script)))
        .collect();
    Summary::from_results(results)
}
