use std::path::PathBuf;

/// One script, named after its file, with the output it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub script: PathBuf,
    /// Quote-escaped expectation lines, never empty.
    pub expect: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    pub name: String,
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn qualified_name(&self, case: &TestCase) -> String {
        format!("{}::{}", self.name, case.name)
    }
}

/// Where a run first diverged from its expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    Length { expected: usize, actual: usize },
    Line { index: usize, expected: String, actual: String },
}

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub suite: String,
    pub name: String,
    pub script: PathBuf,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
    pub mismatch: Option<Mismatch>,
    pub error: Option<String>,
    pub passed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub total: usize,  // Total number of test cases
    pub passed: usize, // Number of passed test cases
    pub failed: usize, // Number of failed test cases
    pub cases: Vec<CaseResult>,

    // Line-level counts for more granular reporting
    pub total_lines: usize,
    pub matched_lines: usize,
}

impl Summary {
    pub fn from_results(cases: Vec<CaseResult>) -> Self {
        let passed = cases.iter().filter(|r| r.passed).count();
        let total_lines = cases.iter().map(|r| r.expected.len()).sum();
        let matched_lines = cases
            .iter()
            .map(|r| {
                r.expected
                    .iter()
                    .zip(&r.actual)
                    .filter(|(e, a)| e == a)
                    .count()
            })
            .sum();
        Summary {
            total: cases.len(),
            passed,
            failed: cases.len() - passed,
            cases,
            total_lines,
            matched_lines,
        }
    }
}
