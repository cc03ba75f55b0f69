//! Writes suites out as Rust integration-test files, one file per suite.

use crate::expect::unescape_quotes;
use crate::t_args;
use crate::types::TestSuite;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// What generated tests need to start the interpreter.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub interpreter: String,
    pub quiet_flag: String,
}

/// Rust source for one suite.
pub fn render_suite(suite: &TestSuite, opts: &RenderOptions) -> String {
    let mut src = String::new();
    // Writing into a String cannot fail
    let _ = write_suite(&mut src, suite, opts);
    src
}

fn write_suite(src: &mut String, suite: &TestSuite, opts: &RenderOptions) -> std::fmt::Result {
    writeln!(
        src,
        "// Generated using {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(src, "// Suite: {}", suite.name)?;
    writeln!(src)?;
    writeln!(src, "#![allow(non_snake_case)]")?;
    writeln!(src)?;
    writeln!(src, "const INTERPRETER: &str = {:?};", opts.interpreter)?;
    writeln!(src, "const QUIET_FLAG: &str = {:?};", opts.quiet_flag)?;
    writeln!(src)?;
    writeln!(src, "fn run_file(script: &str) -> Vec<String> {{")?;
    writeln!(
        src,
        "    lox_tester::backend::run_script(INTERPRETER, QUIET_FLAG, script)"
    )?;
    writeln!(src, "        .expect(\"interpreter should run\")")?;
    writeln!(src, "}}")?;

    for case in &suite.cases {
        writeln!(src)?;
        writeln!(src, "#[test]")?;
        writeln!(src, "fn {}() {{", case.name)?;
        writeln!(
            src,
            "    let output = run_file({:?});",
            case.script.to_string_lossy()
        )?;
        writeln!(src, "    assert_eq!({}, output.len());", case.expect.len())?;
        for (i, expected) in case.expect.iter().enumerate() {
            writeln!(
                src,
                "    assert_eq!({:?}, output[{i}]);",
                unescape_quotes(expected)
            )?;
        }
        writeln!(src, "}}")?;
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .with_context(|| t_args!("render-failed-to-resolve", "file" => path.display()))
}

/// Generated tests run from their own crate root, so relative paths are fixed here.
fn with_absolute_paths(suite: &TestSuite) -> Result<TestSuite> {
    let mut suite = suite.clone();
    for case in &mut suite.cases {
        case.script = absolute(&case.script)?;
    }
    Ok(suite)
}

fn absolute_options(opts: &RenderOptions) -> Result<RenderOptions> {
    let interpreter = Path::new(&opts.interpreter);
    // Bare command names are left for PATH lookup
    if interpreter.components().count() <= 1 {
        return Ok(opts.clone());
    }
    Ok(RenderOptions {
        interpreter: absolute(interpreter)?.to_string_lossy().into_owned(),
        quiet_flag: opts.quiet_flag.clone(),
    })
}

/// Write every suite to `<out_dir>/<SuiteName>.rs`, overwriting existing files.
///
/// Script and interpreter paths are written out absolute.
pub fn write_suites(suites: &[TestSuite], out_dir: &Path, opts: &RenderOptions) -> Result<Vec<PathBuf>> {
    let opts = absolute_options(opts)?;
    let mut written = Vec::new();
    for suite in suites {
        let path = out_dir.join(format!("{}.rs", suite.name));
        let suite = with_absolute_paths(suite)?;
        fs::write(&path, render_suite(&suite, &opts))
            .with_context(|| t_args!("render-failed-to-write", "file" => path.display()))?;
        info!("{}", t_args!("info-wrote-suite", "name" => &suite.name, "count" => suite.cases.len()));
        written.push(path);
    }
    Ok(written)
}
