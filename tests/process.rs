// Runs `sh` in place of a Lox interpreter: `sh <script> -q` executes the script.
#![cfg(unix)]

use anyhow::Result;
use lox_tester::backend::{ExternalInterpreter, Interpreter, run_script};
use lox_tester::engine::run_suites;
use lox_tester::engine_async::run_suites_async;
use lox_tester::types::{TestCase, TestSuite};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{TempDir, tempdir};

fn script(dir: &TempDir, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, body)?;
    Ok(path)
}

fn sh() -> ExternalInterpreter {
    ExternalInterpreter::new("sh")
}

#[test]
fn captures_stdout_lines_in_order() -> Result<()> {
    let dir = tempdir()?;
    let path = script(&dir, "print.sh", "echo one\necho two\necho\necho three\n")?;
    assert_eq!(sh().run(&path)?, vec!["one", "two", "", "three"]);
    Ok(())
}

#[test]
fn captures_stderr_and_ignores_exit_status() -> Result<()> {
    let dir = tempdir()?;
    let path = script(&dir, "fail.sh", "echo 'Undefined variable.' >&2\nexit 70\n")?;
    assert_eq!(sh().run(&path)?, vec!["Undefined variable."]);
    Ok(())
}

#[test]
fn merges_both_streams() -> Result<()> {
    let dir = tempdir()?;
    let path = script(&dir, "both.sh", "echo out\necho err >&2\n")?;
    let mut lines = sh().run(&path)?;
    // Interleaving between the streams is best effort
    lines.sort();
    assert_eq!(lines, vec!["err", "out"]);
    Ok(())
}

#[test]
fn trailing_blank_lines_are_dropped() -> Result<()> {
    let dir = tempdir()?;
    let path = script(&dir, "trailing.sh", "printf 'a\\r\\nb\\n\\n\\n'\n")?;
    assert_eq!(sh().run(&path)?, vec!["a", "b"]);
    Ok(())
}

#[test]
fn silent_script_is_one_empty_line() -> Result<()> {
    let dir = tempdir()?;
    let path = script(&dir, "silent.sh", "true\n")?;
    assert_eq!(run_script("sh", "-q", &path)?, vec![String::new()]);
    Ok(())
}

#[test]
fn quiet_flag_is_passed_after_script() -> Result<()> {
    let dir = tempdir()?;
    let path = script(&dir, "args.sh", "printf '%s\\n' \"$1\"\n")?;
    assert_eq!(sh().run(&path)?, vec!["-q"]);
    Ok(())
}

#[test]
fn timeout_kills_hung_script() -> Result<()> {
    let dir = tempdir()?;
    let path = script(&dir, "hang.sh", "exec sleep 10\n")?;
    let backend = ExternalInterpreter {
        timeout: Some(Duration::from_millis(200)),
        ..sh()
    };
    assert!(backend.run(&path).is_err());
    Ok(())
}

#[test]
fn missing_interpreter_is_an_error() {
    let backend = ExternalInterpreter::new("/nonexistent/lox-interpreter");
    assert!(backend.run(Path::new("x.lox")).is_err());
    assert!(backend.validate().is_err());
}

fn corpus_suite(dir: &TempDir) -> Result<TestSuite> {
    Ok(TestSuite {
        name: "ShellTests".into(),
        cases: vec![
            TestCase {
                name: "PassTest".into(),
                script: script(dir, "pass.sh", "echo 'say \"hi\"'\n")?,
                expect: vec!["say \\\"hi\\\"".into()],
            },
            TestCase {
                name: "FailTest".into(),
                script: script(dir, "fail.sh", "echo 1\necho 2\n")?,
                expect: vec!["1".into()],
            },
        ],
    })
}

#[test]
fn blocking_engine_runs_real_processes() -> Result<()> {
    let dir = tempdir()?;
    let summary = run_suites(&sh(), &[corpus_suite(&dir)?]);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.passed, 1);
    assert!(summary.cases[0].passed);
    Ok(())
}

#[tokio::test]
async fn async_engine_matches_blocking_engine() -> Result<()> {
    let dir = tempdir()?;
    let suite = corpus_suite(&dir)?;
    let summary = run_suites_async(&sh(), &[suite], 2).await;
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.cases[1].actual, vec!["1", "2"]);
    Ok(())
}

#[tokio::test]
async fn async_timeout_kills_hung_script() -> Result<()> {
    let dir = tempdir()?;
    let path = script(&dir, "hang.sh", "exec sleep 10\n")?;
    let backend = ExternalInterpreter {
        timeout: Some(Duration::from_millis(200)),
        ..sh()
    };
    assert!(backend.run_async(&path).await.is_err());
    Ok(())
}
