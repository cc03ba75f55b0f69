use anyhow::Result;
use lox_tester::render::{RenderOptions, render_suite, write_suites};
use lox_tester::types::{TestCase, TestSuite};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn opts() -> RenderOptions {
    RenderOptions {
        interpreter: "../LoxMin/LoxMin".into(),
        quiet_flag: "-q".into(),
    }
}

fn super_suite() -> TestSuite {
    TestSuite {
        name: "SuperTests".into(),
        cases: vec![
            TestCase {
                name: "CallOtherMethodTest".into(),
                script: PathBuf::from("tests/super/call_other_method.lox"),
                expect: vec!["Derived.bar()".into(), "Base.foo()".into()],
            },
            TestCase {
                name: "QuotedTest".into(),
                script: PathBuf::from("tests/super/quoted.lox"),
                expect: vec!["say \\\"hi\\\"".into()],
            },
        ],
    }
}

#[test]
fn renders_one_test_per_case() {
    let src = render_suite(&super_suite(), &opts());
    assert!(src.starts_with("// Generated using lox-tester"));
    assert!(src.contains("#![allow(non_snake_case)]"));
    assert!(src.contains("const INTERPRETER: &str = \"../LoxMin/LoxMin\";"));
    assert_eq!(src.matches("#[test]").count(), 2);
    assert!(src.contains("fn CallOtherMethodTest() {"));
    assert!(src.contains("let output = run_file(\"tests/super/call_other_method.lox\");"));
    assert!(src.contains("assert_eq!(2, output.len());"));
    assert!(src.contains("assert_eq!(\"Derived.bar()\", output[0]);"));
    assert!(src.contains("assert_eq!(\"Base.foo()\", output[1]);"));
}

#[test]
fn quotes_become_valid_literals() {
    let src = render_suite(&super_suite(), &opts());
    assert!(src.contains(r#"assert_eq!("say \"hi\"", output[0]);"#));
}

#[test]
fn writes_one_file_per_suite() -> Result<()> {
    let dir = tempdir()?;
    let script = dir.path().join("quoted.lox");
    fs::write(&script, "print \"hi\"; // expect: hi\n")?;
    let mut suite = super_suite();
    suite.cases.truncate(1);
    suite.cases[0].script = script.clone();
    let empty = TestSuite {
        name: "GeneralTests".into(),
        cases: vec![],
    };
    let written = write_suites(&[empty, suite], dir.path(), &opts())?;
    assert_eq!(written.len(), 2);
    assert!(dir.path().join("GeneralTests.rs").is_file());
    let text = fs::read_to_string(dir.path().join("SuperTests.rs"))?;
    assert!(text.contains("fn CallOtherMethodTest()"));
    let canonical = fs::canonicalize(&script)?;
    assert!(text.contains(&format!("run_file({:?})", canonical.to_string_lossy())));
    Ok(())
}

#[test]
fn written_paths_do_not_depend_on_working_directory() -> Result<()> {
    let dir = tempdir()?;
    write_suites(&[super_suite()], dir.path(), &opts())?;
    let text = fs::read_to_string(dir.path().join("SuperTests.rs"))?;
    let cwd = std::env::current_dir()?;
    let interpreter = cwd.join("../LoxMin/LoxMin");
    assert!(!text.contains("\"../LoxMin/LoxMin\""));
    assert!(text.contains(&format!("{:?}", interpreter.to_string_lossy())));
    let script = cwd.join("tests/super/call_other_method.lox");
    assert!(text.contains(&format!("run_file({:?})", script.to_string_lossy())));
    Ok(())
}
