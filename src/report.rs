use crate::t;
use crate::types::{CaseResult, Mismatch, Summary};
use colored::Colorize;
use indexmap::IndexMap;

/// How much of a run to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputKind {
    /// Every case, with detail for failures.
    #[default]
    Normal,
    /// One line per suite.
    Compact,
    /// One character per case.
    Terse,
    /// Totals only.
    Final,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub kind: OutputKind,
    pub hide_passes: bool,
    pub hide_fails: bool,
    pub verbose: bool,
}

fn header(summary: &Summary) -> String {
    format!(
        "{}: {}, {}: {}, {}: {}",
        t!("report-total"),
        summary.total,
        t!("report-passed"),
        summary.passed.to_string().green(),
        t!("report-failed"),
        if summary.failed > 0 {
            summary.failed.to_string().red().bold().to_string()
        } else {
            summary.failed.to_string().green().to_string()
        }
    )
}

fn render_failure(out: &mut String, c: &CaseResult) {
    out.push_str(&format!(
        "{} {}::{}\n",
        "[FAIL]".red().bold(),
        c.suite.red(),
        c.name.red().bold()
    ));
    out.push_str(&format!("  {} {}\n", "script  :".bold(), c.script.display()));
    if let Some(err) = &c.error {
        out.push_str(&format!("  {} {}\n", "error   :".bold(), err.red()));
        return;
    }
    match &c.mismatch {
        Some(Mismatch::Length { expected, actual }) => {
            out.push_str(&format!(
                "  {} {} {expected}, {} {actual}\n",
                "lines   :".bold(),
                t!("report-expected"),
                t!("report-actual")
            ));
        }
        Some(Mismatch::Line { index, expected, actual }) => {
            out.push_str(&format!("  {} {}\n", "line    :".bold(), index + 1));
            out.push_str(&format!("  {} {expected:?}\n", "expected:".bold()));
            out.push_str(&format!("  {} {actual:?}\n", "actual  :".bold()));
            return;
        }
        None => {}
    }
    out.push_str(&format!("  {} {:?}\n", "expected:".bold(), c.expected));
    out.push_str(&format!("  {} {:?}\n", "actual  :".bold(), c.actual));
}

fn render_normal(out: &mut String, summary: &Summary, opts: &ReportOptions) {
    for c in &summary.cases {
        if c.passed {
            if !opts.hide_passes {
                out.push_str(&format!(
                    "{} {}::{}\n",
                    "[OK]".green().bold(),
                    c.suite,
                    c.name.green()
                ));
            }
        } else if !opts.hide_fails {
            render_failure(out, c);
        }
    }
}

fn render_compact(out: &mut String, summary: &Summary) {
    let mut per_suite: IndexMap<&str, (usize, usize)> = IndexMap::new();
    for c in &summary.cases {
        let entry = per_suite.entry(c.suite.as_str()).or_default();
        if c.passed {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }
    for (suite, (passed, failed)) in per_suite {
        let mark = if failed == 0 {
            "[OK]".green().bold()
        } else {
            "[FAIL]".red().bold()
        };
        out.push_str(&format!(
            "{mark} {suite} ({passed}/{})\n",
            passed + failed
        ));
    }
}

fn render_terse(out: &mut String, summary: &Summary) {
    for c in &summary.cases {
        if c.passed {
            out.push_str(&".".green().to_string());
        } else {
            out.push_str(&"F".red().bold().to_string());
        }
    }
    out.push('\n');
}

pub fn render_human(summary: &Summary, opts: &ReportOptions) -> String {
    let mut out = String::new();
    match opts.kind {
        OutputKind::Normal => render_normal(&mut out, summary, opts),
        OutputKind::Compact => render_compact(&mut out, summary),
        OutputKind::Terse => render_terse(&mut out, summary),
        OutputKind::Final => {}
    }
    out.push_str(&header(summary));
    out.push('\n');
    if opts.verbose {
        out.push_str(&format!(
            "{}: {}/{}\n",
            t!("report-lines-matched"),
            summary.matched_lines,
            summary.total_lines
        ));
    }
    out
}

pub fn print_human(summary: &Summary, opts: &ReportOptions) {
    print!("{}", render_human(summary, opts));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn result(name: &str, passed: bool) -> CaseResult {
        CaseResult {
            suite: "SuperTests".into(),
            name: name.into(),
            script: PathBuf::from(format!("super/{name}.lox")),
            expected: vec!["a".into()],
            actual: vec![if passed { "a" } else { "b" }.into()],
            mismatch: (!passed).then(|| Mismatch::Line {
                index: 0,
                expected: "a".into(),
                actual: "b".into(),
            }),
            error: None,
            passed,
        }
    }

    fn summary() -> Summary {
        Summary::from_results(vec![result("GoodTest", true), result("BadTest", false)])
    }

    #[test]
    fn normal_lists_every_case() {
        colored::control::set_override(false);
        let text = render_human(&summary(), &ReportOptions::default());
        assert!(text.contains("[OK] SuperTests::GoodTest"));
        assert!(text.contains("[FAIL] SuperTests::BadTest"));
        assert!(text.contains("\"b\""));
    }

    #[test]
    fn hidden_passes_are_not_printed() {
        colored::control::set_override(false);
        let opts = ReportOptions {
            hide_passes: true,
            ..Default::default()
        };
        let text = render_human(&summary(), &opts);
        assert!(!text.contains("GoodTest"));
        assert!(text.contains("BadTest"));
    }

    #[test]
    fn compact_groups_by_suite() {
        colored::control::set_override(false);
        let opts = ReportOptions {
            kind: OutputKind::Compact,
            ..Default::default()
        };
        let text = render_human(&summary(), &opts);
        assert!(text.contains("[FAIL] SuperTests (1/2)"));
    }
}
