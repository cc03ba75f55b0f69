//! Reads the expected output of a Lox script out of its trailing comments.
//!
//! Every source line is checked against an ordered rule table; the first rule whose
//! marker matches decides what (if anything) the line contributes. Recognised forms:
//!
//! - `print 1; // expect: 1`
//! - `foo(); // expect runtime error: Undefined variable 'foo'.` (plus a `[line N] in script` frame)
//! - `// [line 3] Error at 'x': Expect ';'.` and `// [c line 3] ...`
//! - `// [java line 3] ...` (ignored)
//! - `var a = ; // Error at ';': Expect expression.`

use crate::{t, t_args};
use anyhow::{Result, anyhow};

const EXPECT_MARKER: &str = " expect";
const RUNTIME_ERROR_MARKER: &str = "expect runtime error";
const JAVA_LINE_MARKER: &str = "[java line ";
const LINE_MARKER: &str = "[line ";
const C_LINE_MARKER: &str = "[c line ";
const ERROR_MARKER: &str = " Error";
const COMMENT_MARKER: &str = "// ";

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Width of the `// ` prefix dropped from `[line N]` annotations.
const COMMENT_PREFIX_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    /// `expect:` and `expect runtime error:` lines.
    Expect,
    /// `[java line N]`, skipped.
    ForeignLine,
    /// `[line N]` or `[c line N]` compile errors.
    LineError,
    /// `// ... Error ...` compile errors without a location.
    PlainError,
}

/// One source line after quote escaping.
struct Line<'a> {
    number: usize,
    text: &'a str,
}

struct Rule {
    kind: AnnotationKind,
    matches: fn(&str) -> bool,
    apply: fn(&Line<'_>, &mut Vec<String>) -> Result<()>,
}

/// Evaluated top to bottom; first match wins.
const RULES: &[Rule] = &[
    Rule {
        kind: AnnotationKind::Expect,
        matches: |text| text.contains(EXPECT_MARKER),
        apply: apply_expect,
    },
    Rule {
        kind: AnnotationKind::ForeignLine,
        matches: |text| text.contains(JAVA_LINE_MARKER),
        apply: |_, _| Ok(()),
    },
    Rule {
        kind: AnnotationKind::LineError,
        matches: |text| text.contains(LINE_MARKER) || text.contains(C_LINE_MARKER),
        apply: apply_line_error,
    },
    Rule {
        kind: AnnotationKind::PlainError,
        matches: |text| text.contains(ERROR_MARKER),
        apply: apply_plain_error,
    },
];

fn apply_expect(line: &Line<'_>, out: &mut Vec<String>) -> Result<()> {
    let (_, value) = line
        .text
        .split_once(':')
        .ok_or_else(|| anyhow!(t_args!("expect-missing-colon", "line" => line.number)))?;
    out.push(value.trim_start().to_string());
    if line.text.contains(RUNTIME_ERROR_MARKER) {
        out.push(runtime_error_frame(line.number));
    }
    Ok(())
}

fn apply_line_error(line: &Line<'_>, out: &mut Vec<String>) -> Result<()> {
    let normalized = line.text.replace(C_LINE_MARKER, LINE_MARKER);
    out.push(
        normalized
            .trim_start()
            .chars()
            .skip(COMMENT_PREFIX_LEN)
            .collect(),
    );
    Ok(())
}

fn apply_plain_error(line: &Line<'_>, out: &mut Vec<String>) -> Result<()> {
    let (_, message) = line
        .text
        .split_once(COMMENT_MARKER)
        .ok_or_else(|| anyhow!(t_args!("expect-missing-comment", "line" => line.number)))?;
    out.push(format!("[line {}] {}", line.number, message));
    Ok(())
}

/// The stack frame a runtime error prints after its message.
pub fn runtime_error_frame(line_number: usize) -> String {
    format!("[line {line_number}] in script")
}

pub fn escape_quotes(text: &str) -> String {
    text.replace('"', "\\\"")
}

/// Inverse of [`escape_quotes`]; yields the text the interpreter actually prints.
pub fn unescape_quotes(text: &str) -> String {
    text.replace("\\\"", "\"")
}

/// Which annotation, if any, a raw line carries.
pub fn annotation_kind(text: &str) -> Option<AnnotationKind> {
    RULES
        .iter()
        .find(|rule| (rule.matches)(text))
        .map(|rule| rule.kind)
}

/// Extract the expected output lines of a script, quote-escaped.
///
/// A script without annotations expects a single empty line.
pub fn extract(source: &str) -> Result<Vec<String>> {
    let source = source.strip_prefix(BYTE_ORDER_MARK).unwrap_or(source);
    let mut expectations = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let escaped = escape_quotes(raw);
        let line = Line {
            number: idx + 1,
            text: &escaped,
        };
        if let Some(rule) = RULES.iter().find(|rule| (rule.matches)(line.text)) {
            (rule.apply)(&line, &mut expectations)?;
        }
    }
    if expectations.is_empty() {
        expectations.push(String::new());
    }
    Ok(expectations)
}

/// Like [`extract`] but names the failing script.
pub fn extract_named(source: &str, script: &std::path::Path) -> Result<Vec<String>> {
    extract(source).map_err(|e| {
        anyhow!(t_args!("expect-parse-failed", "file" => script.display(), "error" => e))
    })
}

/// Short label for a rule kind, used in debug logs.
pub fn kind_label(kind: AnnotationKind) -> String {
    match kind {
        AnnotationKind::Expect => t!("annotation-expect"),
        AnnotationKind::ForeignLine => t!("annotation-foreign"),
        AnnotationKind::LineError => t!("annotation-line-error"),
        AnnotationKind::PlainError => t!("annotation-plain-error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_annotations_yields_single_empty_line() {
        let source = "var a = 1;\nprint;\n// just a comment\n";
        assert_eq!(extract(source).unwrap(), vec![String::new()]);
        assert_eq!(extract("").unwrap(), vec![String::new()]);
    }

    #[test]
    fn plain_expectations_keep_order() {
        let source = "print 1; // expect: 1\nprint 2; // expect: 2\n";
        assert_eq!(extract(source).unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn value_keeps_later_colons() {
        let source = "print x; // expect: foo:bar";
        assert_eq!(extract(source).unwrap(), vec!["foo:bar"]);
    }

    #[test]
    fn quotes_are_escaped() {
        let source = "print \"a\"; // expect: \"a\" said";
        assert_eq!(extract(source).unwrap(), vec!["\\\"a\\\" said"]);
    }

    #[test]
    fn runtime_error_adds_frame_with_own_line_number() {
        let source = "var a;\n\nprint a;\n\nunknown(); // expect runtime error: boom";
        assert_eq!(
            extract(source).unwrap(),
            vec!["boom".to_string(), "[line 5] in script".to_string()]
        );
    }

    #[test]
    fn c_line_is_normalized() {
        let c = extract("// [c line 7] Expect ')'.").unwrap();
        let plain = extract("// [line 7] Expect ')'.").unwrap();
        assert_eq!(c, plain);
        assert_eq!(c, vec!["[line 7] Expect ')'."]);
    }

    #[test]
    fn indented_line_error_drops_comment_prefix() {
        let source = "  // [line 2] Error at 'x': Nope.";
        assert_eq!(extract(source).unwrap(), vec!["[line 2] Error at 'x': Nope."]);
    }

    #[test]
    fn byte_order_mark_is_not_part_of_line_one() {
        let source = "\u{feff}// [line 1] Error at 'x': Nope.\nprint 1; // expect: 1";
        assert_eq!(
            extract(source).unwrap(),
            vec!["[line 1] Error at 'x': Nope.", "1"]
        );
    }

    #[test]
    fn java_line_is_ignored() {
        let source = "// [java line 3] Error at 'x': Expect ';'. Error";
        assert_eq!(extract(source).unwrap(), vec![String::new()]);
        assert_eq!(annotation_kind(source), Some(AnnotationKind::ForeignLine));
    }

    #[test]
    fn plain_error_is_prefixed_with_line() {
        let source = "print 1;\nvar a = ; // Error at ';': Expect expression.";
        assert_eq!(
            extract(source).unwrap(),
            vec!["[line 2] Error at ';': Expect expression."]
        );
    }

    #[test]
    fn expect_wins_over_error_marker() {
        assert_eq!(
            annotation_kind("f(); // expect runtime error: Error here"),
            Some(AnnotationKind::Expect)
        );
        assert_eq!(annotation_kind("print 1;"), None);
    }

    #[test]
    fn expect_without_colon_is_an_error() {
        let err = extract("print 1;\nprint 2; // expect 2").unwrap_err();
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn plain_error_without_comment_is_an_error() {
        assert!(extract("oops Error").is_err());
    }

    #[test]
    fn unescape_reverses_escape() {
        let raw = r#"say "hi" and \"keep\""#;
        assert_eq!(unescape_quotes(&escape_quotes(raw)), raw);
    }
}
