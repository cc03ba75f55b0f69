//! Turns corpus directory and file names into suite and case identifiers.
//!
//! `inherit_self/` becomes `InheritSelfTests` and `local_inherit_self.lox` becomes
//! `LocalInheritSelfTest`.

use std::path::Path;

pub const SUITE_SUFFIX: &str = "Tests";
pub const CASE_SUFFIX: &str = "Test";

/// Prepended to file names starting with a digit.
pub const DIGIT_PREFIX: &str = "M";

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn pascal_case(name: &str) -> String {
    name.split('_').map(capitalize).collect()
}

fn last_component(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Suite name for a directory.
pub fn suite_name(dir: &Path) -> String {
    format!("{}{SUITE_SUFFIX}", pascal_case(&last_component(dir)))
}

/// Case name for a script file.
pub fn case_name(file: &Path) -> String {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = if stem.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{DIGIT_PREFIX}{stem}")
    } else {
        stem
    };
    format!("{}{CASE_SUFFIX}", pascal_case(&stem))
}
