//! Builds test suites from a corpus directory.
//!
//! Loose scripts in the root form one suite with a fixed name; every immediate
//! subdirectory forms a suite of its own, unless its name starts with `_`. Nesting
//! below the first level is not walked.

use crate::config::{DEFAULT_TOP_LEVEL_SUITE, Settings};
use crate::expect::{self, annotation_kind, kind_label};
use crate::naming::{case_name, suite_name};
use crate::t_args;
use crate::types::{TestCase, TestSuite};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Subdirectories starting with this are skipped.
pub const EXCLUDE_PREFIX: char = '_';

/// Directory listing and file reading, kept apart from suite building.
pub trait CorpusSource {
    /// Files directly inside `dir`.
    fn files(&self, dir: &Path) -> Result<Vec<PathBuf>>;
    /// Directories directly inside `dir`.
    fn subdirs(&self, dir: &Path) -> Result<Vec<PathBuf>>;
    fn read(&self, file: &Path) -> Result<String>;
}

/// The real filesystem, listed in file-name order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCorpus;

impl FsCorpus {
    fn entries(&self, dir: &Path, want_dirs: bool) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| t_args!("corpus-failed-to-list", "dir" => dir.display()))?;
            let is_dir = entry.file_type().is_dir();
            if is_dir == want_dirs && (is_dir || entry.file_type().is_file()) {
                out.push(entry.into_path());
            }
        }
        Ok(out)
    }
}

impl CorpusSource for FsCorpus {
    fn files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.entries(dir, false)
    }

    fn subdirs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.entries(dir, true)
    }

    fn read(&self, file: &Path) -> Result<String> {
        fs::read_to_string(file)
            .with_context(|| t_args!("corpus-failed-to-read", "file" => file.display()))
    }
}

#[derive(Debug, Clone)]
pub struct CorpusOptions {
    pub top_level_suite: String,
    /// Only files with this extension become cases; all files when `None`.
    pub extension: Option<String>,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        CorpusOptions {
            top_level_suite: DEFAULT_TOP_LEVEL_SUITE.to_string(),
            extension: None,
        }
    }
}

impl From<&Settings> for CorpusOptions {
    fn from(s: &Settings) -> Self {
        CorpusOptions {
            top_level_suite: s.top_level_suite.clone(),
            extension: s.extension.clone(),
        }
    }
}

fn is_excluded(dir: &Path) -> bool {
    dir.file_name()
        .map(|n| n.to_string_lossy().starts_with(EXCLUDE_PREFIX))
        .unwrap_or(false)
}

fn wanted(file: &Path, opts: &CorpusOptions) -> bool {
    match &opts.extension {
        Some(ext) => file.extension().is_some_and(|e| e == ext.as_str()),
        None => true,
    }
}

/// Case for one script: name from the file, expectations from its comments.
pub fn build_case<C: CorpusSource>(source: &C, file: &Path) -> Result<TestCase> {
    let content = source.read(file)?;
    if tracing::enabled!(tracing::Level::TRACE) {
        for (idx, line) in content.lines().enumerate() {
            if let Some(kind) = annotation_kind(line) {
                trace!(file = %file.display(), line = idx + 1, "{}", kind_label(kind));
            }
        }
    }
    let expect = expect::extract_named(&content, file)?;
    Ok(TestCase {
        name: case_name(file),
        script: file.to_path_buf(),
        expect,
    })
}

/// Suite of every wanted file directly inside `dir`.
pub fn build_suite<C: CorpusSource>(
    source: &C,
    dir: &Path,
    name: String,
    opts: &CorpusOptions,
) -> Result<TestSuite> {
    let mut cases = Vec::new();
    for file in source.files(dir)? {
        if !wanted(&file, opts) {
            continue;
        }
        cases.push(build_case(source, &file)?);
    }
    debug!("{}", t_args!("debug-suite-built", "name" => &name, "count" => cases.len()));
    Ok(TestSuite { name, cases })
}

/// All suites under `root`: the top-level suite first, then one per subdirectory.
///
/// Colliding names are kept as they are.
pub fn build_suites<C: CorpusSource>(
    source: &C,
    root: &Path,
    opts: &CorpusOptions,
) -> Result<Vec<TestSuite>> {
    let mut suites = vec![build_suite(source, root, opts.top_level_suite.clone(), opts)?];
    for dir in source.subdirs(root)? {
        if is_excluded(&dir) {
            debug!("{}", t_args!("debug-dir-excluded", "dir" => dir.display()));
            continue;
        }
        suites.push(build_suite(source, &dir, suite_name(&dir), opts)?);
    }
    Ok(suites)
}

pub fn load_corpus(root: &Path, opts: &CorpusOptions) -> Result<Vec<TestSuite>> {
    build_suites(&FsCorpus, root, opts)
}
