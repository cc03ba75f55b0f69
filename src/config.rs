use crate::t_args;
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "lox-tester.yaml";
pub const DEFAULT_INTERPRETER: &str = "LoxMin";
pub const DEFAULT_QUIET_FLAG: &str = "-q";
pub const DEFAULT_TOP_LEVEL_SUITE: &str = "GeneralTests";

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct RawConfig {
    pub interpreter: Option<String>,
    pub quiet_flag: Option<String>,
    /// Seconds.
    pub timeout: Option<f64>,
    pub extension: Option<String>,
    pub top_level_suite: Option<String>,
}

/// Settings after merging defaults, config file and command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub interpreter: String,
    pub quiet_flag: String,
    pub timeout: Option<Duration>,
    pub extension: Option<String>,
    pub top_level_suite: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            quiet_flag: DEFAULT_QUIET_FLAG.to_string(),
            timeout: None,
            extension: None,
            top_level_suite: DEFAULT_TOP_LEVEL_SUITE.to_string(),
        }
    }
}

fn resolve_path_relative_to_config(path: &str, config_file: &Path) -> String {
    let path_buf = Path::new(path);
    // Bare command names are left for PATH lookup
    if path_buf.is_absolute() || path_buf.components().count() == 1 {
        return path.to_string();
    }
    match config_file.parent() {
        Some(dir) => dir.join(path).to_string_lossy().into_owned(),
        None => path.to_string(),
    }
}

pub fn parse_config(content: &str, origin: &Path) -> Result<RawConfig> {
    let mut raw: RawConfig = serde_yaml::from_str(content)
        .with_context(|| t_args!("config-yaml-error", "file" => origin.display()))?;
    raw.interpreter = raw
        .interpreter
        .map(|i| resolve_path_relative_to_config(i.trim(), origin));
    raw.extension = raw
        .extension
        .map(|e| e.trim().trim_start_matches('.').to_string());
    Ok(raw)
}

/// Read the explicit config file, or the default one if it exists.
pub fn load_config(explicit: Option<&Path>) -> Result<Option<RawConfig>> {
    let path: PathBuf = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !candidate.is_file() {
                return Ok(None);
            }
            candidate
        }
    };
    let content = fs::read_to_string(&path)
        .with_context(|| t_args!("config-failed-to-read", "file" => path.display()))?;
    parse_config(&content, &path).map(Some)
}

/// Seconds as a timeout; must be finite and above zero.
pub fn timeout_from_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(anyhow!(t_args!("config-invalid-timeout", "secs" => secs)));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| anyhow!(t_args!("config-invalid-timeout", "secs" => e)))
}

impl Settings {
    pub fn with_config(mut self, raw: &RawConfig) -> Result<Self> {
        if let Some(i) = &raw.interpreter {
            self.interpreter = i.clone();
        }
        if let Some(q) = &raw.quiet_flag {
            self.quiet_flag = q.trim().to_string();
        }
        if let Some(secs) = raw.timeout {
            self.timeout = Some(timeout_from_secs(secs)?);
        }
        if raw.extension.is_some() {
            self.extension = raw.extension.clone();
        }
        if let Some(s) = &raw.top_level_suite {
            self.top_level_suite = s.trim().to_string();
        }
        Ok(self)
    }
}
