use crate::config::Settings;
use crate::{t, t_args};
use anyhow::{Context, Result, anyhow};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Something that can execute a script and report what it printed.
pub trait Interpreter: Send + Sync {
    /// Combined stdout and stderr lines of one run.
    fn run(&self, script: &Path) -> Result<Vec<String>>;
    fn validate(&self) -> Result<()>;
}

/// Runs an external interpreter binary as `<command> <script> <quiet_flag>`.
#[derive(Debug, Clone)]
pub struct ExternalInterpreter {
    pub command: String,
    pub quiet_flag: Option<String>,
    /// No limit when `None`; a hung interpreter then hangs the caller.
    pub timeout: Option<Duration>,
}

impl ExternalInterpreter {
    pub fn new(command: impl Into<String>) -> Self {
        ExternalInterpreter {
            command: command.into(),
            quiet_flag: Some(crate::config::DEFAULT_QUIET_FLAG.to_string()),
            timeout: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        ExternalInterpreter {
            command: settings.interpreter.clone(),
            quiet_flag: Some(settings.quiet_flag.clone()).filter(|q| !q.is_empty()),
            timeout: settings.timeout,
        }
    }

    fn args(&self, script: &Path) -> Vec<std::ffi::OsString> {
        let mut args = vec![script.as_os_str().to_os_string()];
        if let Some(flag) = &self.quiet_flag {
            args.push(flag.into());
        }
        args
    }

    /// Full path of the interpreter, if it can be found.
    pub fn resolve(&self) -> Result<PathBuf> {
        let path = Path::new(&self.command);
        if path.components().count() > 1 {
            if path.is_file() {
                return Ok(path.to_path_buf());
            }
            return Err(anyhow!(t_args!("backend-not-found", "cmd" => &self.command)));
        }
        which::which(&self.command)
            .map_err(|_| anyhow!(t_args!("backend-not-found", "cmd" => &self.command)))
    }

    /// Async variant of [`Interpreter::run`], used by the concurrent engine.
    pub async fn run_async(&self, script: &Path) -> Result<Vec<String>> {
        let mut cmd = tokio::process::Command::new(&self.command);
        cmd.args(self.args(script))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| t_args!("backend-failed-to-start", "cmd" => &self.command))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!(t!("backend-missing-stdout")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!(t!("backend-missing-stderr")))?;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let out_task = tokio::spawn(forward_lines_async(stdout, tx.clone()));
        let err_task = tokio::spawn(forward_lines_async(stderr, tx));

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    let _ = child.kill().await;
                    return Err(anyhow!(t_args!(
                        "backend-timeout",
                        "script" => script.display(),
                        "secs" => limit.as_secs_f64()
                    )));
                }
            },
            None => child.wait().await?,
        };
        if !status.success() {
            debug!(script = %script.display(), %status, "interpreter exited unsuccessfully");
        }

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        for task in [out_task, err_task] {
            if let Err(e) = task.await? {
                warn!("{}", t_args!("backend-read-error", "error" => e));
            }
        }
        Ok(split_output(&lines.join("\n")))
    }
}

fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

fn forward_lines<R: Read>(reader: R, tx: mpsc::Sender<String>) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        if tx.send(decode_line(&buf)).is_err() {
            return Ok(());
        }
    }
}

async fn forward_lines_async<R: AsyncRead + Unpin>(
    reader: R,
    tx: tokio::sync::mpsc::UnboundedSender<String>,
) -> std::io::Result<()> {
    let mut reader = tokio::io::BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        if tx.send(decode_line(&buf)).is_err() {
            return Ok(());
        }
    }
}

/// Split captured output into lines, dropping trailing blank lines.
///
/// Empty output is one empty line, the same shape as a script with no expectations.
pub fn split_output(text: &str) -> Vec<String> {
    text.trim_end()
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

impl Interpreter for ExternalInterpreter {
    fn run(&self, script: &Path) -> Result<Vec<String>> {
        let mut cmd = Command::new(&self.command);
        cmd.args(self.args(script))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| t_args!("backend-failed-to-start", "cmd" => &self.command))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!(t!("backend-missing-stdout")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!(t!("backend-missing-stderr")))?;

        // Both streams feed one channel so lines keep their arrival order
        let (tx, rx) = mpsc::channel();
        let err_tx = tx.clone();
        let readers = [
            thread::spawn(move || forward_lines(stdout, tx)),
            thread::spawn(move || forward_lines(stderr, err_tx)),
        ];

        let status = match self.timeout {
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(anyhow!(t_args!(
                        "backend-timeout",
                        "script" => script.display(),
                        "secs" => limit.as_secs_f64()
                    )));
                }
            },
            None => child.wait()?,
        };
        if !status.success() {
            debug!(script = %script.display(), %status, "interpreter exited unsuccessfully");
        }

        let lines: Vec<String> = rx.iter().collect();
        for reader in readers {
            match reader.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("{}", t_args!("backend-read-error", "error" => e)),
                Err(_) => return Err(anyhow!(t!("backend-reader-panicked"))),
            }
        }
        Ok(split_output(&lines.join("\n")))
    }

    fn validate(&self) -> Result<()> {
        let resolved = self.resolve()?;
        debug!(interpreter = %resolved.display(), "interpreter resolved");
        Ok(())
    }
}

/// Run one script with the given interpreter and default flags.
///
/// This is what generated test files call.
pub fn run_script(interpreter: &str, quiet_flag: &str, script: impl AsRef<Path>) -> Result<Vec<String>> {
    let backend = ExternalInterpreter {
        command: interpreter.to_string(),
        quiet_flag: Some(quiet_flag.to_string()).filter(|q| !q.is_empty()),
        timeout: None,
    };
    backend.run(script.as_ref())
}
