//! Child process execution.
//!
//! Every process runway spawns (version probes, import probes, environment
//! creation, package installs) goes through a [`ProcessRunner`]. The system
//! implementation uses `tokio::process`; tests substitute
//! [`MockRunner`](super::MockRunner).

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, RunwayError};

/// A program invocation: executable, arguments, extra environment.
///
/// Arguments are passed directly to the program, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable path or bare name.
    pub program: PathBuf,

    /// Arguments in order.
    pub args: Vec<String>,

    /// Environment variables (merged with the inherited environment).
    pub env: Vec<(String, String)>,

    /// Working directory.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a spec for a program with no arguments.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Human-readable command line, used in logs and error messages.
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Result of executing a command to completion.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
        }
    }

    /// Stdout followed by stderr, for pattern matching that must see both.
    pub fn combined_output(&self) -> String {
        let mut combined = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&self.stderr);
        }
        combined
    }
}

/// Output line from streaming command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

impl OutputLine {
    /// The line text regardless of stream.
    pub fn text(&self) -> &str {
        match self {
            Self::Stdout(s) | Self::Stderr(s) => s,
        }
    }
}

/// Bounded buffer holding the most recent output lines.
///
/// Failures are reported with this tail rather than a bare exit code.
#[derive(Debug, Clone)]
pub struct OutputTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl OutputTail {
    /// Create a tail keeping at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(256)),
            capacity: capacity.max(1),
        }
    }

    /// Record a line, evicting the oldest when full.
    pub fn push(&mut self, line: &str) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The retained lines joined with newlines.
    pub fn render(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

/// Executes child processes on behalf of the provisioning components.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a short-lived command to completion with a hard timeout.
    ///
    /// A command still running when the timeout elapses is killed and
    /// reported as [`RunwayError::CommandTimedOut`].
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<CommandResult>;

    /// Run a long-lived command, delivering each output line as it arrives.
    ///
    /// There is no timeout. When `cancel` fires the child is killed and
    /// [`RunwayError::Cancelled`] is returned.
    async fn run_streaming(
        &self,
        spec: &CommandSpec,
        on_line: &(dyn Fn(OutputLine) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<CommandResult>;
}

/// [`ProcessRunner`] backed by real operating system processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a system runner.
    pub fn new() -> Self {
        Self
    }
}

/// Line reader that tolerates output in any encoding.
///
/// Bytes that are not valid UTF-8 are replaced rather than ending the
/// stream, so a child never blocks on a pipe nobody drains. A partially read
/// line survives a dropped `next_line` future and is completed by the next
/// call.
struct LossyLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LossyLines<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Ok(Some(line))
    }
}

fn spawn_error(spec: &CommandSpec, err: std::io::Error) -> RunwayError {
    RunwayError::SpawnFailed {
        command: spec.display(),
        message: err.to_string(),
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<CommandResult> {
        let start = Instant::now();
        tracing::debug!("Running (timeout {:?}): {}", timeout, spec.display());

        let child = spec.to_command().spawn().map_err(|e| spawn_error(spec, e))?;

        // kill_on_drop reaps the child when the timeout drops the future
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| spawn_error(spec, e))?,
            Err(_) => {
                return Err(RunwayError::CommandTimedOut {
                    command: spec.display(),
                    timeout,
                })
            }
        };

        let duration = start.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(CommandResult::success(stdout, stderr, duration))
        } else {
            Ok(CommandResult::failure(
                output.status.code(),
                stdout,
                stderr,
                duration,
            ))
        }
    }

    async fn run_streaming(
        &self,
        spec: &CommandSpec,
        on_line: &(dyn Fn(OutputLine) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<CommandResult> {
        let start = Instant::now();
        tracing::debug!("Streaming: {}", spec.display());

        let mut child = spec.to_command().spawn().map_err(|e| spawn_error(spec, e))?;

        let stdout = child.stdout.take().ok_or_else(|| RunwayError::SpawnFailed {
            command: spec.display(),
            message: "stdout was not captured".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| RunwayError::SpawnFailed {
            command: spec.display(),
            message: "stderr was not captured".to_string(),
        })?;

        let mut stdout_lines = LossyLines::new(stdout);
        let mut stderr_lines = LossyLines::new(stderr);
        let mut stdout_output = String::new();
        let mut stderr_output = String::new();
        let mut stdout_open = true;
        let mut stderr_open = true;

        while stdout_open || stderr_open {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = child.kill().await;
                    return Err(RunwayError::Cancelled);
                }
                line = stdout_lines.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => {
                        stdout_output.push_str(&line);
                        stdout_output.push('\n');
                        on_line(OutputLine::Stdout(line));
                    }
                    Ok(None) => stdout_open = false,
                    Err(e) => {
                        tracing::debug!("stdout of {} unreadable: {}", spec.display(), e);
                        stdout_open = false;
                    }
                },
                line = stderr_lines.next_line(), if stderr_open => match line {
                    Ok(Some(line)) => {
                        stderr_output.push_str(&line);
                        stderr_output.push('\n');
                        on_line(OutputLine::Stderr(line));
                    }
                    Ok(None) => stderr_open = false,
                    Err(e) => {
                        tracing::debug!("stderr of {} unreadable: {}", spec.display(), e);
                        stderr_open = false;
                    }
                },
            }
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                return Err(RunwayError::Cancelled);
            }
            status = child.wait() => status.map_err(|e| spawn_error(spec, e))?,
        };

        let duration = start.elapsed();

        if status.success() {
            Ok(CommandResult::success(
                stdout_output,
                stderr_output,
                duration,
            ))
        } else {
            Ok(CommandResult::failure(
                status.code(),
                stdout_output,
                stderr_output,
                duration,
            ))
        }
    }
}
