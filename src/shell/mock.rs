//! Scripted process runner for testing.
//!
//! `MockRunner` implements [`ProcessRunner`] without spawning anything.
//! Responses are registered per command-line prefix and every invocation is
//! recorded for later assertion.
//!
//! # Example
//!
//! ```
//! use runway::shell::{CommandSpec, MockResponse, MockRunner, ProcessRunner};
//! use std::time::Duration;
//!
//! # tokio_test_block(async {
//! let runner = MockRunner::new();
//! runner.on("/usr/bin/python3 --version", MockResponse::success("Python 3.12.1"));
//!
//! let spec = CommandSpec::new("/usr/bin/python3").arg("--version");
//! let result = runner.run(&spec, Duration::from_secs(1)).await.unwrap();
//! assert!(result.stdout.contains("3.12.1"));
//! assert_eq!(runner.count("/usr/bin/python3 --version"), 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, RunwayError};

use super::process::{CommandResult, CommandSpec, OutputLine, ProcessRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
enum MockKind {
    Exit,
    Timeout,
    SpawnError,
    UntilCancelled,
}

/// A canned process outcome.
#[derive(Debug, Clone)]
pub struct MockResponse {
    kind: MockKind,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    delay: Duration,
}

impl MockResponse {
    /// Exit 0 with the given stdout.
    pub fn success(stdout: &str) -> Self {
        Self {
            kind: MockKind::Exit,
            exit_code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
            delay: Duration::ZERO,
        }
    }

    /// Exit with a non-zero code and the given stderr.
    pub fn failure(code: i32, stderr: &str) -> Self {
        Self {
            kind: MockKind::Exit,
            exit_code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Behave like a hung process: bounded runs time out.
    pub fn timeout() -> Self {
        Self {
            kind: MockKind::Timeout,
            ..Self::success("")
        }
    }

    /// Behave like a program that does not exist.
    pub fn spawn_error() -> Self {
        Self {
            kind: MockKind::SpawnError,
            ..Self::success("")
        }
    }

    /// Stream nothing and never exit until cancelled.
    pub fn until_cancelled() -> Self {
        Self {
            kind: MockKind::UntilCancelled,
            ..Self::success("")
        }
    }

    /// Also write this text to stderr.
    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.stderr = stderr.to_string();
        self
    }

    /// Wait this long before producing the outcome.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug)]
struct Rule {
    prefix: String,
    responses: VecDeque<MockResponse>,
}

impl Rule {
    /// Pop the next queued response; the last one repeats forever.
    fn next(&mut self) -> MockResponse {
        if self.responses.len() > 1 {
            if let Some(response) = self.responses.pop_front() {
                return response;
            }
        }
        self.responses
            .front()
            .cloned()
            .unwrap_or_else(MockResponse::spawn_error)
    }
}

/// Mock [`ProcessRunner`] that answers from registered rules.
///
/// The rule with the longest matching prefix wins. Unmatched commands behave
/// like missing programs.
#[derive(Debug, Default)]
pub struct MockRunner {
    rules: Mutex<Vec<Rule>>,
    invocations: Mutex<Vec<String>>,
}

impl MockRunner {
    /// Create a runner with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to every command line starting with `prefix`.
    pub fn on(&self, prefix: &str, response: MockResponse) {
        self.on_sequence(prefix, vec![response]);
    }

    /// Respond with each response in turn; the last one repeats.
    pub fn on_sequence(&self, prefix: &str, responses: Vec<MockResponse>) {
        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        rules.retain(|r| r.prefix != prefix);
        rules.push(Rule {
            prefix: prefix.to_string(),
            responses: responses.into(),
        });
    }

    /// Every command line run so far, in order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of invocations starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.invocations()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    fn respond(&self, spec: &CommandSpec) -> MockResponse {
        let line = spec.display();
        self.invocations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.clone());

        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        rules
            .iter_mut()
            .filter(|r| line.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len())
            .map(Rule::next)
            .unwrap_or_else(MockResponse::spawn_error)
    }

    fn finish(response: MockResponse) -> Result<CommandResult> {
        match response.exit_code {
            Some(0) => Ok(CommandResult::success(
                response.stdout,
                response.stderr,
                response.delay,
            )),
            code => Ok(CommandResult::failure(
                code,
                response.stdout,
                response.stderr,
                response.delay,
            )),
        }
    }
}

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<CommandResult> {
        let response = self.respond(spec);
        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        match response.kind {
            MockKind::SpawnError => Err(RunwayError::SpawnFailed {
                command: spec.display(),
                message: "No such file or directory (mock)".to_string(),
            }),
            MockKind::Timeout | MockKind::UntilCancelled => Err(RunwayError::CommandTimedOut {
                command: spec.display(),
                timeout,
            }),
            MockKind::Exit => Self::finish(response),
        }
    }

    async fn run_streaming(
        &self,
        spec: &CommandSpec,
        on_line: &(dyn Fn(OutputLine) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<CommandResult> {
        let response = self.respond(spec);
        if !response.delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(RunwayError::Cancelled),
                _ = tokio::time::sleep(response.delay) => {}
            }
        }
        match response.kind {
            MockKind::SpawnError => Err(RunwayError::SpawnFailed {
                command: spec.display(),
                message: "No such file or directory (mock)".to_string(),
            }),
            MockKind::Timeout | MockKind::UntilCancelled => {
                cancel.cancelled().await;
                Err(RunwayError::Cancelled)
            }
            MockKind::Exit => {
                for line in response.stdout.lines() {
                    on_line(OutputLine::Stdout(line.to_string()));
                }
                for line in response.stderr.lines() {
                    on_line(OutputLine::Stderr(line.to_string()));
                }
                Self::finish(response)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn unmatched_command_behaves_like_missing_program() {
        let runner = MockRunner::new();
        let err = runner
            .run(&CommandSpec::new("python9"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RunwayError::SpawnFailed { .. }));
        assert_eq!(runner.invocations(), vec!["python9".to_string()]);
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let runner = MockRunner::new();
        runner.on("/py -c", MockResponse::failure(1, "ModuleNotFoundError"));
        runner.on("/py -c import json", MockResponse::success(""));

        let ok = runner
            .run(
                &CommandSpec::new("/py").args(["-c", "import json"]),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        let missing = runner
            .run(
                &CommandSpec::new("/py").args(["-c", "import zotero_mcp"]),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert!(ok.success);
        assert!(!missing.success);
    }

    #[tokio::test]
    async fn sequence_advances_then_repeats_last() {
        let runner = MockRunner::new();
        runner.on_sequence(
            "/py -c",
            vec![MockResponse::failure(1, "missing"), MockResponse::success("")],
        );
        let spec = CommandSpec::new("/py").args(["-c", "import x"]);

        let first = runner.run(&spec, Duration::from_secs(1)).await.unwrap();
        let second = runner.run(&spec, Duration::from_secs(1)).await.unwrap();
        let third = runner.run(&spec, Duration::from_secs(1)).await.unwrap();

        assert!(!first.success);
        assert!(second.success);
        assert!(third.success);
        assert_eq!(runner.count("/py -c"), 3);
    }

    #[tokio::test]
    async fn timeout_response_reports_timed_out() {
        let runner = MockRunner::new();
        runner.on("/py --version", MockResponse::timeout());
        let err = runner
            .run(
                &CommandSpec::new("/py").arg("--version"),
                Duration::from_millis(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RunwayError::CommandTimedOut { .. }));
    }

    #[tokio::test]
    async fn streaming_emits_stdout_then_stderr_lines() {
        let runner = MockRunner::new();
        runner.on(
            "uv pip install",
            MockResponse::success("Resolved 12 packages\nInstalled 12 packages")
                .with_stderr("warning: cache miss"),
        );
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);

        let result = runner
            .run_streaming(
                &CommandSpec::new("uv").args(["pip", "install"]),
                &move |line: OutputLine| sink.lock().unwrap().push(line),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(result.success);
        let captured = lines.lock().unwrap();
        assert_eq!(captured.len(), 3);
        assert_eq!(
            captured[2],
            OutputLine::Stderr("warning: cache miss".to_string())
        );
    }

    #[tokio::test]
    async fn until_cancelled_waits_for_token() {
        let runner = MockRunner::new();
        runner.on("uv pip install", MockResponse::until_cancelled());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runner
            .run_streaming(
                &CommandSpec::new("uv").args(["pip", "install"]),
                &|_: OutputLine| {},
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
    }
}
