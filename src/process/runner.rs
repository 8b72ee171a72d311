//! Process runner with capped capture, timeouts, and cancellation.

use super::{
    CapturedOutput, ProcessError,
    capture::{StreamBuffer, collect, drain_into},
};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default capture limit per output stream.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 256 * 1024;

/// How long to wait for output streams to close once the child has exited.
const STREAM_SETTLE_GRACE: Duration = Duration::from_millis(500);

/// Description of a single program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    working_dir: Option<Utf8PathBuf>,
    timeout: Duration,
}

impl CommandSpec {
    /// Creates an invocation of `program` bounded by `timeout`.
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
            timeout,
        }
    }

    /// Replaces the argument list.
    #[must_use]
    pub fn with_args<I, A>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args = values.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a single argument.
    #[must_use]
    pub fn with_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Adds environment variables on top of the inherited environment.
    #[must_use]
    pub fn with_env(mut self, values: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env.extend(values);
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, value: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(value.into());
        self
    }

    /// Returns the program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the argument list.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the extra environment variables.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Returns the working directory, if set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8Path> {
        self.working_dir.as_deref()
    }

    /// Returns the timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Output of a successful (exit code 0) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    stdout: String,
    stderr: String,
    truncated: bool,
}

impl ProcessOutput {
    /// Returns standard output with surrounding whitespace trimmed.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Returns standard error as captured.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Returns whether either stream exceeded the capture limit.
    #[must_use]
    pub const fn truncated(&self) -> bool {
        self.truncated
    }

    /// Consumes the output and returns trimmed standard output.
    #[must_use]
    pub fn into_stdout(self) -> String {
        self.stdout
    }
}

impl From<CapturedOutput> for ProcessOutput {
    fn from(captured: CapturedOutput) -> Self {
        Self {
            stdout: captured.stdout().trim().to_owned(),
            stderr: captured.stderr().to_owned(),
            truncated: captured.truncated(),
        }
    }
}

enum Completion {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Launches external programs with bounded output capture and a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessRunner {
    max_output_bytes: usize,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_BYTES)
    }
}

impl ProcessRunner {
    /// Creates a runner that keeps at most `max_output_bytes` per stream.
    #[must_use]
    pub const fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }

    /// Returns the per-stream capture limit.
    #[must_use]
    pub const fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }

    /// Runs `spec` to completion, timeout, or cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Launch`] when the program cannot be started,
    /// [`ProcessError::Timeout`] or [`ProcessError::Cancelled`] when the child
    /// had to be killed, and [`ProcessError::CommandFailed`] for a non-zero
    /// exit.
    pub async fn run(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessError> {
        let program = spec.program().to_owned();
        debug!(
            program = %program,
            args = ?spec.args(),
            timeout_ms = duration_millis(spec.timeout()),
            "launching process"
        );

        let mut command = Command::new(spec.program());
        command
            .args(spec.args())
            .envs(spec.env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = spec.working_dir() {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|err| ProcessError::Launch {
            program: program.clone(),
            source: Arc::new(err),
        })?;

        let stdout_buffer = StreamBuffer::new(self.max_output_bytes);
        let stderr_buffer = StreamBuffer::new(self.max_output_bytes);
        let mut readers = JoinSet::new();
        if let Some(stdout) = child.stdout.take() {
            readers.spawn(drain_into(stdout, stdout_buffer.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.spawn(drain_into(stderr, stderr_buffer.clone()));
        }

        let completion = tokio::select! {
            waited = child.wait() => Completion::Exited(waited),
            () = tokio::time::sleep(spec.timeout()) => Completion::TimedOut,
            () = cancel.cancelled() => Completion::Cancelled,
        };

        match completion {
            Completion::Exited(Ok(status)) => {
                settle_readers(&mut readers).await;
                let output = collect(&stdout_buffer, &stderr_buffer);
                if status.success() {
                    debug!(program = %program, truncated = output.truncated(), "process succeeded");
                    return Ok(ProcessOutput::from(output));
                }
                warn!(
                    program = %program,
                    exit_code = ?status.code(),
                    stderr = %output.stderr().trim(),
                    "process failed"
                );
                Err(ProcessError::CommandFailed {
                    program,
                    exit_code: status.code(),
                    output,
                })
            }
            Completion::Exited(Err(err)) => {
                terminate(&mut child, &program).await;
                readers.abort_all();
                Err(ProcessError::Wait {
                    program,
                    source: Arc::new(err),
                })
            }
            Completion::TimedOut => {
                terminate(&mut child, &program).await;
                settle_readers(&mut readers).await;
                warn!(
                    program = %program,
                    timeout_ms = duration_millis(spec.timeout()),
                    "process timed out and was killed"
                );
                Err(ProcessError::Timeout {
                    program,
                    timeout: spec.timeout(),
                    output: collect(&stdout_buffer, &stderr_buffer),
                })
            }
            Completion::Cancelled => {
                terminate(&mut child, &program).await;
                settle_readers(&mut readers).await;
                debug!(program = %program, "process cancelled and killed");
                Err(ProcessError::Cancelled {
                    program,
                    output: collect(&stdout_buffer, &stderr_buffer),
                })
            }
        }
    }
}

async fn terminate(child: &mut Child, program: &str) {
    if let Err(err) = child.kill().await {
        warn!(program = %program, error = %err, "failed to kill process");
    }
}

/// Waits briefly for reader tasks to reach end of stream.
///
/// Grandchildren may inherit the pipes and keep them open after the child
/// exits; readers still running after the grace period are aborted and the
/// partial capture is used.
async fn settle_readers(readers: &mut JoinSet<()>) {
    let drained = tokio::time::timeout(STREAM_SETTLE_GRACE, async {
        while readers.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        debug!("output streams still open after exit; using partial capture");
        readers.abort_all();
    }
}

pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
