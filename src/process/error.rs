//! Error type for external process execution.

use super::CapturedOutput;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`ProcessRunner::run`](super::ProcessRunner::run).
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// The program could not be launched at all.
    #[error("failed to launch '{program}': {source}")]
    Launch {
        /// Program that failed to launch.
        program: String,
        /// Underlying spawn failure.
        source: Arc<std::io::Error>,
    },

    /// The program did not exit before the timeout and was killed.
    #[error("'{program}' timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// Program that timed out.
        program: String,
        /// Timeout that elapsed.
        timeout: Duration,
        /// Output captured before the process was killed.
        output: CapturedOutput,
    },

    /// The program exited unsuccessfully.
    #[error("'{program}' failed with {}: {}", describe_exit(.exit_code), .output.stderr().trim())]
    CommandFailed {
        /// Program that failed.
        program: String,
        /// Exit code, or `None` when the process was terminated by a signal.
        exit_code: Option<i32>,
        /// Captured output.
        output: CapturedOutput,
    },

    /// The caller cancelled the run and the process was killed.
    #[error("'{program}' was cancelled")]
    Cancelled {
        /// Program that was cancelled.
        program: String,
        /// Output captured before the process was killed.
        output: CapturedOutput,
    },

    /// Waiting on the launched process failed.
    #[error("failed while waiting for '{program}': {source}")]
    Wait {
        /// Program being waited on.
        program: String,
        /// Underlying wait failure.
        source: Arc<std::io::Error>,
    },
}

impl ProcessError {
    /// Returns the program associated with the failure.
    #[must_use]
    pub fn program(&self) -> &str {
        match self {
            Self::Launch { program, .. }
            | Self::Timeout { program, .. }
            | Self::CommandFailed { program, .. }
            | Self::Cancelled { program, .. }
            | Self::Wait { program, .. } => program,
        }
    }

    /// Returns output captured before the failure, when any was collected.
    #[must_use]
    pub const fn output(&self) -> Option<&CapturedOutput> {
        match self {
            Self::Timeout { output, .. }
            | Self::CommandFailed { output, .. }
            | Self::Cancelled { output, .. } => Some(output),
            Self::Launch { .. } | Self::Wait { .. } => None,
        }
    }

    /// Returns the exit code for [`ProcessError::CommandFailed`].
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("code {code}"),
        None => "termination by signal".to_owned(),
    }
}
