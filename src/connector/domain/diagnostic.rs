//! Failure diagnostics recorded on connectors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of an operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The external program could not be started.
    Launch,
    /// The operation exceeded its time bound.
    Timeout,
    /// The external program exited unsuccessfully.
    CommandFailed,
    /// The operation was cancelled by its caller.
    Cancelled,
    /// The connector's target server could not be reached.
    Unreachable,
    /// The platform rejected the request.
    Platform,
    /// Local I/O failed.
    Io,
}

impl FailureKind {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Launch => "launch",
            Self::Timeout => "timeout",
            Self::CommandFailed => "command_failed",
            Self::Cancelled => "cancelled",
            Self::Unreachable => "unreachable",
            Self::Platform => "platform",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Explanation of why a connector resolved to `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    kind: FailureKind,
    message: String,
    recorded_at: DateTime<Utc>,
}

impl Diagnostic {
    /// Creates a diagnostic.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>, recorded_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            message: message.into(),
            recorded_at,
        }
    }

    /// Returns the failure category.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns when the failure was recorded.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.kind, self.message)
    }
}
