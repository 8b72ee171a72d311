//! Deployment driver port.

use crate::connector::domain::{ConnectorRecord, FailureKind, Session};
use crate::process::ProcessError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Result type for deployment driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Result of a successful deploy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeployReceipt {
    /// Identifier assigned by the platform, when it reports one.
    pub published_id: Option<String>,
    /// Output reported by the platform.
    pub output: String,
}

/// Result of a connectivity test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    /// Whether the connector's target responded.
    pub passed: bool,
    /// Explanation, mostly for failures.
    pub detail: Option<String>,
}

impl TestReport {
    /// A passing report.
    #[must_use]
    pub const fn passed() -> Self {
        Self {
            passed: true,
            detail: None,
        }
    }

    /// A failing report with an explanation.
    #[must_use]
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: Some(detail.into()),
        }
    }
}

/// Performs test, deploy and removal against the deployment platform.
///
/// Implementations must stop promptly once `cancel` fires.
#[async_trait]
pub trait DeploymentDriver: Send + Sync {
    /// Publishes the connector, creating or updating it in place.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when publication fails.
    async fn deploy(
        &self,
        record: &ConnectorRecord,
        session: &Session,
        cancel: CancellationToken,
    ) -> DriverResult<DeployReceipt>;

    /// Checks that the connector's target server responds.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when the check itself could not run. An
    /// unreachable server yields a failing [`TestReport`] instead.
    async fn test(
        &self,
        record: &ConnectorRecord,
        cancel: CancellationToken,
    ) -> DriverResult<TestReport>;

    /// Removes a published connector from the platform.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when removal fails.
    async fn remove(
        &self,
        record: &ConnectorRecord,
        session: &Session,
        cancel: CancellationToken,
    ) -> DriverResult<()>;
}

/// Errors returned by deployment drivers.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// The external tool failed.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The connector's target could not be reached.
    #[error("connector target unreachable: {0}")]
    Unreachable(String),

    /// The platform rejected the request.
    #[error("platform rejected request{}: {message}", describe_status(.status_code))]
    Platform {
        /// HTTP-style status code, when one was reported.
        status_code: Option<u16>,
        /// Platform message.
        message: String,
    },

    /// Local I/O failed.
    #[error("driver I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl DriverError {
    /// Wraps a local I/O failure.
    #[must_use]
    pub fn io(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }

    /// Returns the failure category.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Process(ProcessError::Launch { .. } | ProcessError::Wait { .. }) => {
                FailureKind::Launch
            }
            Self::Process(ProcessError::Timeout { .. }) => FailureKind::Timeout,
            Self::Process(ProcessError::CommandFailed { .. }) => FailureKind::CommandFailed,
            Self::Process(ProcessError::Cancelled { .. }) | Self::Cancelled => {
                FailureKind::Cancelled
            }
            Self::Unreachable(_) => FailureKind::Unreachable,
            Self::Platform { .. } => FailureKind::Platform,
            Self::Io(_) => FailureKind::Io,
        }
    }

    /// Returns the message recorded on the connector.
    ///
    /// A failed command reports its trimmed standard error, falling back to
    /// standard output and then to the error description.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        if let Self::Process(ProcessError::CommandFailed { output, .. }) = self {
            let stderr = output.stderr().trim();
            if !stderr.is_empty() {
                return stderr.to_owned();
            }
            let stdout = output.stdout().trim();
            if !stdout.is_empty() {
                return stdout.to_owned();
            }
        }
        self.to_string()
    }
}

fn describe_status(status_code: &Option<u16>) -> String {
    status_code.map_or_else(String::new, |code| format!(" with status {code}"))
}
