//! Handles for operations running in the background.

use super::{ConnectorLifecycleError, ConnectorLifecycleResult};
use crate::connector::domain::{ConnectorId, ConnectorRecord, OperationKind};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

/// A started test, deploy or retire.
///
/// The record is already in `testing` when the handle is returned. Dropping
/// the handle, or a pending [`wait`](Self::wait), cancels the operation; the
/// record still resolves to `error` in the background.
#[derive(Debug)]
pub struct OperationHandle {
    started: ConnectorRecord,
    kind: OperationKind,
    cancel: CancellationToken,
    task: JoinHandle<ConnectorLifecycleResult<ConnectorRecord>>,
    guard: DropGuard,
}

impl OperationHandle {
    pub(crate) fn new(
        started: ConnectorRecord,
        kind: OperationKind,
        cancel: CancellationToken,
        task: JoinHandle<ConnectorLifecycleResult<ConnectorRecord>>,
    ) -> Self {
        let guard = cancel.clone().drop_guard();
        Self {
            started,
            kind,
            cancel,
            task,
            guard,
        }
    }

    /// Returns the connector identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectorId {
        self.started.id()
    }

    /// Returns the operation kind.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Returns the record as it was when the operation started.
    #[must_use]
    pub const fn started(&self) -> &ConnectorRecord {
        &self.started
    }

    /// Requests cancellation; the record resolves to `error`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns a token that cancels this operation when triggered.
    ///
    /// The token outlives the handle, so callers can cancel from another task
    /// while [`wait`](Self::wait) is pending.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns whether the background task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the operation to resolve and returns the final record.
    ///
    /// A successful retire returns the record as it was removed.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorLifecycleError::NotFound`] when the connector was
    /// deleted while the operation ran, store errors from the final write, or
    /// [`ConnectorLifecycleError::Aborted`] when the background task failed.
    pub async fn wait(self) -> ConnectorLifecycleResult<ConnectorRecord> {
        let Self { task, guard, .. } = self;
        let joined = task.await;
        drop(guard.disarm());
        joined.map_err(|err| ConnectorLifecycleError::Aborted(err.to_string()))?
    }
}
