//! Per-connector registry of in-flight operations.

use crate::connector::domain::{ConnectorId, OperationKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct ActiveOperation {
    kind: OperationKind,
    cancel: CancellationToken,
}

/// Grants at most one operation per connector at a time.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlightOperations {
    active: Arc<Mutex<HashMap<ConnectorId, ActiveOperation>>>,
}

impl InFlightOperations {
    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectorId, ActiveOperation>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an operation for `id`, or returns the kind already running.
    pub(crate) fn try_acquire(
        &self,
        id: ConnectorId,
        kind: OperationKind,
    ) -> Result<OperationGuard, OperationKind> {
        let mut active = self.lock();
        if let Some(existing) = active.get(&id) {
            return Err(existing.kind);
        }
        let cancel = CancellationToken::new();
        active.insert(
            id,
            ActiveOperation {
                kind,
                cancel: cancel.clone(),
            },
        );
        Ok(OperationGuard {
            registry: self.clone(),
            id,
            cancel,
        })
    }

    /// Cancels the operation running for `id`; returns whether one existed.
    pub(crate) fn cancel(&self, id: ConnectorId) -> bool {
        self.lock().get(&id).is_some_and(|operation| {
            operation.cancel.cancel();
            true
        })
    }

    /// Returns the kind of operation running for `id`.
    pub(crate) fn active_kind(&self, id: ConnectorId) -> Option<OperationKind> {
        self.lock().get(&id).map(|operation| operation.kind)
    }
}

/// Exclusive right to run an operation; released on drop.
#[derive(Debug)]
pub(crate) struct OperationGuard {
    registry: InFlightOperations,
    id: ConnectorId,
    cancel: CancellationToken,
}

impl OperationGuard {
    /// Returns the operation's cancellation token.
    pub(crate) const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}
