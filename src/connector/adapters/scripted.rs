//! Scripted deployment driver for deterministic tests and local runs.

use crate::connector::{
    domain::{ConnectorId, ConnectorRecord, OperationKind, Session},
    ports::{DeployReceipt, DeploymentDriver, DriverError, DriverResult, TestReport},
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Outcome returned by the next scripted call.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Deploy succeeds with this receipt.
    Deployed(DeployReceipt),
    /// Test completes with this report.
    Tested(TestReport),
    /// Removal succeeds.
    Removed,
    /// The call fails.
    Fail(DriverError),
}

/// A call observed by the scripted driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedCall {
    /// Operation requested.
    pub kind: OperationKind,
    /// Connector the operation targeted.
    pub connector_id: ConnectorId,
    /// Connector name at call time.
    pub connector_name: String,
}

#[derive(Debug, Default)]
struct ScriptState {
    outcomes: VecDeque<ScriptedOutcome>,
    calls: Vec<ScriptedCall>,
}

/// Driver that replays queued outcomes.
///
/// With an empty queue every call succeeds. [`hold`](Self::hold) parks calls
/// until [`release`](Self::release) or cancellation, which lets tests observe
/// records while an operation is in flight.
#[derive(Debug, Clone)]
pub struct ScriptedDeploymentDriver {
    state: Arc<Mutex<ScriptState>>,
    gate: Arc<watch::Sender<bool>>,
}

impl Default for ScriptedDeploymentDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDeploymentDriver {
    /// Creates a driver with no queued outcomes and the gate open.
    #[must_use]
    pub fn new() -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(ScriptState::default())),
            gate: Arc::new(gate),
        }
    }

    /// Queues the outcome for a future call.
    pub fn push_outcome(&self, outcome: ScriptedOutcome) {
        self.lock().outcomes.push_back(outcome);
    }

    /// Parks subsequent calls until released.
    pub fn hold(&self) {
        self.gate.send_replace(true);
    }

    /// Releases parked calls.
    pub fn release(&self) {
        self.gate.send_replace(false);
    }

    /// Returns every call observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(
        &self,
        kind: OperationKind,
        record: &ConnectorRecord,
        cancel: &CancellationToken,
    ) -> DriverResult<Option<ScriptedOutcome>> {
        self.lock().calls.push(ScriptedCall {
            kind,
            connector_id: record.id(),
            connector_name: record.definition().name().to_owned(),
        });

        let mut gate = self.gate.subscribe();
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DriverError::Cancelled),
            released = gate.wait_for(|held| !*held) => {
                if released.is_err() {
                    return Err(DriverError::Cancelled);
                }
            }
        }
        Ok(self.lock().outcomes.pop_front())
    }
}

#[async_trait]
impl DeploymentDriver for ScriptedDeploymentDriver {
    async fn deploy(
        &self,
        record: &ConnectorRecord,
        _session: &Session,
        cancel: CancellationToken,
    ) -> DriverResult<DeployReceipt> {
        match self.enter(OperationKind::Deploy, record, &cancel).await? {
            Some(ScriptedOutcome::Deployed(receipt)) => Ok(receipt),
            Some(ScriptedOutcome::Fail(err)) => Err(err),
            Some(ScriptedOutcome::Tested(_) | ScriptedOutcome::Removed) | None => {
                Ok(DeployReceipt {
                    published_id: Some(format!("scripted-{}", record.id())),
                    output: String::new(),
                })
            }
        }
    }

    async fn test(
        &self,
        record: &ConnectorRecord,
        cancel: CancellationToken,
    ) -> DriverResult<TestReport> {
        match self.enter(OperationKind::Test, record, &cancel).await? {
            Some(ScriptedOutcome::Tested(report)) => Ok(report),
            Some(ScriptedOutcome::Fail(err)) => Err(err),
            Some(ScriptedOutcome::Deployed(_) | ScriptedOutcome::Removed) | None => {
                Ok(TestReport::passed())
            }
        }
    }

    async fn remove(
        &self,
        record: &ConnectorRecord,
        _session: &Session,
        cancel: CancellationToken,
    ) -> DriverResult<()> {
        match self.enter(OperationKind::Retire, record, &cancel).await? {
            Some(ScriptedOutcome::Fail(err)) => Err(err),
            Some(_) | None => Ok(()),
        }
    }
}
