//! Service layer for connector lifecycle orchestration.

use super::{
    OperationHandle,
    in_flight::{InFlightOperations, OperationGuard},
};
use crate::connector::{
    domain::{
        ConnectorConfig, ConnectorDefinition, ConnectorDomainError, ConnectorId, ConnectorRecord,
        ConnectorValidator, Diagnostic, FailureKind, OperationKind, OperationLease,
        OperationOutcome, Session, ValidationError,
    },
    ports::{ConnectorStore, ConnectorStoreError, ConnectorStoreResult, DeploymentDriver},
};
use crate::process::duration_millis;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default watchdog bound on a single operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Slack added to the watchdog bound when leasing a connector, covering the
/// final store write.
const LEASE_GRACE: Duration = Duration::from_secs(5);

/// Attempts made by a compare-and-swap write before giving up.
const MAX_MUTATION_ATTEMPTS: u32 = 16;

/// Service-level errors for connector lifecycle operations.
#[derive(Debug, Clone, Error)]
pub enum ConnectorLifecycleError {
    /// The configuration is invalid; nothing was changed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No connector exists with the given identifier.
    #[error("connector {0} not found")]
    NotFound(ConnectorId),

    /// Another operation is still running for the connector.
    #[error("connector {id} already has a {active} operation in progress")]
    OperationInProgress {
        /// Connector identifier.
        id: ConnectorId,
        /// Operation currently running.
        active: OperationKind,
    },

    /// The operation needs an active authenticated session.
    #[error("an active session is required to {0}")]
    AuthRequired(OperationKind),

    /// The status transition is not allowed.
    #[error(transparent)]
    Domain(#[from] ConnectorDomainError),

    /// Store operation failed.
    #[error(transparent)]
    Store(ConnectorStoreError),

    /// Concurrent writers kept winning the compare-and-swap race.
    #[error("connector {id} is being modified concurrently; gave up after {attempts} attempts")]
    Contended {
        /// Connector identifier.
        id: ConnectorId,
        /// Attempts made.
        attempts: u32,
    },

    /// The operation's lease lapsed and another operation reclaimed the
    /// connector; the result was discarded.
    #[error("connector {0} was reclaimed by another operation; result discarded")]
    LeaseLost(ConnectorId),

    /// The background operation task failed.
    #[error("operation aborted: {0}")]
    Aborted(String),
}

impl From<ConnectorStoreError> for ConnectorLifecycleError {
    fn from(err: ConnectorStoreError) -> Self {
        match err {
            ConnectorStoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Result type for lifecycle service operations.
pub type ConnectorLifecycleResult<T> = Result<T, ConnectorLifecycleError>;

/// Operation waiting to be driven, with the session it needs.
#[derive(Debug, Clone)]
enum PendingOperation {
    Test,
    Deploy(Session),
    Retire(Session),
}

impl PendingOperation {
    const fn kind(&self) -> OperationKind {
        match self {
            Self::Test => OperationKind::Test,
            Self::Deploy(_) => OperationKind::Deploy,
            Self::Retire(_) => OperationKind::Retire,
        }
    }

    const fn session(&self) -> Option<&Session> {
        match self {
            Self::Test => None,
            Self::Deploy(session) | Self::Retire(session) => Some(session),
        }
    }
}

/// Connector lifecycle orchestration service.
///
/// Owns the status state machine. Every write is a compare-and-swap against
/// the live record, so edits made while an operation runs are never
/// overwritten by its result. Operations lease the record through the store,
/// which keeps services in other processes from starting a second operation
/// on the same connector.
pub struct ConnectorLifecycleService<S, D, C>
where
    S: ConnectorStore + 'static,
    D: DeploymentDriver + 'static,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    driver: Arc<D>,
    clock: Arc<C>,
    in_flight: InFlightOperations,
    operation_timeout: Duration,
}

impl<S, D, C> Clone for ConnectorLifecycleService<S, D, C>
where
    S: ConnectorStore + 'static,
    D: DeploymentDriver + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            driver: Arc::clone(&self.driver),
            clock: Arc::clone(&self.clock),
            in_flight: self.in_flight.clone(),
            operation_timeout: self.operation_timeout,
        }
    }
}

impl<S, D, C> ConnectorLifecycleService<S, D, C>
where
    S: ConnectorStore + 'static,
    D: DeploymentDriver + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new lifecycle service.
    #[must_use]
    pub fn new(store: Arc<S>, driver: Arc<D>, clock: Arc<C>) -> Self {
        Self {
            store,
            driver,
            clock,
            in_flight: InFlightOperations::default(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Sets the watchdog bound applied to each operation.
    #[must_use]
    pub const fn with_operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }

    /// Returns the watchdog bound applied to each operation.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Validates `config` and stores it as a new draft connector.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorLifecycleError::Validation`] when the configuration
    /// is invalid, or store errors.
    pub async fn create(&self, config: ConnectorConfig) -> ConnectorLifecycleResult<ConnectorRecord> {
        let definition = ConnectorDefinition::from_config(&config)?;
        let record = ConnectorRecord::new(definition, &*self.clock);
        let stored = self.store.create(&record).await?;
        info!(connector_id = %stored.id(), name = stored.definition().name(), "created connector");
        Ok(stored)
    }

    /// Returns a connector.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorLifecycleError::NotFound`] when no connector has the
    /// given identifier.
    pub async fn get(&self, id: ConnectorId) -> ConnectorLifecycleResult<ConnectorRecord> {
        self.store
            .get(id)
            .await?
            .ok_or(ConnectorLifecycleError::NotFound(id))
    }

    /// Returns every connector, oldest first.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn list(&self) -> ConnectorLifecycleResult<Vec<ConnectorRecord>> {
        Ok(self.store.list().await?)
    }

    /// Replaces a connector's configuration and resets it to `draft`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorLifecycleError::Validation`] when the configuration
    /// is invalid, [`ConnectorLifecycleError::NotFound`] when the connector
    /// does not exist, or store errors.
    pub async fn update(
        &self,
        id: ConnectorId,
        config: ConnectorConfig,
    ) -> ConnectorLifecycleResult<ConnectorRecord> {
        let definition = ConnectorDefinition::from_config(&config)?;
        let clock = Arc::clone(&self.clock);
        let updated = self
            .mutate(id, |record| {
                record.apply_edit(definition.clone(), &*clock)?;
                Ok(())
            })
            .await?;
        info!(connector_id = %id, revision = updated.revision(), "updated connector; back to draft");
        Ok(updated)
    }

    /// Deletes a connector from any status.
    ///
    /// An operation still running for the connector is cancelled; its result
    /// is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorLifecycleError::NotFound`] when the connector does
    /// not exist, or store errors.
    pub async fn delete(&self, id: ConnectorId) -> ConnectorLifecycleResult<ConnectorRecord> {
        let removed = self.store.delete(id).await?;
        if self.in_flight.cancel(id) {
            info!(connector_id = %id, "cancelled in-flight operation of deleted connector");
        }
        info!(connector_id = %id, "deleted connector");
        Ok(removed)
    }

    /// Returns the operation currently running for a connector.
    #[must_use]
    pub fn active_operation(&self, id: ConnectorId) -> Option<OperationKind> {
        self.in_flight.active_kind(id)
    }

    /// Starts a connectivity test.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorLifecycleError::OperationInProgress`] when another
    /// operation is running, [`ConnectorLifecycleError::Validation`] when the
    /// stored configuration is invalid, [`ConnectorLifecycleError::NotFound`],
    /// or store errors.
    pub async fn start_test(&self, id: ConnectorId) -> ConnectorLifecycleResult<OperationHandle> {
        self.start_operation(id, PendingOperation::Test).await
    }

    /// Runs a connectivity test to completion.
    ///
    /// # Errors
    ///
    /// See [`start_test`](Self::start_test) and [`OperationHandle::wait`].
    pub async fn test(&self, id: ConnectorId) -> ConnectorLifecycleResult<ConnectorRecord> {
        self.start_test(id).await?.wait().await
    }

    /// Starts publishing a connector to the platform.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorLifecycleError::AuthRequired`] when `session` has
    /// expired, plus the errors of [`start_test`](Self::start_test).
    pub async fn start_deploy(
        &self,
        id: ConnectorId,
        session: &Session,
    ) -> ConnectorLifecycleResult<OperationHandle> {
        self.start_operation(id, PendingOperation::Deploy(session.clone()))
            .await
    }

    /// Publishes a connector and waits for the result.
    ///
    /// # Errors
    ///
    /// See [`start_deploy`](Self::start_deploy) and [`OperationHandle::wait`].
    pub async fn deploy(
        &self,
        id: ConnectorId,
        session: &Session,
    ) -> ConnectorLifecycleResult<ConnectorRecord> {
        self.start_deploy(id, session).await?.wait().await
    }

    /// Starts removing a connector from the platform and deleting it locally.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorLifecycleError::AuthRequired`] when `session` has
    /// expired, [`ConnectorLifecycleError::OperationInProgress`],
    /// [`ConnectorLifecycleError::NotFound`], or store errors.
    pub async fn start_retire(
        &self,
        id: ConnectorId,
        session: &Session,
    ) -> ConnectorLifecycleResult<OperationHandle> {
        self.start_operation(id, PendingOperation::Retire(session.clone()))
            .await
    }

    /// Retires a connector and waits for the result.
    ///
    /// On success the removed record is returned; on failure the connector is
    /// kept in `error` with a diagnostic.
    ///
    /// # Errors
    ///
    /// See [`start_retire`](Self::start_retire) and [`OperationHandle::wait`].
    pub async fn retire(
        &self,
        id: ConnectorId,
        session: &Session,
    ) -> ConnectorLifecycleResult<ConnectorRecord> {
        self.start_retire(id, session).await?.wait().await
    }

    async fn start_operation(
        &self,
        id: ConnectorId,
        pending: PendingOperation,
    ) -> ConnectorLifecycleResult<OperationHandle> {
        let kind = pending.kind();
        if let Some(session) = pending.session()
            && !session.is_active_at(self.clock.utc())
        {
            return Err(ConnectorLifecycleError::AuthRequired(kind));
        }

        let guard = self
            .in_flight
            .try_acquire(id, kind)
            .map_err(|active| ConnectorLifecycleError::OperationInProgress { id, active })?;

        let lease = OperationLease::new(kind, self.lease_expiry());
        let owner = lease.owner();
        let clock = Arc::clone(&self.clock);
        let started = self
            .mutate(id, |record| {
                if kind.requires_valid_configuration() {
                    ConnectorValidator::check(&record.config())?;
                }
                if let Some(active) = record.active_lease(clock.utc()) {
                    return Err(ConnectorLifecycleError::OperationInProgress {
                        id,
                        active: active.kind(),
                    });
                }
                if record.reclaim_expired_lease(&*clock)? {
                    warn!(connector_id = %id, "reclaimed connector from an interrupted operation");
                }
                record.begin_operation(lease.clone(), &*clock)?;
                Ok(())
            })
            .await?;
        debug!(connector_id = %id, operation = %kind, %owner, "operation started");

        let cancel = guard.cancel_token().clone();
        let service = self.clone();
        let snapshot = started.clone();
        let task = tokio::spawn(async move {
            service
                .run_operation(snapshot, pending, owner, guard)
                .await
        });
        Ok(OperationHandle::new(started, kind, cancel, task))
    }

    fn lease_expiry(&self) -> DateTime<Utc> {
        let span = TimeDelta::from_std(self.operation_timeout.saturating_add(LEASE_GRACE))
            .unwrap_or(TimeDelta::MAX);
        self.clock
            .utc()
            .checked_add_signed(span)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    async fn run_operation(
        &self,
        record: ConnectorRecord,
        pending: PendingOperation,
        owner: Uuid,
        guard: OperationGuard,
    ) -> ConnectorLifecycleResult<ConnectorRecord> {
        let id = record.id();
        let kind = pending.kind();
        let cancel = guard.cancel_token().clone();

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => OperationOutcome::Failed(Diagnostic::new(
                FailureKind::Cancelled,
                format!("{kind} cancelled"),
                self.clock.utc(),
            )),
            bounded = tokio::time::timeout(
                self.operation_timeout,
                self.drive(&record, &pending, cancel.child_token()),
            ) => bounded.unwrap_or_else(|_| {
                cancel.cancel();
                warn!(
                    connector_id = %id,
                    operation = %kind,
                    timeout_ms = duration_millis(self.operation_timeout),
                    "operation timed out"
                );
                OperationOutcome::Failed(Diagnostic::new(
                    FailureKind::Timeout,
                    format!(
                        "{kind} did not finish within {}ms",
                        duration_millis(self.operation_timeout)
                    ),
                    self.clock.utc(),
                ))
            }),
        };

        let settled = self.settle(&record, kind, owner, outcome).await;
        drop(guard);
        settled
    }

    async fn drive(
        &self,
        record: &ConnectorRecord,
        pending: &PendingOperation,
        cancel: CancellationToken,
    ) -> OperationOutcome {
        let result = match pending {
            PendingOperation::Test => self.driver.test(record, cancel).await.map(|report| {
                if report.passed {
                    OperationOutcome::succeeded()
                } else {
                    OperationOutcome::Failed(Diagnostic::new(
                        FailureKind::Unreachable,
                        report
                            .detail
                            .unwrap_or_else(|| "connector did not respond".to_owned()),
                        self.clock.utc(),
                    ))
                }
            }),
            PendingOperation::Deploy(session) => self
                .driver
                .deploy(record, session, cancel)
                .await
                .map(|receipt| OperationOutcome::Succeeded {
                    published_id: receipt.published_id,
                }),
            PendingOperation::Retire(session) => self
                .driver
                .remove(record, session, cancel)
                .await
                .map(|()| OperationOutcome::succeeded()),
        };
        result.unwrap_or_else(|err| {
            warn!(connector_id = %record.id(), operation = %pending.kind(), error = %err, "driver failed");
            OperationOutcome::Failed(Diagnostic::new(err.kind(), err.diagnostic(), self.clock.utc()))
        })
    }

    /// Writes the outcome onto the live record while `owner` still holds it.
    async fn settle(
        &self,
        started: &ConnectorRecord,
        kind: OperationKind,
        owner: Uuid,
        outcome: OperationOutcome,
    ) -> ConnectorLifecycleResult<ConnectorRecord> {
        let id = started.id();
        let result = if kind == OperationKind::Retire && outcome.is_success() {
            self.settle_retirement(started, owner).await
        } else {
            let clock = Arc::clone(&self.clock);
            let published = (kind == OperationKind::Deploy && outcome.is_success())
                .then_some(started.generation());
            self.mutate(id, |record| {
                if !record.holds_lease(owner) {
                    return Err(ConnectorLifecycleError::LeaseLost(id));
                }
                record.complete_operation(outcome.clone(), &*clock)?;
                if let Some(generation) = published {
                    record.mark_published(generation);
                }
                Ok(())
            })
            .await
        };

        match &result {
            Ok(record) => info!(
                connector_id = %id,
                operation = %kind,
                status = %record.status(),
                diagnostic = ?record.diagnostic().map(Diagnostic::message),
                "operation resolved"
            ),
            Err(ConnectorLifecycleError::NotFound(_)) => debug!(
                connector_id = %id,
                operation = %kind,
                "connector deleted while operation was in flight; result discarded"
            ),
            Err(err) => warn!(connector_id = %id, operation = %kind, error = %err, "failed to record operation result"),
        }
        result
    }

    /// Deletes the retired record, unless an edit landed while the platform
    /// removal ran; then the record is kept with its publication cleared.
    async fn settle_retirement(
        &self,
        started: &ConnectorRecord,
        owner: Uuid,
    ) -> ConnectorLifecycleResult<ConnectorRecord> {
        let id = started.id();
        for attempt in 1..=MAX_MUTATION_ATTEMPTS {
            let mut live = self.get(id).await?;
            if !live.holds_lease(owner) {
                return Err(ConnectorLifecycleError::LeaseLost(id));
            }
            let written = if live.generation() == started.generation() {
                self.store.delete_unchanged(&live).await
            } else {
                info!(connector_id = %id, "connector edited during retire; keeping it unpublished");
                live.forget_publication(&*self.clock);
                self.store.update(&live).await
            };
            if let Some(record) = retry_on_conflict(id, attempt, written)? {
                return Ok(record);
            }
        }
        Err(ConnectorLifecycleError::Contended {
            id,
            attempts: MAX_MUTATION_ATTEMPTS,
        })
    }

    /// Re-reads the live record, applies `change`, and compare-and-swaps it.
    async fn mutate<F>(&self, id: ConnectorId, mut change: F) -> ConnectorLifecycleResult<ConnectorRecord>
    where
        F: FnMut(&mut ConnectorRecord) -> ConnectorLifecycleResult<()> + Send,
    {
        for attempt in 1..=MAX_MUTATION_ATTEMPTS {
            let mut record = self.get(id).await?;
            change(&mut record)?;
            let written = self.store.update(&record).await;
            if let Some(stored) = retry_on_conflict(id, attempt, written)? {
                return Ok(stored);
            }
        }
        Err(ConnectorLifecycleError::Contended {
            id,
            attempts: MAX_MUTATION_ATTEMPTS,
        })
    }
}

/// Passes a store write through, turning a revision conflict into `None` so
/// the caller retries against the live record.
fn retry_on_conflict(
    id: ConnectorId,
    attempt: u32,
    written: ConnectorStoreResult<ConnectorRecord>,
) -> ConnectorLifecycleResult<Option<ConnectorRecord>> {
    match written {
        Ok(stored) => Ok(Some(stored)),
        Err(ConnectorStoreError::RevisionConflict {
            expected, actual, ..
        }) => {
            debug!(
                connector_id = %id,
                attempt,
                expected,
                actual,
                "revision conflict; retrying with the live record"
            );
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}
