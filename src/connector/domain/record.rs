//! Connector record aggregate root.

use super::{
    ConnectorConfig, ConnectorDefinition, ConnectorDomainError, ConnectorId, ConnectorStatus,
    Diagnostic, FailureKind, OperationLease, OperationOutcome,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted connector with its lifecycle state.
///
/// Status changes only through [`apply_edit`](Self::apply_edit),
/// [`begin_operation`](Self::begin_operation) and
/// [`complete_operation`](Self::complete_operation). `revision` is owned by
/// the store and used for compare-and-swap updates.
///
/// `generation` counts edits. A deploy stamps the generation it published, so
/// an edit that lands while the deploy runs stays visible through
/// [`has_unpublished_changes`](Self::has_unpublished_changes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorRecord {
    id: ConnectorId,
    #[serde(flatten)]
    definition: ConnectorDefinition,
    status: ConnectorStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    diagnostic: Option<Diagnostic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    published_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lease: Option<OperationLease>,
    #[serde(default)]
    generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    published_generation: Option<u64>,
    #[serde(default)]
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConnectorRecord {
    /// Creates a new draft record.
    #[must_use]
    pub fn new(definition: ConnectorDefinition, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: ConnectorId::new(),
            definition,
            status: ConnectorStatus::Draft,
            diagnostic: None,
            published_id: None,
            lease: None,
            generation: 0,
            published_generation: None,
            revision: 0,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectorId {
        self.id
    }

    /// Returns the validated definition.
    #[must_use]
    pub const fn definition(&self) -> &ConnectorDefinition {
        &self.definition
    }

    /// Returns the definition in raw configuration form.
    #[must_use]
    pub fn config(&self) -> ConnectorConfig {
        self.definition.to_config()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ConnectorStatus {
        self.status
    }

    /// Returns the diagnostic from the last failed operation.
    #[must_use]
    pub const fn diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostic.as_ref()
    }

    /// Returns the platform identifier from the last successful deploy.
    #[must_use]
    pub fn published_id(&self) -> Option<&str> {
        self.published_id.as_deref()
    }

    /// Returns the lease of the running operation, expired or not.
    #[must_use]
    pub const fn lease(&self) -> Option<&OperationLease> {
        self.lease.as_ref()
    }

    /// Returns the lease when it is still in force at `now`.
    #[must_use]
    pub fn active_lease(&self, now: DateTime<Utc>) -> Option<&OperationLease> {
        self.lease.as_ref().filter(|lease| !lease.is_expired_at(now))
    }

    /// Returns whether the lease was issued to `owner`.
    #[must_use]
    pub fn holds_lease(&self, owner: Uuid) -> bool {
        self.lease.as_ref().is_some_and(|lease| lease.owner() == owner)
    }

    /// Returns the number of edits applied since creation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the generation last published by a deploy.
    #[must_use]
    pub const fn published_generation(&self) -> Option<u64> {
        self.published_generation
    }

    /// Returns whether the platform holds an older definition than this one.
    #[must_use]
    pub fn has_unpublished_changes(&self) -> bool {
        self.published_generation
            .is_some_and(|published| published != self.generation)
    }

    /// Returns the store revision.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns a copy stamped with `revision`.
    #[must_use]
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Replaces the definition and resets the record to `draft`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorDomainError::InvalidStatusTransition`] when the
    /// transition is not allowed.
    pub fn apply_edit(
        &mut self,
        definition: ConnectorDefinition,
        clock: &impl Clock,
    ) -> Result<(), ConnectorDomainError> {
        self.transition_to(ConnectorStatus::Draft)?;
        self.definition = definition;
        self.diagnostic = None;
        self.generation = self.generation.saturating_add(1);
        self.touch(clock);
        Ok(())
    }

    /// Moves the record to `testing` under `lease` ahead of an operation.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorDomainError::Leased`] while another lease is held,
    /// or [`ConnectorDomainError::InvalidStatusTransition`] when the record is
    /// already `testing`.
    pub fn begin_operation(
        &mut self,
        lease: OperationLease,
        clock: &impl Clock,
    ) -> Result<(), ConnectorDomainError> {
        if let Some(held) = &self.lease {
            return Err(ConnectorDomainError::Leased(held.kind()));
        }
        self.transition_to(ConnectorStatus::Testing)?;
        self.lease = Some(lease);
        self.touch(clock);
        Ok(())
    }

    /// Releases a lapsed lease and resolves a stranded `testing` status.
    ///
    /// A record left in `testing` without any lease is treated the same way.
    /// Returns whether anything was reclaimed.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorDomainError::InvalidStatusTransition`] when the
    /// stranded status cannot resolve to `error`.
    pub fn reclaim_expired_lease(
        &mut self,
        clock: &impl Clock,
    ) -> Result<bool, ConnectorDomainError> {
        let now = clock.utc();
        let stranded = self
            .lease
            .as_ref()
            .map_or(self.status == ConnectorStatus::Testing, |lease| {
                lease.is_expired_at(now)
            });
        if !stranded {
            return Ok(false);
        }
        self.lease = None;
        if self.status == ConnectorStatus::Testing {
            let interrupted = Diagnostic::new(
                FailureKind::Cancelled,
                "previous operation was interrupted",
                now,
            );
            self.complete_operation(OperationOutcome::Failed(interrupted), clock)?;
        } else {
            self.touch(clock);
        }
        Ok(true)
    }

    /// Resolves an operation, writing status, diagnostic and platform id, and
    /// releases the lease.
    ///
    /// The definition is left untouched so edits made while the operation ran
    /// survive.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorDomainError::InvalidStatusTransition`] when the
    /// record is not awaiting a result.
    pub fn complete_operation(
        &mut self,
        outcome: OperationOutcome,
        clock: &impl Clock,
    ) -> Result<(), ConnectorDomainError> {
        match outcome {
            OperationOutcome::Succeeded { published_id } => {
                self.transition_to(ConnectorStatus::Deployed)?;
                self.diagnostic = None;
                if published_id.is_some() {
                    self.published_id = published_id;
                }
            }
            OperationOutcome::Failed(diagnostic) => {
                self.transition_to(ConnectorStatus::Error)?;
                self.diagnostic = Some(diagnostic);
            }
        }
        self.lease = None;
        self.touch(clock);
        Ok(())
    }

    /// Records that the definition at `generation` is what the platform holds.
    pub const fn mark_published(&mut self, generation: u64) {
        self.published_generation = Some(generation);
    }

    /// Forgets the platform connector after it was removed, keeping the
    /// record and its status.
    ///
    /// Used when a retire succeeds on the platform but the record was edited
    /// while it ran.
    pub fn forget_publication(&mut self, clock: &impl Clock) {
        self.published_id = None;
        self.published_generation = None;
        self.lease = None;
        self.touch(clock);
    }

    fn transition_to(&mut self, target: ConnectorStatus) -> Result<(), ConnectorDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(ConnectorDomainError::InvalidStatusTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc().max(self.created_at);
    }
}
