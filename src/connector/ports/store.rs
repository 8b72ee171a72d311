//! Store port for connector record persistence.

use crate::connector::domain::{ConnectorId, ConnectorRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for connector store operations.
pub type ConnectorStoreResult<T> = Result<T, ConnectorStoreError>;

/// Keyed persistence contract for connector records.
///
/// Updates are whole-record replacements guarded by the record's revision.
/// Implementations never expose a partially written record.
#[async_trait]
pub trait ConnectorStore: Send + Sync {
    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorStoreError::DuplicateConnector`] when the identifier
    /// already exists.
    async fn create(&self, record: &ConnectorRecord) -> ConnectorStoreResult<ConnectorRecord>;

    /// Finds a record by identifier.
    async fn get(&self, id: ConnectorId) -> ConnectorStoreResult<Option<ConnectorRecord>>;

    /// Returns every record, oldest first.
    async fn list(&self) -> ConnectorStoreResult<Vec<ConnectorRecord>>;

    /// Replaces a record when its revision still matches the stored one.
    ///
    /// Returns the stored record carrying the next revision.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorStoreError::NotFound`] when the record does not
    /// exist or [`ConnectorStoreError::RevisionConflict`] when it was changed
    /// since `record` was read.
    async fn update(&self, record: &ConnectorRecord) -> ConnectorStoreResult<ConnectorRecord>;

    /// Removes a record and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorStoreError::NotFound`] when the record does not
    /// exist.
    async fn delete(&self, id: ConnectorId) -> ConnectorStoreResult<ConnectorRecord>;

    /// Removes a record when its revision still matches the stored one.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorStoreError::NotFound`] when the record does not
    /// exist or [`ConnectorStoreError::RevisionConflict`] when it was changed
    /// since `record` was read.
    async fn delete_unchanged(
        &self,
        record: &ConnectorRecord,
    ) -> ConnectorStoreResult<ConnectorRecord>;
}

/// Checks that `stored` still carries the revision of `expected`.
///
/// # Errors
///
/// Returns [`ConnectorStoreError::RevisionConflict`] on mismatch.
pub const fn ensure_revision(
    stored: &ConnectorRecord,
    expected: &ConnectorRecord,
) -> ConnectorStoreResult<()> {
    if stored.revision() == expected.revision() {
        Ok(())
    } else {
        Err(ConnectorStoreError::RevisionConflict {
            id: expected.id(),
            expected: expected.revision(),
            actual: stored.revision(),
        })
    }
}

/// Errors returned by connector store implementations.
#[derive(Debug, Clone, Error)]
pub enum ConnectorStoreError {
    /// A record with the same identifier already exists.
    #[error("duplicate connector identifier: {0}")]
    DuplicateConnector(ConnectorId),

    /// The record was not found.
    #[error("connector not found: {0}")]
    NotFound(ConnectorId),

    /// The record changed since it was read.
    #[error("connector {id} changed concurrently: expected revision {expected}, found {actual}")]
    RevisionConflict {
        /// Connector identifier.
        id: ConnectorId,
        /// Revision the caller read.
        expected: u64,
        /// Revision currently stored.
        actual: u64,
    },

    /// Persisted data could not be decoded into domain types.
    #[error("invalid persisted connector data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ConnectorStoreError {
    /// Wraps persisted-data decoding failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
