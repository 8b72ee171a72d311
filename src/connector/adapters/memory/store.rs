//! In-memory connector store.

use crate::connector::{
    domain::{ConnectorId, ConnectorRecord},
    ports::{ConnectorStore, ConnectorStoreError, ConnectorStoreResult, ensure_revision},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory connector store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnectorStore {
    records: Arc<RwLock<HashMap<ConnectorId, ConnectorRecord>>>,
}

impl InMemoryConnectorStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> ConnectorStoreError {
    ConnectorStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ConnectorStore for InMemoryConnectorStore {
    async fn create(&self, record: &ConnectorRecord) -> ConnectorStoreResult<ConnectorRecord> {
        let mut records = self.records.write().map_err(lock_error)?;
        if records.contains_key(&record.id()) {
            return Err(ConnectorStoreError::DuplicateConnector(record.id()));
        }
        let stored = record.clone().with_revision(1);
        records.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: ConnectorId) -> ConnectorStoreResult<Option<ConnectorRecord>> {
        let records = self.records.read().map_err(lock_error)?;
        Ok(records.get(&id).cloned())
    }

    async fn list(&self) -> ConnectorStoreResult<Vec<ConnectorRecord>> {
        let records = self.records.read().map_err(lock_error)?;
        let mut listed: Vec<ConnectorRecord> = records.values().cloned().collect();
        listed.sort_by_key(|record| (record.created_at(), record.id()));
        Ok(listed)
    }

    async fn update(&self, record: &ConnectorRecord) -> ConnectorStoreResult<ConnectorRecord> {
        let mut records = self.records.write().map_err(lock_error)?;
        let current = records
            .get(&record.id())
            .ok_or(ConnectorStoreError::NotFound(record.id()))?;
        ensure_revision(current, record)?;
        let stored = record.clone().with_revision(record.revision() + 1);
        records.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: ConnectorId) -> ConnectorStoreResult<ConnectorRecord> {
        let mut records = self.records.write().map_err(lock_error)?;
        records.remove(&id).ok_or(ConnectorStoreError::NotFound(id))
    }

    async fn delete_unchanged(
        &self,
        record: &ConnectorRecord,
    ) -> ConnectorStoreResult<ConnectorRecord> {
        let mut records = self.records.write().map_err(lock_error)?;
        let current = records
            .get(&record.id())
            .ok_or(ConnectorStoreError::NotFound(record.id()))?;
        ensure_revision(current, record)?;
        records
            .remove(&record.id())
            .ok_or(ConnectorStoreError::NotFound(record.id()))
    }
}
