//! JSON file connector store.

use super::blocking::run_blocking;
use crate::connector::{
    domain::{ConnectorId, ConnectorRecord},
    ports::{ConnectorStore, ConnectorStoreError, ConnectorStoreResult, ensure_revision},
};
use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs::OpenOptions;
use cap_std::fs_utf8::Dir;
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{debug, info};

/// Namespace used when none is configured.
pub const DEFAULT_STORE_NAMESPACE: &str = "agent-mcp-inspector-connectors";

type Records = HashMap<ConnectorId, ConnectorRecord>;

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    namespace: String,
    connectors: Vec<ConnectorRecord>,
}

/// Connector store persisted as one JSON document per namespace.
///
/// The document lives at `<namespace>.json` inside the store directory and is
/// replaced atomically on each mutation. Mutations hold an exclusive lock on
/// `.<namespace>.lock` and re-read the document under it, so several stores
/// (in this process or others) can share one directory without losing
/// writes. Reads always come from disk.
#[derive(Debug, Clone)]
pub struct FileConnectorStore {
    inner: Arc<FileStoreInner>,
}

#[derive(Debug)]
struct FileStoreInner {
    dir: Dir,
    namespace: String,
}

impl FileConnectorStore {
    /// Opens (creating if needed) the store directory and loads `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorStoreError::Persistence`] when the directory cannot
    /// be opened or the namespace is not a plain file stem, and
    /// [`ConnectorStoreError::InvalidPersistedData`] when the existing
    /// document cannot be decoded.
    pub fn open(directory: &Utf8Path, namespace: &str) -> ConnectorStoreResult<Self> {
        validate_namespace(namespace)?;
        Dir::create_ambient_dir_all(directory, ambient_authority())
            .map_err(ConnectorStoreError::persistence)?;
        let dir = Dir::open_ambient_dir(directory, ambient_authority())
            .map_err(ConnectorStoreError::persistence)?;
        let inner = FileStoreInner {
            dir,
            namespace: namespace.to_owned(),
        };
        let records = inner.read()?;
        info!(
            directory = %directory,
            namespace,
            connectors = records.len(),
            "opened connector store"
        );
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    async fn read(&self) -> ConnectorStoreResult<Records> {
        let inner = Arc::clone(&self.inner);
        run_blocking(move || inner.read()).await
    }

    async fn transact<F, T>(&self, change: F) -> ConnectorStoreResult<T>
    where
        F: FnOnce(&mut Records) -> ConnectorStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        run_blocking(move || inner.transact(change)).await
    }
}

impl FileStoreInner {
    fn read(&self) -> ConnectorStoreResult<Records> {
        load_document(&self.dir, &self.namespace)
    }

    /// Applies `change` to the on-disk document under the namespace lock and
    /// writes the result. Nothing is written when `change` fails.
    fn transact<T>(
        &self,
        change: impl FnOnce(&mut Records) -> ConnectorStoreResult<T>,
    ) -> ConnectorStoreResult<T> {
        let mut options = OpenOptions::new();
        options.create(true).write(true);
        let lock_file = self
            .dir
            .open_with(lock_name(&self.namespace), &options)
            .map_err(ConnectorStoreError::persistence)?;
        let mut lock = RwLock::new(lock_file.into_std());
        let _held = lock.write().map_err(ConnectorStoreError::persistence)?;

        let mut records = self.read()?;
        let value = change(&mut records)?;
        self.persist(&records)?;
        Ok(value)
    }

    fn persist(&self, records: &Records) -> ConnectorStoreResult<()> {
        let mut connectors: Vec<ConnectorRecord> = records.values().cloned().collect();
        connectors.sort_by_key(|record| (record.created_at(), record.id()));
        let document = StoreDocument {
            namespace: self.namespace.clone(),
            connectors,
        };
        let contents =
            serde_json::to_vec_pretty(&document).map_err(ConnectorStoreError::persistence)?;

        let file_name = document_name(&self.namespace);
        let temp_name = format!(".{file_name}.tmp");
        self.dir
            .write(&temp_name, contents)
            .map_err(ConnectorStoreError::persistence)?;
        self.dir
            .rename(&temp_name, &self.dir, &file_name)
            .map_err(ConnectorStoreError::persistence)?;
        debug!(namespace = %self.namespace, connectors = records.len(), "persisted connector store");
        Ok(())
    }
}

fn document_name(namespace: &str) -> String {
    format!("{namespace}.json")
}

fn lock_name(namespace: &str) -> String {
    format!(".{namespace}.lock")
}

fn validate_namespace(namespace: &str) -> ConnectorStoreResult<()> {
    let trimmed = namespace.trim();
    let invalid = trimmed.is_empty()
        || trimmed != namespace
        || namespace.contains(['/', '\\'])
        || namespace.starts_with('.');
    if invalid {
        return Err(ConnectorStoreError::persistence(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("invalid store namespace '{namespace}'"),
        )));
    }
    Ok(())
}

fn load_document(dir: &Dir, namespace: &str) -> ConnectorStoreResult<Records> {
    let contents = match dir.read_to_string(document_name(namespace)) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(err) => return Err(ConnectorStoreError::persistence(err)),
    };
    let document: StoreDocument =
        serde_json::from_str(&contents).map_err(ConnectorStoreError::invalid_persisted_data)?;
    if document.namespace != namespace {
        return Err(ConnectorStoreError::invalid_persisted_data(
            std::io::Error::other(format!(
                "document namespace '{}' does not match '{namespace}'",
                document.namespace
            )),
        ));
    }

    let mut records = HashMap::with_capacity(document.connectors.len());
    for record in document.connectors {
        let id = record.id();
        if records.insert(id, record).is_some() {
            return Err(ConnectorStoreError::invalid_persisted_data(
                std::io::Error::other(format!("duplicate connector {id} in store document")),
            ));
        }
    }
    Ok(records)
}

fn stored_revision(records: &Records, record: &ConnectorRecord) -> ConnectorStoreResult<()> {
    let stored = records
        .get(&record.id())
        .ok_or(ConnectorStoreError::NotFound(record.id()))?;
    ensure_revision(stored, record)
}

#[async_trait]
impl ConnectorStore for FileConnectorStore {
    async fn create(&self, record: &ConnectorRecord) -> ConnectorStoreResult<ConnectorRecord> {
        let stored = record.clone().with_revision(1);
        self.transact(move |records| {
            if records.contains_key(&stored.id()) {
                return Err(ConnectorStoreError::DuplicateConnector(stored.id()));
            }
            records.insert(stored.id(), stored.clone());
            Ok(stored)
        })
        .await
    }

    async fn get(&self, id: ConnectorId) -> ConnectorStoreResult<Option<ConnectorRecord>> {
        Ok(self.read().await?.remove(&id))
    }

    async fn list(&self) -> ConnectorStoreResult<Vec<ConnectorRecord>> {
        let mut listed: Vec<ConnectorRecord> = self.read().await?.into_values().collect();
        listed.sort_by_key(|record| (record.created_at(), record.id()));
        Ok(listed)
    }

    async fn update(&self, record: &ConnectorRecord) -> ConnectorStoreResult<ConnectorRecord> {
        let expected = record.clone();
        self.transact(move |records| {
            stored_revision(records, &expected)?;
            let next = expected.revision() + 1;
            let stored = expected.with_revision(next);
            records.insert(stored.id(), stored.clone());
            Ok(stored)
        })
        .await
    }

    async fn delete(&self, id: ConnectorId) -> ConnectorStoreResult<ConnectorRecord> {
        self.transact(move |records| records.remove(&id).ok_or(ConnectorStoreError::NotFound(id)))
            .await
    }

    async fn delete_unchanged(
        &self,
        record: &ConnectorRecord,
    ) -> ConnectorStoreResult<ConnectorRecord> {
        let expected = record.clone();
        self.transact(move |records| {
            stored_revision(records, &expected)?;
            records
                .remove(&expected.id())
                .ok_or(ConnectorStoreError::NotFound(expected.id()))
        })
        .await
    }
}
