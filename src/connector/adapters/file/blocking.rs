//! Offloads synchronous filesystem work from the async executor.

use crate::connector::ports::{ConnectorStoreError, ConnectorStoreResult};

/// Runs a blocking store operation on the blocking thread pool.
///
/// Join failures surface as [`ConnectorStoreError::Persistence`].
pub(super) async fn run_blocking<F, T>(operation: F) -> ConnectorStoreResult<T>
where
    F: FnOnce() -> ConnectorStoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(ConnectorStoreError::persistence)?
}
