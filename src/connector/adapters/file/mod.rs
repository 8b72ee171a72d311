//! File-backed adapters for connector ports.

mod blocking;
mod store;

pub use store::{DEFAULT_STORE_NAMESPACE, FileConnectorStore};
