//! In-memory adapters for connector ports.

mod store;

pub use store::InMemoryConnectorStore;
