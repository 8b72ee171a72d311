//! Port contracts for connector lifecycle orchestration.

mod driver;
mod identity;
mod platform;
mod store;

pub use driver::{DeployReceipt, DeploymentDriver, DriverError, DriverResult, TestReport};
pub use identity::{AuthError, IdentityProvider};
pub use platform::{PlatformApi, PlatformApiError, PlatformResponse};
pub use store::{ConnectorStore, ConnectorStoreError, ConnectorStoreResult, ensure_revision};
