//! Adapter implementations for connector ports.

pub mod file;
pub mod memory;

mod api_driver;
mod cli_driver;
mod identity;
mod platform_api;
mod probe;
mod scripted;

pub use api_driver::ApiDeploymentDriver;
pub use cli_driver::CliDeploymentDriver;
pub use identity::{CliIdentityProvider, DEFAULT_SESSION_TTL};
pub use platform_api::InMemoryPlatformApi;
pub use probe::{ConnectorProbe, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HANDSHAKE_TIMEOUT};
pub use scripted::{ScriptedCall, ScriptedDeploymentDriver, ScriptedOutcome};
