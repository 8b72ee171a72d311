//! Shared fixtures for in-memory lifecycle tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use mockable::DefaultClock;
use portico::connector::{
    adapters::{ScriptedDeploymentDriver, memory::InMemoryConnectorStore},
    domain::{AccessToken, ConnectorConfig, ConnectorId, Session, TransportKind},
    services::ConnectorLifecycleService,
};
use rstest::fixture;

/// Service type used across in-memory tests.
pub type TestService =
    ConnectorLifecycleService<InMemoryConnectorStore, ScriptedDeploymentDriver, DefaultClock>;

/// Service plus direct handles on its collaborators.
pub struct Harness {
    pub service: TestService,
    pub store: Arc<InMemoryConnectorStore>,
    pub driver: Arc<ScriptedDeploymentDriver>,
}

/// Provides a service over an empty store and a scripted driver.
#[fixture]
pub fn harness() -> Harness {
    let store = Arc::new(InMemoryConnectorStore::new());
    let driver = Arc::new(ScriptedDeploymentDriver::new());
    let service = ConnectorLifecycleService::new(
        Arc::clone(&store),
        Arc::clone(&driver),
        Arc::new(DefaultClock),
    );
    Harness {
        service,
        store,
        driver,
    }
}

/// Provides a session valid for the next hour.
#[fixture]
pub fn session() -> Session {
    let now = Utc::now();
    Session::new(
        AccessToken::new("integration-token", now + TimeDelta::hours(1)),
        vec!["https://service.powerapps.com/user_impersonation".to_owned()],
        now,
    )
}

/// The `stdio` connector used throughout the lifecycle scenarios.
pub fn stdio_config(description: &str) -> ConnectorConfig {
    ConnectorConfig::new("x", "X", description, TransportKind::Stdio)
        .with_command("node", ["server.js"])
}

/// An `sse` connector named after `name`.
pub fn sse_config(name: &str) -> ConnectorConfig {
    ConnectorConfig::new(name, name.to_uppercase(), "Server-sent events", TransportKind::Sse)
        .with_url(format!("https://{name}.example.com/sse"))
}

/// Polls until no operation is registered for `id`.
///
/// # Errors
///
/// Returns an error when the operation is still registered after two seconds.
pub async fn wait_until_idle(service: &TestService, id: ConnectorId) -> Result<(), eyre::Report> {
    tokio::time::timeout(Duration::from_secs(2), async {
        while service.active_operation(id).is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .map_err(|_| eyre::eyre!("operation for {id} never released its guard"))
}
