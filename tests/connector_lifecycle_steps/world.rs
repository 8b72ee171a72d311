//! Shared world state for connector lifecycle BDD scenarios.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use mockable::DefaultClock;
use portico::connector::{
    adapters::{ScriptedDeploymentDriver, memory::InMemoryConnectorStore},
    domain::{AccessToken, ConnectorConfig, ConnectorRecord, Session},
    services::{ConnectorLifecycleError, ConnectorLifecycleService, OperationHandle},
};
use rstest::fixture;

/// Service type used by the BDD world.
pub type TestConnectorService =
    ConnectorLifecycleService<InMemoryConnectorStore, ScriptedDeploymentDriver, DefaultClock>;

/// Scenario world for connector lifecycle behaviour tests.
pub struct ConnectorLifecycleWorld {
    pub service: TestConnectorService,
    pub driver: Arc<ScriptedDeploymentDriver>,
    pub session: Session,
    pub pending_config: Option<ConnectorConfig>,
    pub record: Option<ConnectorRecord>,
    pub running: Option<OperationHandle>,
    pub last_result: Option<Result<ConnectorRecord, ConnectorLifecycleError>>,
}

impl ConnectorLifecycleWorld {
    /// Creates a world over an empty store and an idle scripted driver.
    #[must_use]
    pub fn new() -> Self {
        let driver = Arc::new(ScriptedDeploymentDriver::new());
        let service = ConnectorLifecycleService::new(
            Arc::new(InMemoryConnectorStore::new()),
            Arc::clone(&driver),
            Arc::new(DefaultClock),
        );
        let now = Utc::now();
        let session = Session::new(
            AccessToken::new("scenario-token", now + TimeDelta::hours(1)),
            vec!["https://service.powerapps.com/user_impersonation".to_owned()],
            now,
        );

        Self {
            service,
            driver,
            session,
            pending_config: None,
            record: None,
            running: None,
            last_result: None,
        }
    }

    /// Returns the connector under test.
    ///
    /// # Errors
    ///
    /// Returns an error when no connector has been created yet.
    pub fn record(&self) -> Result<&ConnectorRecord, eyre::Report> {
        self.record
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing connector in scenario world"))
    }
}

impl Default for ConnectorLifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ConnectorLifecycleWorld {
    ConnectorLifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
