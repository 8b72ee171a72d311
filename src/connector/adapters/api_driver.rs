//! Deployment driver backed by the platform API port.

use super::ConnectorProbe;
use crate::connector::{
    domain::{ConnectorRecord, Session},
    ports::{
        DeployReceipt, DeploymentDriver, DriverError, DriverResult, PlatformApi, PlatformApiError,
        TestReport,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Publishes connectors through a [`PlatformApi`] using the session token.
#[derive(Debug)]
pub struct ApiDeploymentDriver<P>
where
    P: PlatformApi,
{
    api: Arc<P>,
    probe: ConnectorProbe,
}

impl<P> Clone for ApiDeploymentDriver<P>
where
    P: PlatformApi,
{
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            probe: self.probe,
        }
    }
}

impl<P> ApiDeploymentDriver<P>
where
    P: PlatformApi,
{
    /// Creates a driver over `api`.
    #[must_use]
    pub fn new(api: Arc<P>) -> Self {
        Self {
            api,
            probe: ConnectorProbe::default(),
        }
    }

    /// Uses `probe` for connectivity tests.
    #[must_use]
    pub const fn with_probe(mut self, probe: ConnectorProbe) -> Self {
        self.probe = probe;
        self
    }
}

fn platform_error(err: PlatformApiError) -> DriverError {
    DriverError::Platform {
        status_code: Some(err.status_code),
        message: err.message,
    }
}

#[async_trait]
impl<P> DeploymentDriver for ApiDeploymentDriver<P>
where
    P: PlatformApi + 'static,
{
    async fn deploy(
        &self,
        record: &ConnectorRecord,
        session: &Session,
        cancel: CancellationToken,
    ) -> DriverResult<DeployReceipt> {
        let request = self.api.create_or_update_connector(
            record.definition(),
            record.published_id(),
            session.token(),
        );
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DriverError::Cancelled),
            response = request => response.map_err(platform_error)?,
        };
        info!(
            connector_id = %record.id(),
            status_code = response.status_code,
            "platform API accepted connector"
        );
        Ok(DeployReceipt {
            published_id: response
                .connector_id
                .or_else(|| record.published_id().map(str::to_owned)),
            output: format!("status {}", response.status_code),
        })
    }

    async fn test(
        &self,
        record: &ConnectorRecord,
        cancel: CancellationToken,
    ) -> DriverResult<TestReport> {
        self.probe.probe(record.definition(), &cancel).await
    }

    async fn remove(
        &self,
        record: &ConnectorRecord,
        session: &Session,
        cancel: CancellationToken,
    ) -> DriverResult<()> {
        let Some(published_id) = record.published_id() else {
            return Ok(());
        };
        let request = self.api.delete_connector(published_id, session.token());
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DriverError::Cancelled),
            response = request => response.map(|_| ()).map_err(platform_error),
        }
    }
}
