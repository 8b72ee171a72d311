//! Remote platform API port.

use crate::connector::domain::{AccessToken, ConnectorDefinition};
use async_trait::async_trait;
use thiserror::Error;

/// Successful platform response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformResponse {
    /// HTTP-style status code.
    pub status_code: u16,
    /// Identifier of the affected platform connector, when reported.
    pub connector_id: Option<String>,
}

/// Platform API failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("platform API returned {status_code}: {message}")]
pub struct PlatformApiError {
    /// HTTP-style status code.
    pub status_code: u16,
    /// Platform message.
    pub message: String,
}

/// Connector management endpoints of the deployment platform.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Creates a connector, or updates `existing_id` in place.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformApiError`] for any non-success response.
    async fn create_or_update_connector(
        &self,
        definition: &ConnectorDefinition,
        existing_id: Option<&str>,
        token: &AccessToken,
    ) -> Result<PlatformResponse, PlatformApiError>;

    /// Deletes a platform connector.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformApiError`] for any non-success response.
    async fn delete_connector(
        &self,
        connector_id: &str,
        token: &AccessToken,
    ) -> Result<PlatformResponse, PlatformApiError>;
}
