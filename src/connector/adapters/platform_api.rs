//! In-memory platform API.

use crate::connector::{
    domain::{AccessToken, ConnectorDefinition},
    ports::{PlatformApi, PlatformApiError, PlatformResponse},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Platform API that keeps published connectors in memory.
///
/// Requests carrying an empty bearer token are rejected with status 401.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlatformApi {
    connectors: Arc<RwLock<HashMap<String, ConnectorDefinition>>>,
}

impl InMemoryPlatformApi {
    /// Creates an empty platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the definition published under `connector_id`.
    #[must_use]
    pub fn published(&self, connector_id: &str) -> Option<ConnectorDefinition> {
        self.connectors
            .read()
            .ok()
            .and_then(|connectors| connectors.get(connector_id).cloned())
    }

    /// Returns how many connectors are published.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connectors.read().map_or(0, |connectors| connectors.len())
    }

    /// Returns whether nothing is published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn authorize(token: &AccessToken) -> Result<(), PlatformApiError> {
    if token.secret().trim().is_empty() {
        return Err(PlatformApiError {
            status_code: 401,
            message: "missing bearer token".to_owned(),
        });
    }
    Ok(())
}

fn lock_failure() -> PlatformApiError {
    PlatformApiError {
        status_code: 500,
        message: "platform state unavailable".to_owned(),
    }
}

#[async_trait]
impl PlatformApi for InMemoryPlatformApi {
    async fn create_or_update_connector(
        &self,
        definition: &ConnectorDefinition,
        existing_id: Option<&str>,
        token: &AccessToken,
    ) -> Result<PlatformResponse, PlatformApiError> {
        authorize(token)?;
        let mut connectors = self.connectors.write().map_err(|_| lock_failure())?;
        let (status_code, connector_id) = match existing_id {
            Some(id) if connectors.contains_key(id) => (200, id.to_owned()),
            Some(id) => {
                return Err(PlatformApiError {
                    status_code: 404,
                    message: format!("connector {id} not found"),
                });
            }
            None => (201, Uuid::new_v4().to_string()),
        };
        connectors.insert(connector_id.clone(), definition.clone());
        Ok(PlatformResponse {
            status_code,
            connector_id: Some(connector_id),
        })
    }

    async fn delete_connector(
        &self,
        connector_id: &str,
        token: &AccessToken,
    ) -> Result<PlatformResponse, PlatformApiError> {
        authorize(token)?;
        let mut connectors = self.connectors.write().map_err(|_| lock_failure())?;
        if connectors.remove(connector_id).is_none() {
            return Err(PlatformApiError {
                status_code: 404,
                message: format!("connector {connector_id} not found"),
            });
        }
        Ok(PlatformResponse {
            status_code: 204,
            connector_id: Some(connector_id.to_owned()),
        })
    }
}
