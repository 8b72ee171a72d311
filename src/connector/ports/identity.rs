//! Identity provider port.

use crate::connector::domain::AccessToken;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Issues access tokens for the deployment platform.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Acquires a token covering `scopes`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the provider refuses or cannot be reached.
    async fn acquire_token(&self, scopes: &[String]) -> Result<AccessToken, AuthError>;
}

/// Authentication failures.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No scopes were requested.
    #[error("at least one scope is required")]
    NoScopes,

    /// The provider refused to issue a token.
    #[error("authentication rejected: {0}")]
    Rejected(String),

    /// The provider issued a token that has already expired.
    #[error("identity provider returned an expired token")]
    Expired,

    /// The provider could not be reached.
    #[error("identity provider unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl AuthError {
    /// Wraps a provider transport failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
