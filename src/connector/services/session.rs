//! Explicit authentication producing session values.

use crate::connector::{
    domain::Session,
    ports::{AuthError, IdentityProvider},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

/// Establishes sessions through an [`IdentityProvider`].
pub struct SessionService<P, C>
where
    P: IdentityProvider,
    C: Clock + Send + Sync,
{
    provider: Arc<P>,
    clock: Arc<C>,
}

impl<P, C> Clone for SessionService<P, C>
where
    P: IdentityProvider,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<P, C> SessionService<P, C>
where
    P: IdentityProvider,
    C: Clock + Send + Sync,
{
    /// Creates a session service.
    #[must_use]
    pub const fn new(provider: Arc<P>, clock: Arc<C>) -> Self {
        Self { provider, clock }
    }

    /// Authenticates for `scopes`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoScopes`] when `scopes` is empty,
    /// [`AuthError::Expired`] when the provider hands back a token that is
    /// already expired, or the provider's own error.
    pub async fn authenticate(&self, scopes: &[String]) -> Result<Session, AuthError> {
        if scopes.is_empty() {
            return Err(AuthError::NoScopes);
        }
        let token = self.provider.acquire_token(scopes).await?;
        let issued_at = self.clock.utc();
        if token.expires_at() <= issued_at {
            return Err(AuthError::Expired);
        }
        info!(scopes = ?scopes, expires_at = %token.expires_at(), "session established");
        Ok(Session::new(token, scopes.to_vec(), issued_at))
    }
}
