//! Identity provider backed by the platform tool's authentication profiles.

use crate::connector::{
    domain::AccessToken,
    ports::{AuthError, IdentityProvider},
};
use crate::platform::PlatformCli;
use crate::process::ProcessError;
use async_trait::async_trait;
use chrono::TimeDelta;
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Default lifetime of a profile-backed session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Authenticates by running `auth create` and issues a token naming the
/// resulting profile.
///
/// The platform tool keeps the real credentials in its own profile store; the
/// issued token only records which profile later commands run under.
#[derive(Debug)]
pub struct CliIdentityProvider<C>
where
    C: Clock + Send + Sync,
{
    cli: PlatformCli,
    clock: Arc<C>,
    session_ttl: Duration,
}

impl<C> CliIdentityProvider<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a provider over `cli`.
    #[must_use]
    pub const fn new(cli: PlatformCli, clock: Arc<C>) -> Self {
        Self {
            cli,
            clock,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    /// Sets the lifetime of issued tokens.
    #[must_use]
    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }
}

fn map_login_error(err: ProcessError) -> AuthError {
    match err {
        ProcessError::CommandFailed { output, .. } => {
            let reason = output.stderr().trim();
            if reason.is_empty() {
                AuthError::Rejected("platform tool refused to create a profile".to_owned())
            } else {
                AuthError::Rejected(reason.to_owned())
            }
        }
        other => AuthError::unavailable(other),
    }
}

#[async_trait]
impl<C> IdentityProvider for CliIdentityProvider<C>
where
    C: Clock + Send + Sync,
{
    async fn acquire_token(&self, scopes: &[String]) -> Result<AccessToken, AuthError> {
        if scopes.is_empty() {
            return Err(AuthError::NoScopes);
        }
        self.cli
            .login(&CancellationToken::new())
            .await
            .map_err(map_login_error)?;

        let issued_at = self.clock.utc();
        let expires_at = TimeDelta::from_std(self.session_ttl)
            .ok()
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| AuthError::Rejected("session lifetime out of range".to_owned()))?;
        let profile = self.cli.environment_url().unwrap_or("default");
        info!(profile, scopes = ?scopes, %expires_at, "authenticated platform profile");
        Ok(AccessToken::new(format!("cli-profile:{profile}"), expires_at))
    }
}
