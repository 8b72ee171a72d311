//! Authenticated session values.

use chrono::{DateTime, Utc};
use std::fmt;

/// Bearer token issued by an identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Creates a token valid until `expires_at`.
    #[must_use]
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// Returns the bearer secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns the expiry time.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Result of an explicit authentication, passed to deploy and retire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: AccessToken,
    scopes: Vec<String>,
    issued_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session from a token issued at `issued_at`.
    #[must_use]
    pub const fn new(token: AccessToken, scopes: Vec<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            token,
            scopes,
            issued_at,
        }
    }

    /// Returns the access token.
    #[must_use]
    pub const fn token(&self) -> &AccessToken {
        &self.token
    }

    /// Returns the granted scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Returns when the session was established.
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Returns when the session stops being usable.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.token.expires_at
    }

    /// Returns whether the session is usable at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.token.expires_at
    }
}
