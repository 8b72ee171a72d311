//! Operation kinds, outcomes and leases.

use super::Diagnostic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Asynchronous operation driven against the deployment platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Connectivity or health check.
    Test,
    /// Create-or-update publication.
    Deploy,
    /// Removal from the platform followed by local deletion.
    Retire,
}

impl OperationKind {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Deploy => "deploy",
            Self::Retire => "retire",
        }
    }

    /// Returns whether the configuration must be valid before the operation
    /// may start.
    #[must_use]
    pub const fn requires_valid_configuration(self) -> bool {
        matches!(self, Self::Test | Self::Deploy)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// How an operation resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The operation succeeded.
    Succeeded {
        /// Platform identifier returned by a deploy, if any.
        published_id: Option<String>,
    },
    /// The operation failed.
    Failed(Diagnostic),
}

impl OperationOutcome {
    /// Success without a platform identifier.
    #[must_use]
    pub const fn succeeded() -> Self {
        Self::Succeeded { published_id: None }
    }

    /// Returns whether the outcome is a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Persisted claim on a connector by one running operation.
///
/// Leases are shared through the store, so separate processes see each
/// other's operations. A lease past `expires_at` belongs to an operation that
/// can no longer be running and may be reclaimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLease {
    owner: Uuid,
    kind: OperationKind,
    expires_at: DateTime<Utc>,
}

impl OperationLease {
    /// Creates a lease with a fresh owner token.
    #[must_use]
    pub fn new(kind: OperationKind, expires_at: DateTime<Utc>) -> Self {
        Self {
            owner: Uuid::new_v4(),
            kind,
            expires_at,
        }
    }

    /// Returns the owner token.
    #[must_use]
    pub const fn owner(&self) -> Uuid {
        self.owner
    }

    /// Returns the leased operation kind.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Returns when the lease lapses.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns whether the lease has lapsed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
