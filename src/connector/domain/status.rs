//! Connector lifecycle status.

use super::ParseConnectorStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse deployment-readiness state of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorStatus {
    /// Created or edited; needs a test or deploy.
    Draft,
    /// A test, deploy, or retire operation is in flight.
    Testing,
    /// Last operation succeeded.
    Deployed,
    /// Last operation failed; see the record diagnostic.
    Error,
}

impl ConnectorStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Testing => "testing",
            Self::Deployed => "deployed",
            Self::Error => "error",
        }
    }

    /// Returns whether an operation is in flight.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::Testing)
    }

    /// Returns whether transition to `target` is allowed.
    ///
    /// Every status may return to `draft` through an edit. `draft` may resolve
    /// directly to `deployed` or `error` when an edit lands while an operation
    /// is outstanding.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (_, Self::Draft)
                | (Self::Draft, Self::Testing | Self::Deployed | Self::Error)
                | (Self::Testing, Self::Deployed | Self::Error)
                | (Self::Deployed | Self::Error, Self::Testing)
        )
    }
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ConnectorStatus {
    type Error = ParseConnectorStatusError;

    fn try_from(value: &str) -> Result<Self, ParseConnectorStatusError> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "draft" => Ok(Self::Draft),
            "testing" => Ok(Self::Testing),
            "deployed" => Ok(Self::Deployed),
            "error" => Ok(Self::Error),
            _ => Err(ParseConnectorStatusError(value.to_owned())),
        }
    }
}
