//! Error types for connector domain transitions and parsing.

use super::{ConnectorStatus, OperationKind};
use thiserror::Error;

/// Errors returned by connector aggregate operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectorDomainError {
    /// Transitioning between two statuses is not allowed.
    #[error("invalid connector status transition: {from} -> {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: ConnectorStatus,
        /// Requested status.
        to: ConnectorStatus,
    },

    /// Another operation still holds the connector's lease.
    #[error("a {0} operation still holds the connector")]
    Leased(OperationKind),
}

/// Error returned while parsing a connector status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown connector status: {0}")]
pub struct ParseConnectorStatusError(pub String);

/// Error returned while parsing a transport kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown connector transport: {0} (expected stdio, sse, or streamable-http)")]
pub struct ParseTransportKindError(pub String);

/// Error returned while parsing a connector identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid connector identifier: {0}")]
pub struct ParseConnectorIdError(pub String);
