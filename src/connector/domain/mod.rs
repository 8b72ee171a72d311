//! Domain model for connector configuration and lifecycle.
//!
//! Connectors describe how to reach an MCP server and carry a coarse
//! deployment status. Validation is pure; status transitions are enforced by
//! the [`ConnectorRecord`] aggregate.

mod config;
mod definition;
mod diagnostic;
mod error;
mod ids;
mod operation;
mod record;
mod session;
mod status;
mod transport;
mod validation;

pub use config::{ConnectorConfig, DEFAULT_CONNECTOR_VERSION};
pub use definition::ConnectorDefinition;
pub use diagnostic::{Diagnostic, FailureKind};
pub use error::{
    ConnectorDomainError, ParseConnectorIdError, ParseConnectorStatusError,
    ParseTransportKindError,
};
pub use ids::ConnectorId;
pub use operation::{OperationKind, OperationLease, OperationOutcome};
pub use record::ConnectorRecord;
pub use session::{AccessToken, Session};
pub use status::ConnectorStatus;
pub use transport::{Connection, TransportKind};
pub use validation::{ConnectorValidator, ValidationError, Violation};
