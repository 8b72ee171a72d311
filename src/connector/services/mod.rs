//! Application services for connector lifecycle and authentication.

mod in_flight;
mod lifecycle;
mod operation;
mod session;

pub use lifecycle::{
    ConnectorLifecycleError, ConnectorLifecycleResult, ConnectorLifecycleService,
    DEFAULT_OPERATION_TIMEOUT,
};
pub use operation::OperationHandle;
pub use session::SessionService;
