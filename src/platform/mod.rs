//! Deployment platform integration.
//!
//! [`PlatformCli`] wraps the platform's command-line tool and
//! [`ApiDefinition`] generates the API description submitted when a connector
//! is published.

mod cli;
mod definition;

pub use cli::{
    DEFAULT_PLATFORM_PROGRAM, DEFAULT_PLATFORM_TIMEOUT, PlatformCli, PlatformCommand,
    parse_connector_id,
};
pub use definition::ApiDefinition;
