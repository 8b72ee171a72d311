//! Connector lifecycle orchestration.
//!
//! A connector fronts an MCP server and is published to the deployment
//! platform. This module validates connector configuration, persists records,
//! and drives them through test, deploy and retire operations while keeping
//! concurrent edits intact. It follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
