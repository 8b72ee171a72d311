//! Portico: lifecycle orchestration for MCP-server connectors.
//!
//! Operators describe a connector (a display name, a transport, and either an
//! endpoint URL or a launch command), test it, and publish it to a low-code
//! platform through the platform's command-line tool. Portico validates the
//! configuration, persists each connector as a record, and drives the record
//! through a small status machine while operations run in the background.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: connector records, validation, and status transitions
//! - **Ports**: storage, deployment, identity, and platform API traits
//! - **Adapters**: in-memory and file stores, CLI and API drivers, probes
//! - **Services**: the lifecycle orchestrator and session acquisition
//!
//! # Modules
//!
//! - [`connector`]: connector lifecycle management
//! - [`platform`]: platform tool commands and API definition documents
//! - [`process`]: bounded external process execution
//! - [`config`]: TOML configuration
//! - [`telemetry`]: tracing subscriber setup

pub mod config;
pub mod connector;
pub mod platform;
pub mod process;
pub mod telemetry;
