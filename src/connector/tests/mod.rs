//! Unit tests for the connector module.
