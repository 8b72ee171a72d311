//! Step definitions for connector lifecycle behaviour tests.

mod given;
mod then;
mod when;
pub mod world;
