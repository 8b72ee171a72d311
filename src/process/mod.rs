//! Bounded execution of external programs.
//!
//! [`ProcessRunner`] launches a program, captures its output streams
//! incrementally up to a per-stream byte cap, and enforces a timeout. Callers
//! cancel an in-flight run through a
//! [`CancellationToken`](tokio_util::sync::CancellationToken); cancellation and
//! timeouts both kill the child and keep whatever output was captured.

mod capture;
mod error;
mod runner;

pub use capture::CapturedOutput;
pub use error::ProcessError;
pub use runner::{CommandSpec, DEFAULT_MAX_OUTPUT_BYTES, ProcessOutput, ProcessRunner};
pub(crate) use runner::duration_millis;
