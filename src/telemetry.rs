//! Tracing subscriber setup for binaries.

use tracing_subscriber::EnvFilter;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "PORTICO_LOG";

/// Installs a formatted subscriber writing to standard error.
///
/// The filter comes from `PORTICO_LOG`, then `RUST_LOG`, then
/// `default_directive`. Calling this more than once keeps the first
/// subscriber.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
