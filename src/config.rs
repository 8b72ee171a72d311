//! Runtime configuration loaded from TOML.
//!
//! Every section has defaults, so an absent file or a partial file is valid.
//! [`PorticoConfig::validate`] collects every problem rather than stopping at
//! the first.

use crate::connector::adapters::{
    ConnectorProbe, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_SESSION_TTL,
    file::DEFAULT_STORE_NAMESPACE,
};
use crate::connector::services::DEFAULT_OPERATION_TIMEOUT;
use crate::platform::{DEFAULT_PLATFORM_PROGRAM, DEFAULT_PLATFORM_TIMEOUT, PlatformCli};
use crate::process::{DEFAULT_MAX_OUTPUT_BYTES, ProcessRunner};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Scopes requested when no `[identity]` scopes are configured.
pub const DEFAULT_SCOPES: [&str; 2] = [
    "https://service.powerapps.com/user_impersonation",
    "https://graph.microsoft.com/User.Read",
];

/// Errors raised while loading configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying failure.
        source: Arc<std::io::Error>,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(Arc<toml::de::Error>),

    /// One or more values are out of range.
    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PorticoConfig {
    /// Platform tool invocation.
    pub cli: CliConfig,
    /// Lifecycle orchestration.
    pub lifecycle: LifecycleConfig,
    /// Record persistence.
    pub store: StoreConfig,
    /// Authentication.
    pub identity: IdentityConfig,
    /// Connectivity probing.
    pub probe: ProbeConfig,
}

/// `[cli]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Program name or path of the platform tool.
    pub program: String,
    /// Target environment URL.
    pub environment_url: Option<String>,
    /// Bound on a single tool invocation, in seconds.
    pub timeout_secs: u64,
    /// Capture limit per output stream, in bytes.
    pub max_output_bytes: usize,
    /// Directory receiving generated API definition files.
    pub work_dir: Utf8PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PLATFORM_PROGRAM.to_owned(),
            environment_url: None,
            timeout_secs: DEFAULT_PLATFORM_TIMEOUT.as_secs(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            work_dir: Utf8PathBuf::from(".portico/definitions"),
        }
    }
}

impl CliConfig {
    /// Builds the platform tool wrapper described by this section.
    #[must_use]
    pub fn platform_cli(&self) -> PlatformCli {
        PlatformCli::new(self.program.clone(), Duration::from_secs(self.timeout_secs))
            .with_environment_url(self.environment_url.clone())
            .with_runner(ProcessRunner::new(self.max_output_bytes))
    }
}

/// `[lifecycle]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Watchdog bound on a single operation, in seconds.
    pub operation_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT.as_secs(),
        }
    }
}

impl LifecycleConfig {
    /// Returns the watchdog bound.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding store documents.
    pub directory: Utf8PathBuf,
    /// Document namespace.
    pub namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: Utf8PathBuf::from(".portico"),
            namespace: DEFAULT_STORE_NAMESPACE.to_owned(),
        }
    }
}

/// `[identity]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Scopes requested when authenticating.
    pub scopes: Vec<String>,
    /// Lifetime of an established session, in seconds.
    pub session_ttl_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            scopes: DEFAULT_SCOPES.iter().map(|scope| (*scope).to_owned()).collect(),
            session_ttl_secs: DEFAULT_SESSION_TTL.as_secs(),
        }
    }
}

impl IdentityConfig {
    /// Returns the session lifetime.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// `[probe]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Bound on a TCP connect, in seconds.
    pub connect_timeout_secs: u64,
    /// Bound on a `stdio` initialize handshake, in seconds.
    pub handshake_timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            handshake_timeout_secs: DEFAULT_HANDSHAKE_TIMEOUT.as_secs(),
        }
    }
}

impl ProbeConfig {
    /// Builds the probe described by this section.
    #[must_use]
    pub const fn probe(&self) -> ConnectorProbe {
        ConnectorProbe::new(
            Duration::from_secs(self.connect_timeout_secs),
            Duration::from_secs(self.handshake_timeout_secs),
        )
    }
}

impl PorticoConfig {
    /// Loads and validates configuration from `path`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let read_error = |source: std::io::Error| ConfigError::Read {
            path: path.to_owned(),
            source: Arc::new(source),
        };
        let file_name = path.file_name().ok_or_else(|| {
            read_error(std::io::Error::new(
                ErrorKind::InvalidInput,
                "path must include a file name",
            ))
        })?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };

        let contents = match Dir::open_ambient_dir(parent, ambient_authority())
            .and_then(|dir| dir.read_to_string(file_name))
        {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(read_error(err)),
        };
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|err| ConfigError::Parse(Arc::new(err)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges, reporting every problem found.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing each problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        if self.cli.program.trim().is_empty() {
            problems.push("cli.program must not be blank".to_owned());
        }
        if self.cli.timeout_secs == 0 {
            problems.push("cli.timeout_secs must be greater than zero".to_owned());
        }
        if self.cli.max_output_bytes == 0 {
            problems.push("cli.max_output_bytes must be greater than zero".to_owned());
        }
        if self.lifecycle.operation_timeout_secs == 0 {
            problems.push("lifecycle.operation_timeout_secs must be greater than zero".to_owned());
        }
        if self.store.namespace.trim().is_empty() {
            problems.push("store.namespace must not be blank".to_owned());
        }
        if self.identity.scopes.iter().all(|scope| scope.trim().is_empty()) {
            problems.push("identity.scopes must name at least one scope".to_owned());
        }
        if self.identity.session_ttl_secs == 0 {
            problems.push("identity.session_ttl_secs must be greater than zero".to_owned());
        }
        if self.probe.connect_timeout_secs == 0 || self.probe.handshake_timeout_secs == 0 {
            problems.push("probe timeouts must be greater than zero".to_owned());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}
