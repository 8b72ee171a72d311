//! Transport kinds and connection shapes for connectors.

use super::ParseTransportKindError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection mechanism spoken by the connector's target server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Local process speaking over standard input and output.
    Stdio,
    /// Remote server using server-sent events.
    Sse,
    /// Remote server using streamable HTTP.
    StreamableHttp,
}

impl TransportKind {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
            Self::StreamableHttp => "streamable-http",
        }
    }

    /// Returns whether this transport is addressed by URL.
    #[must_use]
    pub const fn requires_url(self) -> bool {
        matches!(self, Self::Sse | Self::StreamableHttp)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TransportKind {
    type Error = ParseTransportKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "stdio" => Ok(Self::Stdio),
            "sse" => Ok(Self::Sse),
            "streamable-http" | "streamable_http" => Ok(Self::StreamableHttp),
            _ => Err(ParseTransportKindError(value.to_owned())),
        }
    }
}

/// Validated connection shape. Exactly one shape exists per transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "kebab-case")]
pub enum Connection {
    /// Launch a local command.
    Stdio {
        /// Executable to launch.
        command: String,
        /// Ordered command-line arguments.
        #[serde(default)]
        args: Vec<String>,
    },
    /// Connect to a server-sent events endpoint.
    Sse {
        /// Absolute endpoint URL.
        url: String,
    },
    /// Connect to a streamable HTTP endpoint.
    StreamableHttp {
        /// Absolute endpoint URL.
        url: String,
    },
}

impl Connection {
    /// Returns the transport kind for this connection.
    #[must_use]
    pub const fn transport(&self) -> TransportKind {
        match self {
            Self::Stdio { .. } => TransportKind::Stdio,
            Self::Sse { .. } => TransportKind::Sse,
            Self::StreamableHttp { .. } => TransportKind::StreamableHttp,
        }
    }

    /// Returns the endpoint URL for URL-based transports.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Sse { url } | Self::StreamableHttp { url } => Some(url),
            Self::Stdio { .. } => None,
        }
    }

    /// Returns the launch command for `stdio` connections.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Stdio { command, .. } => Some(command),
            Self::Sse { .. } | Self::StreamableHttp { .. } => None,
        }
    }

    /// Returns launch arguments; empty for URL-based transports.
    #[must_use]
    pub fn args(&self) -> &[String] {
        match self {
            Self::Stdio { args, .. } => args,
            Self::Sse { .. } | Self::StreamableHttp { .. } => &[],
        }
    }
}
