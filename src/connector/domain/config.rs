//! Raw operator-supplied connector configuration.

use super::TransportKind;
use serde::{Deserialize, Serialize};

/// Version applied when the operator leaves it blank.
pub const DEFAULT_CONNECTOR_VERSION: &str = "1.0.0";

/// Unvalidated connector configuration as entered by an operator.
///
/// Every connection field is present regardless of transport; validation
/// decides which of them must be filled in. `environment` holds raw JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorConfig {
    /// Machine name of the connector.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Free-form description.
    pub description: String,
    /// Connector version; blank means [`DEFAULT_CONNECTOR_VERSION`].
    #[serde(default)]
    pub version: String,
    /// Transport spoken by the target server.
    pub transport: TransportKind,
    /// Endpoint for URL-based transports.
    #[serde(default)]
    pub url: String,
    /// Launch command for `stdio`.
    #[serde(default)]
    pub command: String,
    /// Launch arguments for `stdio`.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables as a JSON object of strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Optional icon location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
}

impl ConnectorConfig {
    /// Creates a configuration with the mandatory descriptive fields set.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        transport: TransportKind,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: description.into(),
            version: DEFAULT_CONNECTOR_VERSION.to_owned(),
            transport,
            url: String::new(),
            command: String::new(),
            args: Vec::new(),
            environment: None,
            icon_path: None,
        }
    }

    /// Sets the endpoint URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the launch command and its arguments.
    #[must_use]
    pub fn with_command<I, A>(mut self, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.command = command.into();
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the raw environment JSON text.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the icon path.
    #[must_use]
    pub fn with_icon_path(mut self, icon_path: impl Into<String>) -> Self {
        self.icon_path = Some(icon_path.into());
        self
    }
}
