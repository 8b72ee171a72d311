//! Validated connector definition.

use super::{
    Connection, ConnectorConfig, ConnectorValidator, DEFAULT_CONNECTOR_VERSION, TransportKind,
    ValidationError, Violation, validation::parse_environment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Connector configuration that passed validation.
///
/// Descriptive fields are trimmed and the connection is reduced to the one
/// shape its transport needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorDefinition {
    name: String,
    display_name: String,
    description: String,
    version: String,
    #[serde(flatten)]
    connection: Connection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon_path: Option<String>,
}

impl ConnectorDefinition {
    /// Validates `config` and builds a definition from it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] listing every violation when `config` is
    /// not valid.
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ValidationError> {
        ConnectorValidator::check(config)?;

        let environment = parse_environment(config.environment.as_deref())
            .map_err(|reason| ValidationError::new(vec![Violation::InvalidEnvironment(reason)]))?;
        let connection = match config.transport {
            TransportKind::Stdio => Connection::Stdio {
                command: config.command.trim().to_owned(),
                args: config.args.clone(),
            },
            TransportKind::Sse => Connection::Sse {
                url: config.url.trim().to_owned(),
            },
            TransportKind::StreamableHttp => Connection::StreamableHttp {
                url: config.url.trim().to_owned(),
            },
        };
        let version = match config.version.trim() {
            "" => DEFAULT_CONNECTOR_VERSION.to_owned(),
            value => value.to_owned(),
        };

        Ok(Self {
            name: config.name.trim().to_owned(),
            display_name: config.display_name.trim().to_owned(),
            description: config.description.trim().to_owned(),
            version,
            connection,
            environment,
            icon_path: config
                .icon_path
                .as_deref()
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(str::to_owned),
        })
    }

    /// Converts the definition back into raw configuration form.
    #[must_use]
    pub fn to_config(&self) -> ConnectorConfig {
        let mut config = ConnectorConfig::new(
            self.name.clone(),
            self.display_name.clone(),
            self.description.clone(),
            self.connection.transport(),
        )
        .with_version(self.version.clone());
        match &self.connection {
            Connection::Stdio { command, args } => {
                config = config.with_command(command.clone(), args.iter().cloned());
            }
            Connection::Sse { url } | Connection::StreamableHttp { url } => {
                config = config.with_url(url.clone());
            }
        }
        if !self.environment.is_empty() {
            config.environment = serde_json::to_string(&self.environment).ok();
        }
        config.icon_path.clone_from(&self.icon_path);
        config
    }

    /// Returns the machine name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the connection shape.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the transport kind.
    #[must_use]
    pub const fn transport(&self) -> TransportKind {
        self.connection.transport()
    }

    /// Returns the environment variables.
    #[must_use]
    pub const fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Returns the icon path, if any.
    #[must_use]
    pub fn icon_path(&self) -> Option<&str> {
        self.icon_path.as_deref()
    }
}
