//! API description documents submitted to the platform.

use crate::connector::domain::{Connection, ConnectorDefinition};
use serde_json::{Value, json};
use url::Url;

const STDIO_PLACEHOLDER_HOST: &str = "localhost";

/// Swagger 2.0 description of a connector's MCP endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiDefinition {
    document: Value,
}

impl ApiDefinition {
    /// Builds the document for `definition`.
    ///
    /// URL transports derive host, base path and scheme from the endpoint.
    /// `stdio` connectors have no endpoint and record their launch command in
    /// vendor extensions instead.
    #[must_use]
    pub fn for_connector(definition: &ConnectorDefinition) -> Self {
        let (host, base_path, scheme) = endpoint_parts(definition.connection());
        let mut document = json!({
            "swagger": "2.0",
            "info": {
                "title": definition.display_name(),
                "description": definition.description(),
                "version": definition.version(),
            },
            "host": host,
            "basePath": base_path,
            "schemes": [scheme],
            "consumes": ["application/json"],
            "produces": ["application/json"],
            "paths": {
                "/mcp": {
                    "post": {
                        "summary": "Execute MCP Method",
                        "description": "Execute a Model Context Protocol method",
                        "operationId": "ExecuteMCPMethod",
                        "parameters": [{
                            "name": "method",
                            "in": "body",
                            "required": true,
                            "schema": {
                                "type": "object",
                                "properties": {
                                    "method": {"type": "string"},
                                    "params": {"type": "object"},
                                },
                            },
                        }],
                        "responses": {
                            "200": {
                                "description": "MCP method response",
                                "schema": {"type": "object"},
                            },
                        },
                    },
                },
            },
            "x-mcp-name": definition.name(),
            "x-mcp-transport": definition.transport().as_str(),
        });

        if let (Some(object), Connection::Stdio { command, args }) =
            (document.as_object_mut(), definition.connection())
        {
            object.insert("x-mcp-command".to_owned(), json!(command));
            object.insert("x-mcp-args".to_owned(), json!(args));
        }
        if let (Some(object), Some(icon)) = (document.as_object_mut(), definition.icon_path()) {
            object.insert("x-ms-connector-icon".to_owned(), json!(icon));
        }

        Self { document }
    }

    /// Returns the document as JSON.
    #[must_use]
    pub const fn document(&self) -> &Value {
        &self.document
    }

    /// Serializes the document for writing to disk.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.document)
    }
}

fn endpoint_parts(connection: &Connection) -> (String, String, String) {
    let parsed = connection.url().and_then(|raw| Url::parse(raw).ok());
    match parsed {
        Some(url) => {
            let host_name = url.host_str().unwrap_or(STDIO_PLACEHOLDER_HOST);
            let host = url
                .port()
                .map_or_else(|| host_name.to_owned(), |port| format!("{host_name}:{port}"));
            let base_path = match url.path() {
                "" => "/".to_owned(),
                path => path.to_owned(),
            };
            (host, base_path, url.scheme().to_owned())
        }
        None => (
            STDIO_PLACEHOLDER_HOST.to_owned(),
            "/".to_owned(),
            "http".to_owned(),
        ),
    }
}
