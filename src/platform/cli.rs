//! Typed wrapper over the platform command-line tool.

use crate::process::{CommandSpec, ProcessError, ProcessOutput, ProcessRunner};
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default program name of the platform tool.
pub const DEFAULT_PLATFORM_PROGRAM: &str = "pac";

/// Default bound on a single tool invocation.
pub const DEFAULT_PLATFORM_TIMEOUT: Duration = Duration::from_secs(30);

/// A subcommand understood by the platform tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCommand {
    /// `--version`, used as an installation check.
    Version,
    /// `auth create [--environment <url>]`.
    AuthCreate {
        /// Target environment.
        environment_url: Option<String>,
    },
    /// `auth clear`.
    AuthClear,
    /// `admin list`.
    ListEnvironments,
    /// `connector list`.
    ListConnectors,
    /// `connector create --api-definition-file <file> [--environment <url>]`.
    CreateConnector {
        /// Generated API description.
        definition_file: Utf8PathBuf,
        /// Target environment.
        environment_url: Option<String>,
    },
    /// `connector update --connector-id <id> --api-definition-file <file>
    /// [--environment <url>]`.
    UpdateConnector {
        /// Platform connector identifier.
        connector_id: String,
        /// Generated API description.
        definition_file: Utf8PathBuf,
        /// Target environment.
        environment_url: Option<String>,
    },
    /// `connector delete --connector-id <id>`.
    DeleteConnector {
        /// Platform connector identifier.
        connector_id: String,
    },
    /// `connector export --connector-id <id> --output-directory <dir>`.
    ExportConnector {
        /// Platform connector identifier.
        connector_id: String,
        /// Destination directory.
        output_directory: Utf8PathBuf,
    },
}

impl PlatformCommand {
    /// Returns the argument vector passed to the tool.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        match self {
            Self::Version => args.push("--version".to_owned()),
            Self::AuthCreate { environment_url } => {
                args.extend(["auth".to_owned(), "create".to_owned()]);
                push_environment(&mut args, environment_url.as_deref());
            }
            Self::AuthClear => args.extend(["auth".to_owned(), "clear".to_owned()]),
            Self::ListEnvironments => args.extend(["admin".to_owned(), "list".to_owned()]),
            Self::ListConnectors => args.extend(["connector".to_owned(), "list".to_owned()]),
            Self::CreateConnector {
                definition_file,
                environment_url,
            } => {
                args.extend([
                    "connector".to_owned(),
                    "create".to_owned(),
                    "--api-definition-file".to_owned(),
                    definition_file.to_string(),
                ]);
                push_environment(&mut args, environment_url.as_deref());
            }
            Self::UpdateConnector {
                connector_id,
                definition_file,
                environment_url,
            } => {
                args.extend([
                    "connector".to_owned(),
                    "update".to_owned(),
                    "--connector-id".to_owned(),
                    connector_id.clone(),
                    "--api-definition-file".to_owned(),
                    definition_file.to_string(),
                ]);
                push_environment(&mut args, environment_url.as_deref());
            }
            Self::DeleteConnector { connector_id } => args.extend([
                "connector".to_owned(),
                "delete".to_owned(),
                "--connector-id".to_owned(),
                connector_id.clone(),
            ]),
            Self::ExportConnector {
                connector_id,
                output_directory,
            } => args.extend([
                "connector".to_owned(),
                "export".to_owned(),
                "--connector-id".to_owned(),
                connector_id.clone(),
                "--output-directory".to_owned(),
                output_directory.to_string(),
            ]),
        }
        args
    }
}

fn push_environment(args: &mut Vec<String>, environment_url: Option<&str>) {
    if let Some(url) = environment_url.filter(|url| !url.trim().is_empty()) {
        args.extend(["--environment".to_owned(), url.trim().to_owned()]);
    }
}

/// Invokes the platform tool through a [`ProcessRunner`].
#[derive(Debug, Clone)]
pub struct PlatformCli {
    program: String,
    environment_url: Option<String>,
    timeout: Duration,
    runner: ProcessRunner,
}

impl Default for PlatformCli {
    fn default() -> Self {
        Self::new(DEFAULT_PLATFORM_PROGRAM, DEFAULT_PLATFORM_TIMEOUT)
    }
}

impl PlatformCli {
    /// Creates a wrapper that runs `program` with `timeout` per invocation.
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            environment_url: None,
            timeout,
            runner: ProcessRunner::default(),
        }
    }

    /// Targets a specific platform environment.
    #[must_use]
    pub fn with_environment_url(mut self, environment_url: Option<String>) -> Self {
        self.environment_url = environment_url.filter(|url| !url.trim().is_empty());
        self
    }

    /// Uses `runner` for invocations.
    #[must_use]
    pub const fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Returns the program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the configured environment URL.
    #[must_use]
    pub fn environment_url(&self) -> Option<&str> {
        self.environment_url.as_deref()
    }

    /// Returns the per-invocation timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the invocation for `command`.
    #[must_use]
    pub fn command_spec(&self, command: &PlatformCommand) -> CommandSpec {
        CommandSpec::new(self.program.clone(), self.timeout).with_args(command.args())
    }

    /// Runs `command`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the tool cannot be launched, fails, times
    /// out, or is cancelled.
    pub async fn execute(
        &self,
        command: &PlatformCommand,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessError> {
        debug!(program = %self.program, command = ?command, "invoking platform tool");
        self.runner.run(&self.command_spec(command), cancel).await
    }

    /// Returns whether the tool is installed and answers `--version`.
    pub async fn check_installation(&self, cancel: &CancellationToken) -> bool {
        self.execute(&PlatformCommand::Version, cancel).await.is_ok()
    }

    /// Creates an authentication profile for the configured environment.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the tool fails.
    pub async fn login(&self, cancel: &CancellationToken) -> Result<ProcessOutput, ProcessError> {
        let command = PlatformCommand::AuthCreate {
            environment_url: self.environment_url.clone(),
        };
        self.execute(&command, cancel).await
    }

    /// Clears stored authentication profiles.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the tool fails.
    pub async fn logout(&self, cancel: &CancellationToken) -> Result<ProcessOutput, ProcessError> {
        self.execute(&PlatformCommand::AuthClear, cancel).await
    }

    /// Lists platform environments.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the tool fails.
    pub async fn list_environments(
        &self,
        cancel: &CancellationToken,
    ) -> Result<String, ProcessError> {
        self.execute(&PlatformCommand::ListEnvironments, cancel)
            .await
            .map(ProcessOutput::into_stdout)
    }

    /// Lists connectors published on the platform.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the tool fails.
    pub async fn list_connectors(&self, cancel: &CancellationToken) -> Result<String, ProcessError> {
        self.execute(&PlatformCommand::ListConnectors, cancel)
            .await
            .map(ProcessOutput::into_stdout)
    }

    /// Creates a connector from a definition file.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the tool fails.
    pub async fn create_connector(
        &self,
        definition_file: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessError> {
        let command = PlatformCommand::CreateConnector {
            definition_file: definition_file.to_owned(),
            environment_url: self.environment_url.clone(),
        };
        self.execute(&command, cancel).await
    }

    /// Updates a published connector from a definition file.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the tool fails.
    pub async fn update_connector(
        &self,
        connector_id: &str,
        definition_file: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessError> {
        let command = PlatformCommand::UpdateConnector {
            connector_id: connector_id.to_owned(),
            definition_file: definition_file.to_owned(),
            environment_url: self.environment_url.clone(),
        };
        self.execute(&command, cancel).await
    }

    /// Deletes a published connector.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the tool fails.
    pub async fn delete_connector(
        &self,
        connector_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessError> {
        let command = PlatformCommand::DeleteConnector {
            connector_id: connector_id.to_owned(),
        };
        self.execute(&command, cancel).await
    }

    /// Exports a published connector into `output_directory`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the tool fails.
    pub async fn export_connector(
        &self,
        connector_id: &str,
        output_directory: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<String, ProcessError> {
        let command = PlatformCommand::ExportConnector {
            connector_id: connector_id.to_owned(),
            output_directory: output_directory.to_owned(),
        };
        self.execute(&command, cancel)
            .await
            .map(ProcessOutput::into_stdout)
    }
}

/// Extracts the platform connector identifier from tool output.
///
/// Recognises lines such as `Connector ID: abc` or `connectorId=abc`.
#[must_use]
pub fn parse_connector_id(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (label, value) = line.split_once(':').or_else(|| line.split_once('='))?;
        let normalized_label = label
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();
        let trimmed = value.trim();
        (normalized_label == "connectorid" && !trimmed.is_empty()).then(|| trimmed.to_owned())
    })
}
