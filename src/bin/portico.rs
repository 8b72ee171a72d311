//! Command-line front end for the connector lifecycle service.
//!
//! Usage:
//!
//! ```text
//! portico [--config portico.toml] <command> [options]
//! ```
//!
//! Records are stored under the configured store directory and printed as
//! JSON on standard output. Logs go to standard error and honour
//! `PORTICO_LOG` or `RUST_LOG`.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use mockable::DefaultClock;
use portico::config::{ConfigError, PorticoConfig};
use portico::connector::adapters::file::FileConnectorStore;
use portico::connector::adapters::{CliDeploymentDriver, CliIdentityProvider};
use portico::connector::domain::{
    ConnectorConfig, ConnectorId, ConnectorStatus, OperationKind, ParseTransportKindError,
    Session, TransportKind,
};
use portico::connector::ports::{AuthError, ConnectorStoreError};
use portico::connector::services::{
    ConnectorLifecycleError, ConnectorLifecycleService, OperationHandle, SessionService,
};
use portico::process::ProcessError;
use portico::telemetry;
use serde::Serialize;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Errors surfaced by the binary.
#[derive(Debug, Error)]
enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open connector store: {0}")]
    Store(#[from] ConnectorStoreError),

    #[error(transparent)]
    Lifecycle(#[from] ConnectorLifecycleError),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Platform(#[from] ProcessError),

    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[derive(Debug, Parser)]
#[command(name = "portico", version, about = "Test and publish MCP-server connectors")]
struct Cli {
    /// Configuration file; defaults apply when it does not exist.
    #[arg(long, env = "PORTICO_CONFIG", default_value = "portico.toml")]
    config: Utf8PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a connector in draft.
    Create(ConnectorArgs),
    /// Replace a connector's configuration and reset it to draft.
    Update {
        /// Connector identifier.
        id: ConnectorId,
        #[command(flatten)]
        connector: ConnectorArgs,
    },
    /// List stored connectors.
    List,
    /// Show one connector.
    Show {
        /// Connector identifier.
        id: ConnectorId,
    },
    /// Delete a connector record without touching the platform.
    Delete {
        /// Connector identifier.
        id: ConnectorId,
    },
    /// Probe a connector's server.
    Test {
        /// Connector identifier.
        id: ConnectorId,
    },
    /// Publish a connector to the platform.
    Deploy {
        /// Connector identifier.
        id: ConnectorId,
    },
    /// Remove a connector from the platform and delete its record.
    Retire {
        /// Connector identifier.
        id: ConnectorId,
    },
    /// List platform environments.
    Environments,
    /// List connectors published on the platform.
    RemoteConnectors,
    /// Export a published connector's package.
    Export {
        /// Platform connector identifier.
        connector_id: String,
        /// Directory receiving the exported files.
        #[arg(long, default_value = ".")]
        output_directory: Utf8PathBuf,
    },
    /// Clear the platform tool's authentication profiles.
    Logout,
    /// Check that the platform tool is installed.
    Check,
}

#[derive(Debug, Args)]
struct ConnectorArgs {
    /// Machine name.
    #[arg(long)]
    name: String,
    /// Human-readable name.
    #[arg(long)]
    display_name: String,
    /// Description shown on the platform.
    #[arg(long)]
    description: String,
    /// Transport: stdio, sse or streamable-http.
    #[arg(long, value_parser = parse_transport)]
    transport: TransportKind,
    /// Endpoint for sse and streamable-http.
    #[arg(long, default_value = "")]
    url: String,
    /// Launch command for stdio.
    #[arg(long, default_value = "")]
    command: String,
    /// Launch argument for stdio; repeat for more.
    #[arg(long = "arg", allow_hyphen_values = true)]
    args: Vec<String>,
    /// Environment variables as a JSON object of strings.
    #[arg(long)]
    environment: Option<String>,
    /// Connector version.
    #[arg(long)]
    version: Option<String>,
    /// Icon location.
    #[arg(long)]
    icon_path: Option<String>,
}

impl ConnectorArgs {
    fn into_config(self) -> ConnectorConfig {
        let mut config =
            ConnectorConfig::new(self.name, self.display_name, self.description, self.transport)
                .with_url(self.url)
                .with_command(self.command, self.args);
        config.environment = self.environment;
        config.icon_path = self.icon_path;
        if let Some(version) = self.version {
            config.version = version;
        }
        config
    }
}

fn parse_transport(raw: &str) -> Result<TransportKind, ParseTransportKindError> {
    TransportKind::try_from(raw)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init("warn,portico=info");

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "command failed");
            if let Err(write_err) = writeln!(io::stderr().lock(), "error: {err}") {
                error!(error = %write_err, "failed to report error");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CommandError> {
    let config = PorticoConfig::load(&cli.config)?;
    let clock = Arc::new(DefaultClock);
    let store = FileConnectorStore::open(&config.store.directory, &config.store.namespace)?;
    let driver = CliDeploymentDriver::new(config.cli.platform_cli(), config.cli.work_dir.clone())
        .with_probe(config.probe.probe());
    let service =
        ConnectorLifecycleService::new(Arc::new(store), Arc::new(driver), Arc::clone(&clock))
            .with_operation_timeout(config.lifecycle.operation_timeout());

    match cli.command {
        Command::Create(connector) => emit(&service.create(connector.into_config()).await?),
        Command::Update { id, connector } => {
            emit(&service.update(id, connector.into_config()).await?)
        }
        Command::List => emit(&service.list().await?),
        Command::Show { id } => emit(&service.get(id).await?),
        Command::Delete { id } => emit(&service.delete(id).await?),
        Command::Test { id } => resolve(service.start_test(id).await?).await,
        Command::Deploy { id } => {
            let session = authenticate(&config, clock).await?;
            resolve(service.start_deploy(id, &session).await?).await
        }
        Command::Retire { id } => {
            let session = authenticate(&config, clock).await?;
            resolve(service.start_retire(id, &session).await?).await
        }
        Command::Environments => {
            let listing = config
                .cli
                .platform_cli()
                .list_environments(&CancellationToken::new())
                .await?;
            print_raw(&listing)
        }
        Command::RemoteConnectors => {
            let listing = config
                .cli
                .platform_cli()
                .list_connectors(&CancellationToken::new())
                .await?;
            print_raw(&listing)
        }
        Command::Export {
            connector_id,
            output_directory,
        } => {
            let exported = config
                .cli
                .platform_cli()
                .export_connector(&connector_id, &output_directory, &CancellationToken::new())
                .await?;
            print_raw(&exported)
        }
        Command::Logout => {
            let cleared = config
                .cli
                .platform_cli()
                .logout(&CancellationToken::new())
                .await?;
            print_raw(cleared.stdout())
        }
        Command::Check => check(&config).await,
    }
}

async fn authenticate(
    config: &PorticoConfig,
    clock: Arc<DefaultClock>,
) -> Result<Session, CommandError> {
    let provider = CliIdentityProvider::new(config.cli.platform_cli(), Arc::clone(&clock))
        .with_session_ttl(config.identity.session_ttl());
    let sessions = SessionService::new(Arc::new(provider), clock);
    Ok(sessions.authenticate(&config.identity.scopes).await?)
}

/// Waits for an operation, cancelling it on Ctrl-C.
async fn resolve(handle: OperationHandle) -> Result<ExitCode, CommandError> {
    let kind = handle.kind();
    let cancel = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
    info!(connector_id = %handle.id(), operation = %kind, "waiting for operation");
    let resolved = handle.wait().await;
    interrupt.abort();

    let record = resolved?;
    emit(&record)?;
    let failed = kind != OperationKind::Retire && record.status() == ConnectorStatus::Error;
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn check(config: &PorticoConfig) -> Result<ExitCode, CommandError> {
    #[derive(Serialize)]
    struct Installation<'a> {
        program: &'a str,
        installed: bool,
    }

    let cli = config.cli.platform_cli();
    let installed = cli.check_installation(&CancellationToken::new()).await;
    emit(&Installation {
        program: cli.program(),
        installed,
    })?;
    Ok(if installed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn emit(value: &impl Serialize) -> Result<ExitCode, CommandError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(ExitCode::SUCCESS)
}

fn print_raw(text: &str) -> Result<ExitCode, CommandError> {
    writeln!(io::stdout().lock(), "{text}")?;
    Ok(ExitCode::SUCCESS)
}
