//! End-to-end tests driving a stand-in platform tool and MCP servers.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use mockable::DefaultClock;
use portico::connector::{
    adapters::{
        CliDeploymentDriver, CliIdentityProvider, ConnectorProbe, memory::InMemoryConnectorStore,
    },
    domain::{ConnectorConfig, ConnectorStatus, FailureKind, TransportKind},
    ports::AuthError,
    services::{ConnectorLifecycleService, SessionService},
};
use portico::platform::PlatformCli;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use tokio::net::TcpListener;

const FAKE_PLATFORM_TOOL: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/calls.log"
case "$1 $2" in
  "auth create") echo "Authentication profile created" ;;
  "connector create") echo "Connector created"; echo "Connector ID: pp-7" ;;
  "connector update") echo "Connector updated" ;;
  "connector delete") echo "Connector deleted" ;;
  *) echo "unsupported command: $*" >&2; exit 2 ;;
esac
"#;

const REFUSING_PLATFORM_TOOL: &str = "#!/bin/sh\necho 'bad config' >&2\nexit 1\n";

const FAKE_MCP_SERVER: &str = r#"read request
echo '{"jsonrpc":"2.0","method":"notifications/message","params":{}}'
echo '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{}}}'
"#;

struct Sandbox {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl Sandbox {
    fn install_tool(&self, name: &str, script: &str) -> Utf8PathBuf {
        let path = self.root.join(name);
        std::fs::write(&path, script).expect("tool script should be written");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("tool script should be executable");
        path
    }

    fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.root.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    fn work_dir(&self) -> Utf8PathBuf {
        self.root.join("definitions")
    }
}

#[fixture]
fn sandbox() -> Sandbox {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
        .expect("temp path should be UTF-8");
    Sandbox { _temp: temp, root }
}

type CliService =
    ConnectorLifecycleService<InMemoryConnectorStore, CliDeploymentDriver, DefaultClock>;

fn platform_cli(tool: &Utf8Path) -> PlatformCli {
    PlatformCli::new(tool.as_str(), Duration::from_secs(10))
        .with_environment_url(Some("https://org.example.com".to_owned()))
}

fn cli_service(tool: &Utf8Path, work_dir: &Utf8Path) -> CliService {
    let driver = CliDeploymentDriver::new(platform_cli(tool), work_dir).with_probe(
        ConnectorProbe::new(Duration::from_secs(2), Duration::from_secs(5)),
    );
    ConnectorLifecycleService::new(
        Arc::new(InMemoryConnectorStore::new()),
        Arc::new(driver),
        Arc::new(DefaultClock),
    )
}

fn sessions(tool: &Utf8Path) -> SessionService<CliIdentityProvider<DefaultClock>, DefaultClock> {
    let clock = Arc::new(DefaultClock);
    let provider = CliIdentityProvider::new(platform_cli(tool), Arc::clone(&clock))
        .with_session_ttl(Duration::from_secs(600));
    SessionService::new(Arc::new(provider), clock)
}

fn scopes() -> Vec<String> {
    vec!["https://service.powerapps.com/user_impersonation".to_owned()]
}

fn stdio_config() -> ConnectorConfig {
    ConnectorConfig::new("x", "X", "d", TransportKind::Stdio).with_command("node", ["server.js"])
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deploy_creates_then_updates_through_platform_tool(
    sandbox: Sandbox,
) -> Result<(), eyre::Report> {
    let tool = sandbox.install_tool("pac", FAKE_PLATFORM_TOOL);
    let service = cli_service(&tool, &sandbox.work_dir());
    let session = sessions(&tool).authenticate(&scopes()).await?;
    let created = service.create(stdio_config()).await?;

    let first = service.deploy(created.id(), &session).await?;
    let second = service.deploy(created.id(), &session).await?;

    eyre::ensure!(first.status() == ConnectorStatus::Deployed);
    eyre::ensure!(first.published_id() == Some("pp-7"));
    eyre::ensure!(second.published_id() == Some("pp-7"));

    let definition_file = sandbox.work_dir().join(format!("{}.swagger.json", created.id()));
    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&definition_file)?)?;
    eyre::ensure!(document["swagger"] == "2.0");
    eyre::ensure!(document["info"]["title"] == "X");

    let calls = sandbox.calls();
    eyre::ensure!(calls.len() == 3, "unexpected calls: {calls:?}");
    eyre::ensure!(
        calls
            .first()
            .is_some_and(|call| call == "auth create --environment https://org.example.com")
    );
    eyre::ensure!(
        calls
            .get(1)
            .is_some_and(|call| call.starts_with("connector create --api-definition-file"))
    );
    eyre::ensure!(
        calls
            .get(2)
            .is_some_and(|call| call.starts_with("connector update --connector-id pp-7"))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refused_deploy_records_tool_stderr(sandbox: Sandbox) -> Result<(), eyre::Report> {
    let login_tool = sandbox.install_tool("pac", FAKE_PLATFORM_TOOL);
    let refusing_tool = sandbox.install_tool("pac-refusing", REFUSING_PLATFORM_TOOL);
    let service = cli_service(&refusing_tool, &sandbox.work_dir());
    let session = sessions(&login_tool).authenticate(&scopes()).await?;
    let created = service.create(stdio_config()).await?;

    let resolved = service.deploy(created.id(), &session).await?;

    eyre::ensure!(resolved.status() == ConnectorStatus::Error);
    let diagnostic = resolved
        .diagnostic()
        .ok_or_else(|| eyre::eyre!("diagnostic should be recorded"))?;
    eyre::ensure!(diagnostic.message() == "bad config");
    eyre::ensure!(diagnostic.kind() == FailureKind::CommandFailed);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn retire_deletes_published_connector(sandbox: Sandbox) -> Result<(), eyre::Report> {
    let tool = sandbox.install_tool("pac", FAKE_PLATFORM_TOOL);
    let service = cli_service(&tool, &sandbox.work_dir());
    let session = sessions(&tool).authenticate(&scopes()).await?;
    let created = service.create(stdio_config()).await?;
    service.deploy(created.id(), &session).await?;

    service.retire(created.id(), &session).await?;

    eyre::ensure!(service.list().await?.is_empty());
    eyre::ensure!(
        sandbox
            .calls()
            .last()
            .is_some_and(|call| call == "connector delete --connector-id pp-7")
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_login_is_rejected_with_tool_message(sandbox: Sandbox) {
    let tool = sandbox.install_tool("pac-refusing", REFUSING_PLATFORM_TOOL);

    let result = sessions(&tool).authenticate(&scopes()).await;

    assert!(matches!(result, Err(AuthError::Rejected(ref reason)) if reason == "bad config"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stdio_test_performs_initialize_handshake(sandbox: Sandbox) -> Result<(), eyre::Report> {
    let tool = sandbox.install_tool("pac", FAKE_PLATFORM_TOOL);
    let service = cli_service(&tool, &sandbox.work_dir());
    let created = service
        .create(
            ConnectorConfig::new("echo", "Echo", "Scripted server", TransportKind::Stdio)
                .with_command("sh", ["-c", FAKE_MCP_SERVER]),
        )
        .await?;

    let tested = service.test(created.id()).await?;

    eyre::ensure!(
        tested.status() == ConnectorStatus::Deployed,
        "probe failed: {:?}",
        tested.diagnostic()
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn url_test_reports_reachability(sandbox: Sandbox) -> Result<(), eyre::Report> {
    let tool = sandbox.install_tool("pac", FAKE_PLATFORM_TOOL);
    let service = cli_service(&tool, &sandbox.work_dir());
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let open_port = listener.local_addr()?.port();
    let closed_port = {
        let probe_listener = TcpListener::bind("127.0.0.1:0").await?;
        probe_listener.local_addr()?.port()
    };

    let reachable = service
        .create(
            ConnectorConfig::new("up", "Up", "Listening", TransportKind::Sse)
                .with_url(format!("http://127.0.0.1:{open_port}/sse")),
        )
        .await?;
    let unreachable = service
        .create(
            ConnectorConfig::new("down", "Down", "Closed", TransportKind::StreamableHttp)
                .with_url(format!("http://127.0.0.1:{closed_port}/mcp")),
        )
        .await?;

    let passed = service.test(reachable.id()).await?;
    let failed = service.test(unreachable.id()).await?;

    eyre::ensure!(passed.status() == ConnectorStatus::Deployed);
    eyre::ensure!(failed.status() == ConnectorStatus::Error);
    eyre::ensure!(
        failed.diagnostic().map(|diagnostic| diagnostic.kind()) == Some(FailureKind::Unreachable)
    );
    drop(listener);
    Ok(())
}
