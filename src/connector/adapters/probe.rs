//! Reachability probe for connector targets.

use crate::connector::{
    domain::{Connection, ConnectorDefinition},
    ports::{DriverError, DriverResult, TestReport},
};
use serde_json::{Value, json};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Default bound on establishing a TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on a `stdio` server answering `initialize`.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const INITIALIZE_REQUEST_ID: u64 = 1;

/// Checks that a connector's target server answers.
///
/// URL transports are probed with a TCP connect to the endpoint's host and
/// port. `stdio` servers are launched and sent an MCP `initialize` request;
/// the probe passes once a matching response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorProbe {
    connect_timeout: Duration,
    handshake_timeout: Duration,
}

impl Default for ConnectorProbe {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_HANDSHAKE_TIMEOUT)
    }
}

impl ConnectorProbe {
    /// Creates a probe with explicit time bounds.
    #[must_use]
    pub const fn new(connect_timeout: Duration, handshake_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            handshake_timeout,
        }
    }

    /// Probes the target described by `definition`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Cancelled`] when `cancel` fires first. Failing
    /// probes are reported through [`TestReport`].
    pub async fn probe(
        &self,
        definition: &ConnectorDefinition,
        cancel: &CancellationToken,
    ) -> DriverResult<TestReport> {
        let report = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DriverError::Cancelled),
            report = self.probe_connection(definition) => report,
        };
        debug!(
            connector = definition.name(),
            passed = report.passed,
            detail = ?report.detail,
            "probe finished"
        );
        Ok(report)
    }

    async fn probe_connection(&self, definition: &ConnectorDefinition) -> TestReport {
        match definition.connection() {
            Connection::Sse { url } | Connection::StreamableHttp { url } => {
                self.probe_endpoint(url).await
            }
            Connection::Stdio { command, args } => {
                self.probe_stdio(command, args, definition).await
            }
        }
    }

    async fn probe_endpoint(&self, raw_url: &str) -> TestReport {
        let url = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(err) => return TestReport::failed(format!("invalid URL '{raw_url}': {err}")),
        };
        let Some(host) = url.host_str() else {
            return TestReport::failed(format!("URL '{raw_url}' has no host"));
        };
        let Some(port) = url.port_or_known_default() else {
            return TestReport::failed(format!("URL '{raw_url}' has no port"));
        };
        let address_host = host.trim_start_matches('[').trim_end_matches(']');

        match tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect((address_host, port)),
        )
        .await
        {
            Ok(Ok(_stream)) => TestReport::passed(),
            Ok(Err(err)) => TestReport::failed(format!("connection to {host}:{port} failed: {err}")),
            Err(_) => TestReport::failed(format!(
                "connection to {host}:{port} timed out after {}ms",
                self.connect_timeout.as_millis()
            )),
        }
    }

    async fn probe_stdio(
        &self,
        command: &str,
        args: &[String],
        definition: &ConnectorDefinition,
    ) -> TestReport {
        let mut child = match Command::new(command)
            .args(args)
            .envs(definition.environment())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => return TestReport::failed(format!("failed to launch '{command}': {err}")),
        };

        let report = match tokio::time::timeout(self.handshake_timeout, handshake(&mut child)).await
        {
            Ok(report) => report,
            Err(_) => TestReport::failed(format!(
                "'{command}' did not answer initialize within {}ms",
                self.handshake_timeout.as_millis()
            )),
        };
        if let Err(err) = child.kill().await {
            warn!(program = command, error = %err, "failed to stop probed server");
        }
        report
    }
}

async fn handshake(child: &mut Child) -> TestReport {
    let (Some(mut stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        return TestReport::failed("server pipes unavailable");
    };

    let request = initialize_request();
    let mut line = request.to_string();
    line.push('\n');
    if let Err(err) = stdin.write_all(line.as_bytes()).await {
        return TestReport::failed(format!("failed to send initialize: {err}"));
    }
    if let Err(err) = stdin.flush().await {
        return TestReport::failed(format!("failed to send initialize: {err}"));
    }

    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(text)) => {
                if let Some(report) = interpret_response(&text) {
                    return report;
                }
            }
            Ok(None) => return TestReport::failed("server exited before answering initialize"),
            Err(err) => return TestReport::failed(format!("failed to read server output: {err}")),
        }
    }
}

fn initialize_request() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": INITIALIZE_REQUEST_ID,
        "method": "initialize",
        "params": {
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
        },
    })
}

/// Interprets one line of server output; `None` when it is not the
/// `initialize` response.
fn interpret_response(line: &str) -> Option<TestReport> {
    let message: Value = serde_json::from_str(line.trim()).ok()?;
    if message.get("id").and_then(Value::as_u64) != Some(INITIALIZE_REQUEST_ID) {
        return None;
    }
    if message.get("result").is_some() {
        return Some(TestReport::passed());
    }
    let detail = message
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("malformed initialize response");
    Some(TestReport::failed(format!("initialize rejected: {detail}")))
}
