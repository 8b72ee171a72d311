//! Deployment driver backed by the platform command-line tool.

use super::ConnectorProbe;
use crate::connector::{
    domain::{ConnectorRecord, Session},
    ports::{DeployReceipt, DeploymentDriver, DriverError, DriverResult, TestReport},
};
use crate::platform::{ApiDefinition, PlatformCli, parse_connector_id};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Publishes connectors by generating an API definition file and invoking
/// `connector create` or `connector update`.
///
/// The driver keeps no state between calls; the platform identifier travels
/// on the record.
#[derive(Debug, Clone)]
pub struct CliDeploymentDriver {
    cli: PlatformCli,
    work_dir: Utf8PathBuf,
    probe: ConnectorProbe,
}

impl CliDeploymentDriver {
    /// Creates a driver writing definition files under `work_dir`.
    #[must_use]
    pub fn new(cli: PlatformCli, work_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            cli,
            work_dir: work_dir.into(),
            probe: ConnectorProbe::default(),
        }
    }

    /// Uses `probe` for connectivity tests.
    #[must_use]
    pub const fn with_probe(mut self, probe: ConnectorProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Returns the platform tool wrapper.
    #[must_use]
    pub const fn cli(&self) -> &PlatformCli {
        &self.cli
    }

    /// Returns the directory receiving generated definition files.
    #[must_use]
    pub fn work_dir(&self) -> &Utf8Path {
        &self.work_dir
    }

    /// Writes the record's API definition and returns its path.
    fn write_definition(&self, record: &ConnectorRecord) -> DriverResult<Utf8PathBuf> {
        let document = ApiDefinition::for_connector(record.definition())
            .to_pretty_json()
            .map_err(|err| DriverError::io(std::io::Error::other(err)))?;
        Dir::create_ambient_dir_all(&self.work_dir, ambient_authority()).map_err(DriverError::io)?;
        let dir =
            Dir::open_ambient_dir(&self.work_dir, ambient_authority()).map_err(DriverError::io)?;
        let file_name = format!("{}.swagger.json", record.id());
        dir.write(&file_name, document).map_err(DriverError::io)?;
        Ok(self.work_dir.join(file_name))
    }
}

#[async_trait]
impl DeploymentDriver for CliDeploymentDriver {
    async fn deploy(
        &self,
        record: &ConnectorRecord,
        session: &Session,
        cancel: CancellationToken,
    ) -> DriverResult<DeployReceipt> {
        let definition_file = self.write_definition(record)?;
        debug!(
            connector_id = %record.id(),
            definition_file = %definition_file,
            session_expires_at = %session.expires_at(),
            "deploying connector through platform tool"
        );

        let output = match record.published_id() {
            Some(published_id) => {
                self.cli
                    .update_connector(published_id, &definition_file, &cancel)
                    .await?
            }
            None => self.cli.create_connector(&definition_file, &cancel).await?,
        };

        let published_id = parse_connector_id(output.stdout())
            .or_else(|| record.published_id().map(str::to_owned));
        info!(
            connector_id = %record.id(),
            published_id = ?published_id,
            "platform accepted connector"
        );
        Ok(DeployReceipt {
            published_id,
            output: output.into_stdout(),
        })
    }

    async fn test(
        &self,
        record: &ConnectorRecord,
        cancel: CancellationToken,
    ) -> DriverResult<TestReport> {
        self.probe.probe(record.definition(), &cancel).await
    }

    async fn remove(
        &self,
        record: &ConnectorRecord,
        _session: &Session,
        cancel: CancellationToken,
    ) -> DriverResult<()> {
        let Some(published_id) = record.published_id() else {
            debug!(connector_id = %record.id(), "connector was never published; nothing to remove");
            return Ok(());
        };
        self.cli.delete_connector(published_id, &cancel).await?;
        info!(connector_id = %record.id(), published_id, "removed connector from platform");
        Ok(())
    }
}
