//! Given steps for connector lifecycle BDD scenarios.

use super::world::{ConnectorLifecycleWorld, run_async};
use eyre::WrapErr;
use portico::connector::{
    adapters::ScriptedOutcome,
    domain::{ConnectorConfig, TransportKind},
    ports::DriverError,
};
use portico::process::{CapturedOutput, ProcessError};
use rstest_bdd_macros::given;

#[given(r#"a stdio connector "{name}" launched with "{command}" "{argument}""#)]
fn stdio_connector(
    world: &mut ConnectorLifecycleWorld,
    name: String,
    command: String,
    argument: String,
) -> Result<(), eyre::Report> {
    let config = ConnectorConfig::new(name.clone(), name.to_uppercase(), "d", TransportKind::Stdio)
        .with_command(command, [argument]);
    let created = run_async(world.service.create(config.clone()))
        .wrap_err("create stdio connector for scenario")?;
    world.pending_config = Some(config);
    world.record = Some(created);
    Ok(())
}

#[given(r#"an sse connector "{name}" at "{url}""#)]
fn sse_connector(world: &mut ConnectorLifecycleWorld, name: String, url: String) {
    world.pending_config = Some(
        ConnectorConfig::new(name.clone(), name.to_uppercase(), "Forecasts", TransportKind::Sse)
            .with_url(url),
    );
}

#[given(r#"the platform tool will fail with "{stderr}""#)]
fn platform_tool_fails(world: &mut ConnectorLifecycleWorld, stderr: String) {
    world
        .driver
        .push_outcome(ScriptedOutcome::Fail(DriverError::Process(
            ProcessError::CommandFailed {
                program: "pac".to_owned(),
                exit_code: Some(1),
                output: CapturedOutput::new("", stderr, false),
            },
        )));
}

#[given("the deployment driver is paused")]
fn driver_paused(world: &mut ConnectorLifecycleWorld) {
    world.driver.hold();
}
