//! When steps for connector lifecycle BDD scenarios.

use super::world::{ConnectorLifecycleWorld, run_async};
use eyre::WrapErr;
use portico::connector::domain::ConnectorId;
use rstest_bdd_macros::when;

#[when("the connector is created")]
fn connector_created(world: &mut ConnectorLifecycleWorld) -> Result<(), eyre::Report> {
    let config = world
        .pending_config
        .clone()
        .ok_or_else(|| eyre::eyre!("missing pending configuration in scenario world"))?;
    let result = run_async(world.service.create(config));
    if let Ok(ref created) = result {
        world.record = Some(created.clone());
    }
    world.last_result = Some(result);
    Ok(())
}

#[when("the connector is deployed")]
fn connector_deployed(world: &mut ConnectorLifecycleWorld) -> Result<(), eyre::Report> {
    let id = world.record()?.id();
    let resolved = run_async(world.service.deploy(id, &world.session))
        .wrap_err("deploy connector in scenario")?;
    world.record = Some(resolved);
    Ok(())
}

#[when("a test is started")]
fn test_started(world: &mut ConnectorLifecycleWorld) -> Result<(), eyre::Report> {
    let id = world.record()?.id();
    let handle = run_async(world.service.start_test(id)).wrap_err("start connector test")?;
    world.running = Some(handle);
    Ok(())
}

#[when(r#"the description is changed to "{description}""#)]
fn description_changed(
    world: &mut ConnectorLifecycleWorld,
    description: String,
) -> Result<(), eyre::Report> {
    let id = world.record()?.id();
    let mut config = world
        .pending_config
        .clone()
        .ok_or_else(|| eyre::eyre!("missing pending configuration in scenario world"))?;
    config.description = description;
    let edited = run_async(world.service.update(id, config)).wrap_err("edit connector")?;
    world.record = Some(edited);
    Ok(())
}

#[when("the deployment driver resumes")]
fn driver_resumes(world: &mut ConnectorLifecycleWorld) -> Result<(), eyre::Report> {
    world.driver.release();
    let handle = world
        .running
        .take()
        .ok_or_else(|| eyre::eyre!("no operation running in scenario world"))?;
    let resolved = run_async(handle.wait()).wrap_err("wait for running operation")?;
    world.record = Some(resolved);
    Ok(())
}

#[when("an unknown connector is deleted")]
fn unknown_connector_deleted(world: &mut ConnectorLifecycleWorld) {
    world.last_result = Some(run_async(world.service.delete(ConnectorId::new())));
}
