//! Then steps for connector lifecycle BDD scenarios.

use super::world::{ConnectorLifecycleWorld, run_async};
use portico::connector::{
    domain::{ConnectorStatus, Diagnostic, Violation},
    services::ConnectorLifecycleError,
};
use rstest_bdd_macros::then;

#[then(r#"the connector status is "{status}""#)]
fn connector_status_is(world: &ConnectorLifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = ConnectorStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let record = world.record()?;

    if record.status() != expected {
        return Err(eyre::eyre!(
            "expected status {}, found {}",
            expected.as_str(),
            record.status().as_str()
        ));
    }
    Ok(())
}

#[then(r#"the diagnostic reads "{message}""#)]
fn diagnostic_reads(world: &ConnectorLifecycleWorld, message: String) -> Result<(), eyre::Report> {
    let actual = world.record()?.diagnostic().map(Diagnostic::message);
    eyre::ensure!(
        actual == Some(message.as_str()),
        "expected diagnostic {message:?}, found {actual:?}"
    );
    Ok(())
}

#[then(r#"the connector description is "{description}""#)]
fn connector_description_is(
    world: &ConnectorLifecycleWorld,
    description: String,
) -> Result<(), eyre::Report> {
    let id = world.record()?.id();
    let stored = run_async(world.service.get(id))?;
    eyre::ensure!(
        stored.definition().description() == description,
        "expected description {description:?}, found {:?}",
        stored.definition().description()
    );
    Ok(())
}

#[then("creation fails with an invalid URL violation")]
fn creation_fails_with_invalid_url(world: &ConnectorLifecycleWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing create result"))?;

    let Err(ConnectorLifecycleError::Validation(error)) = result else {
        return Err(eyre::eyre!("expected validation error, got {result:?}"));
    };
    eyre::ensure!(
        error
            .violations()
            .iter()
            .any(|violation| matches!(violation, Violation::InvalidUrl { .. })),
        "expected an invalid URL violation, got {error}"
    );
    Ok(())
}

#[then("the deletion fails with not found")]
fn deletion_fails_with_not_found(world: &ConnectorLifecycleWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing delete result"))?;

    if !matches!(result, Err(ConnectorLifecycleError::NotFound(_))) {
        return Err(eyre::eyre!("expected NotFound error, got {result:?}"));
    }
    Ok(())
}

#[then("no connectors are stored")]
fn no_connectors_stored(world: &ConnectorLifecycleWorld) -> Result<(), eyre::Report> {
    let stored = run_async(world.service.list())?;
    eyre::ensure!(stored.is_empty(), "expected no connectors, found {}", stored.len());
    Ok(())
}

#[then("{count:usize} connector is stored")]
fn connectors_stored(world: &ConnectorLifecycleWorld, count: usize) -> Result<(), eyre::Report> {
    let stored = run_async(world.service.list())?;
    eyre::ensure!(
        stored.len() == count,
        "expected {count} connectors, found {}",
        stored.len()
    );
    Ok(())
}
