//! Overlapping operations, cancellation and deletion while operations run.

use super::helpers::{Harness, harness, session, sse_config, stdio_config, wait_until_idle};
use portico::connector::{
    domain::{ConnectorStatus, FailureKind, OperationKind, Session},
    services::ConnectorLifecycleError,
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn edit_during_test_survives_resolution(harness: Harness) -> Result<(), eyre::Report> {
    let created = harness.service.create(stdio_config("d")).await?;
    harness.driver.hold();

    let handle = harness.service.start_test(created.id()).await?;
    eyre::ensure!(handle.started().status() == ConnectorStatus::Testing);
    let observed = harness.service.get(created.id()).await?;
    eyre::ensure!(observed.status() == ConnectorStatus::Testing);

    harness
        .service
        .update(created.id(), stdio_config("edited while testing"))
        .await?;
    harness.driver.release();
    let resolved = handle.wait().await?;

    eyre::ensure!(
        resolved.definition().description() == "edited while testing",
        "edit was overwritten: {:?}",
        resolved.definition().description()
    );
    let stored = harness.service.get(created.id()).await?;
    eyre::ensure!(stored.definition().description() == "edited while testing");
    eyre::ensure!(stored.status() != ConnectorStatus::Testing);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_deploy_while_first_outstanding_is_rejected(
    harness: Harness,
    session: Session,
) -> Result<(), eyre::Report> {
    let created = harness.service.create(stdio_config("d")).await?;
    harness.driver.hold();

    let first = harness.service.start_deploy(created.id(), &session).await?;
    let second = harness.service.start_deploy(created.id(), &session).await;
    let overlapping_test = harness.service.start_test(created.id()).await;

    eyre::ensure!(
        matches!(
            second,
            Err(ConnectorLifecycleError::OperationInProgress {
                active: OperationKind::Deploy,
                ..
            })
        ),
        "expected OperationInProgress, got {second:?}"
    );
    eyre::ensure!(matches!(
        overlapping_test,
        Err(ConnectorLifecycleError::OperationInProgress { .. })
    ));
    eyre::ensure!(harness.service.active_operation(created.id()) == Some(OperationKind::Deploy));

    harness.driver.release();
    let resolved = first.wait().await?;
    eyre::ensure!(resolved.status() == ConnectorStatus::Deployed);
    wait_until_idle(&harness.service, created.id()).await?;
    eyre::ensure!(harness.driver.calls().len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn operations_on_different_connectors_run_concurrently(
    harness: Harness,
    session: Session,
) -> Result<(), eyre::Report> {
    let alpha = harness.service.create(sse_config("alpha")).await?;
    let beta = harness.service.create(sse_config("beta")).await?;
    harness.driver.hold();

    let alpha_deploy = harness.service.start_deploy(alpha.id(), &session).await?;
    let beta_test = harness.service.start_test(beta.id()).await?;
    harness.driver.release();
    let (deployed, tested) = tokio::join!(alpha_deploy.wait(), beta_test.wait());

    eyre::ensure!(deployed?.status() == ConnectorStatus::Deployed);
    eyre::ensure!(tested?.status() == ConnectorStatus::Deployed);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelling_handle_resolves_to_error(harness: Harness) -> Result<(), eyre::Report> {
    let created = harness.service.create(sse_config("weather")).await?;
    harness.driver.hold();

    let handle = harness.service.start_test(created.id()).await?;
    handle.cancel();
    let resolved = handle.wait().await?;

    eyre::ensure!(resolved.status() == ConnectorStatus::Error);
    eyre::ensure!(
        resolved.diagnostic().map(|diagnostic| diagnostic.kind()) == Some(FailureKind::Cancelled)
    );
    wait_until_idle(&harness.service, created.id()).await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dropping_handle_cancels_and_releases_connector(
    harness: Harness,
) -> Result<(), eyre::Report> {
    let created = harness.service.create(sse_config("weather")).await?;
    harness.driver.hold();

    let handle = harness.service.start_test(created.id()).await?;
    drop(handle);
    wait_until_idle(&harness.service, created.id()).await?;

    let stored = harness.service.get(created.id()).await?;
    eyre::ensure!(stored.status() == ConnectorStatus::Error);
    eyre::ensure!(
        stored.diagnostic().map(|diagnostic| diagnostic.kind()) == Some(FailureKind::Cancelled)
    );

    harness.driver.release();
    let retested = harness.service.test(created.id()).await?;
    eyre::ensure!(retested.status() == ConnectorStatus::Deployed);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_during_deploy_discards_result(
    harness: Harness,
    session: Session,
) -> Result<(), eyre::Report> {
    let created = harness.service.create(stdio_config("d")).await?;
    harness.driver.hold();

    let handle = harness.service.start_deploy(created.id(), &session).await?;
    let removed = harness.service.delete(created.id()).await?;
    let resolved = handle.wait().await;

    eyre::ensure!(removed.id() == created.id());
    eyre::ensure!(
        matches!(resolved, Err(ConnectorLifecycleError::NotFound(id)) if id == created.id()),
        "expected NotFound, got {resolved:?}"
    );
    eyre::ensure!(harness.service.list().await?.is_empty());
    wait_until_idle(&harness.service, created.id()).await?;
    Ok(())
}
