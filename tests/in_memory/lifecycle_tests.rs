//! End-to-end lifecycle flows against the in-memory store.

use super::helpers::{Harness, harness, session, sse_config, stdio_config};
use portico::connector::{
    adapters::ScriptedOutcome,
    domain::{ConnectorId, ConnectorStatus, Diagnostic, FailureKind, Session, TransportKind},
    ports::{ConnectorStore, DriverError},
    services::ConnectorLifecycleError,
};
use portico::process::{CapturedOutput, ProcessError};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn created_connector_starts_in_draft(harness: Harness) {
    let created = harness
        .service
        .create(stdio_config("d"))
        .await
        .expect("create should succeed");

    let fetched = harness
        .service
        .get(created.id())
        .await
        .expect("get should succeed");

    assert_eq!(fetched.status(), ConnectorStatus::Draft);
    assert_eq!(fetched.created_at(), fetched.updated_at());
    assert_eq!(fetched.definition().transport(), TransportKind::Stdio);
    assert_eq!(fetched.definition().connection().args(), ["server.js".to_owned()]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stdio_deploy_then_failed_redeploy_records_stderr(harness: Harness, session: Session) {
    let created = harness
        .service
        .create(stdio_config("d"))
        .await
        .expect("create should succeed");

    let deployed = harness
        .service
        .deploy(created.id(), &session)
        .await
        .expect("deploy should resolve");
    assert_eq!(deployed.status(), ConnectorStatus::Deployed);

    harness
        .driver
        .push_outcome(ScriptedOutcome::Fail(DriverError::Process(
            ProcessError::CommandFailed {
                program: "pac".to_owned(),
                exit_code: Some(1),
                output: CapturedOutput::new("", "bad config\n", false),
            },
        )));
    let failed = harness
        .service
        .deploy(created.id(), &session)
        .await
        .expect("redeploy should resolve");

    assert_eq!(failed.status(), ConnectorStatus::Error);
    let diagnostic = failed.diagnostic().expect("diagnostic should be recorded");
    assert_eq!(diagnostic.message(), "bad config");
    assert_eq!(diagnostic.kind(), FailureKind::CommandFailed);
    assert_eq!(failed.published_id(), deployed.published_id());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn editing_any_status_returns_to_draft(harness: Harness, session: Session) {
    let created = harness
        .service
        .create(stdio_config("d"))
        .await
        .expect("create should succeed");
    harness
        .service
        .deploy(created.id(), &session)
        .await
        .expect("deploy should resolve");

    let edited = harness
        .service
        .update(created.id(), stdio_config("new description"))
        .await
        .expect("update should succeed");

    assert_eq!(edited.status(), ConnectorStatus::Draft);
    assert_eq!(edited.definition().description(), "new description");
    assert!(edited.published_id().is_some());
    assert!(edited.updated_at() >= edited.created_at());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn edit_clears_previous_failure(harness: Harness) {
    let created = harness
        .service
        .create(sse_config("weather"))
        .await
        .expect("create should succeed");
    harness.driver.push_outcome(ScriptedOutcome::Fail(DriverError::Unreachable(
        "connection refused".to_owned(),
    )));
    let failed = harness
        .service
        .test(created.id())
        .await
        .expect("test should resolve");
    assert_eq!(
        failed.diagnostic().map(Diagnostic::message),
        Some("connection refused")
    );

    let edited = harness
        .service
        .update(created.id(), sse_config("weather"))
        .await
        .expect("update should succeed");

    assert_eq!(edited.status(), ConnectorStatus::Draft);
    assert!(edited.diagnostic().is_none());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_missing_connector_leaves_store_unchanged(harness: Harness) {
    let kept = harness
        .service
        .create(sse_config("kept"))
        .await
        .expect("create should succeed");
    let before = harness.store.list().await.expect("list should succeed");
    let missing = ConnectorId::new();

    let result = harness.service.delete(missing).await;

    assert!(matches!(result, Err(ConnectorLifecycleError::NotFound(id)) if id == missing));
    let after = harness.store.list().await.expect("list should succeed");
    assert_eq!(after, before);
    assert_eq!(after.first().map(|record| record.id()), Some(kept.id()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_returns_connectors_oldest_first(harness: Harness) {
    let first = harness
        .service
        .create(sse_config("alpha"))
        .await
        .expect("create should succeed");
    let second = harness
        .service
        .create(sse_config("beta"))
        .await
        .expect("create should succeed");

    let listed = harness.service.list().await.expect("list should succeed");

    let ids: Vec<_> = listed.iter().map(|record| record.id()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first.id()));
    assert!(ids.contains(&second.id()));
    assert!(
        listed
            .windows(2)
            .all(|pair| matches!(pair, [a, b] if a.created_at() <= b.created_at()))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn retire_removes_deployed_connector(harness: Harness, session: Session) {
    let created = harness
        .service
        .create(stdio_config("d"))
        .await
        .expect("create should succeed");
    harness
        .service
        .deploy(created.id(), &session)
        .await
        .expect("deploy should resolve");

    let retired = harness
        .service
        .retire(created.id(), &session)
        .await
        .expect("retire should resolve");

    assert_eq!(retired.id(), created.id());
    assert!(
        harness
            .store
            .get(created.id())
            .await
            .expect("get should succeed")
            .is_none()
    );
}
