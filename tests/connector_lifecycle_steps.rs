//! Behaviour tests for connector lifecycle scenarios.

#[path = "connector_lifecycle_steps/mod.rs"]
mod connector_lifecycle_steps_defs;

use connector_lifecycle_steps_defs::world::{ConnectorLifecycleWorld, world};
use rstest_bdd_macros::scenario;

#[scenario(
    path = "tests/features/connector_lifecycle.feature",
    name = "Deploy a stdio connector and record a failed redeploy"
)]
#[tokio::test(flavor = "multi_thread")]
async fn deploy_then_failed_redeploy(world: ConnectorLifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/connector_lifecycle.feature",
    name = "An edit made while a test runs is kept"
)]
#[tokio::test(flavor = "multi_thread")]
async fn edit_during_test_is_kept(world: ConnectorLifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/connector_lifecycle.feature",
    name = "Reject an sse connector with an invalid URL"
)]
#[tokio::test(flavor = "multi_thread")]
async fn reject_invalid_url(world: ConnectorLifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/connector_lifecycle.feature",
    name = "Deleting an unknown connector reports not found"
)]
#[tokio::test(flavor = "multi_thread")]
async fn delete_unknown_connector(world: ConnectorLifecycleWorld) {
    let _ = world;
}
