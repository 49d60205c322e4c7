//! BDD scenarios for the batch prediction harness.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ScenarioContext, scenario_context};

#[scenario(
    path = "tests/features/batch_predict.feature",
    name = "Deploy an undeployed model, predict, and clean up"
)]
fn scenario_deploy_predict_cleanup(scenario_context: ScenarioContext) {
    drop(scenario_context);
}

#[scenario(
    path = "tests/features/batch_predict.feature",
    name = "Leave a deployed model untouched"
)]
fn scenario_deployed_untouched(scenario_context: ScenarioContext) {
    drop(scenario_context);
}

#[scenario(
    path = "tests/features/batch_predict.feature",
    name = "Clean up after a failed prediction"
)]
fn scenario_cleanup_after_failure(scenario_context: ScenarioContext) {
    drop(scenario_context);
}

#[scenario(
    path = "tests/features/batch_predict.feature",
    name = "Skip the body when deployment fails"
)]
fn scenario_setup_failure(scenario_context: ScenarioContext) {
    drop(scenario_context);
}

#[scenario(
    path = "tests/features/batch_predict.feature",
    name = "Report a teardown failure after a successful run"
)]
fn scenario_teardown_failure(scenario_context: ScenarioContext) {
    drop(scenario_context);
}
