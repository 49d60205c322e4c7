//! BDD step definitions for the batch prediction scenario.

use automl_harness::DeploymentState;
use automl_harness::test_support::ScriptedModelService;
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{BUCKET, Phase, RunSummary, ScenarioContext, build_harness};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("an undeployed model")]
fn undeployed_model(mut scenario_context: ScenarioContext) -> ScenarioContext {
    scenario_context.service = ScriptedModelService::with_state(DeploymentState::Undeployed);
    scenario_context
}

#[given("a deployed model")]
fn deployed_model(mut scenario_context: ScenarioContext) -> ScenarioContext {
    scenario_context.service = ScriptedModelService::with_state(DeploymentState::Deployed);
    scenario_context
}

#[given("batch prediction writes \"{first}\" and \"{second}\"")]
fn prediction_writes(
    scenario_context: ScenarioContext,
    first: String,
    second: String,
) -> ScenarioContext {
    scenario_context.service.write_results_to(
        scenario_context.store.clone(),
        &[first.trim(), second.trim()],
    );
    scenario_context
}

#[given("a stale object \"{name}\"")]
fn stale_object(scenario_context: ScenarioContext, name: String) -> ScenarioContext {
    scenario_context.store.insert(BUCKET, name.trim());
    scenario_context
}

#[given("batch prediction fails")]
fn prediction_fails(scenario_context: ScenarioContext) -> ScenarioContext {
    scenario_context.service.fail_on_predict();
    scenario_context
}

#[given("deployment fails")]
fn deployment_fails(scenario_context: ScenarioContext) -> ScenarioContext {
    scenario_context.service.fail_on_deploy();
    scenario_context
}

#[given("deleting \"{name}\" fails")]
fn deleting_fails(scenario_context: ScenarioContext, name: String) -> ScenarioContext {
    scenario_context.store.fail_delete_on(name.trim());
    scenario_context
}

#[when("I run the batch prediction scenario")]
fn run_scenario(mut scenario_context: ScenarioContext) -> Result<ScenarioContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let harness = build_harness(&scenario_context);
    let outcome = runtime.block_on(async { harness.run().await });
    scenario_context.outcome = Some(RunSummary {
        failure: outcome
            .failure
            .as_ref()
            .map(|err| (Phase::of(err), err.to_string())),
        output: outcome.output,
    });
    Ok(scenario_context)
}

fn summary(scenario_context: &ScenarioContext) -> Result<&RunSummary, StepError> {
    scenario_context
        .outcome
        .as_ref()
        .ok_or_else(|| StepError::Assertion(String::from("scenario did not run")))
}

#[then("the scenario passes")]
fn scenario_passes(scenario_context: &ScenarioContext) -> Result<(), StepError> {
    match &summary(scenario_context)?.failure {
        None => Ok(()),
        Some((phase, message)) => Err(StepError::Assertion(format!(
            "expected success, got {phase:?} failure: {message}"
        ))),
    }
}

#[then("the scenario fails during \"{phase}\"")]
fn scenario_fails_during(
    scenario_context: &ScenarioContext,
    phase: String,
) -> Result<(), StepError> {
    let expected = Phase::parse(phase.trim())
        .ok_or_else(|| StepError::Assertion(format!("unknown phase {phase}")))?;
    match &summary(scenario_context)?.failure {
        Some((actual, _)) if *actual == expected => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a {expected:?} failure, got {other:?}"
        ))),
    }
}

#[then("the model was deployed \"{count}\" times")]
fn deployed_times(scenario_context: &ScenarioContext, count: u32) -> Result<(), StepError> {
    let calls = scenario_context.service.deploy_calls();
    if calls == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} deploy calls, got {calls}"
        )))
    }
}

#[then("the captured output contains \"{needle}\"")]
fn output_contains(scenario_context: &ScenarioContext, needle: String) -> Result<(), StepError> {
    let output = &summary(scenario_context)?.output;
    if output.contains(needle.trim()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected output to contain {needle:?}, got {output:?}"
        )))
    }
}

#[then("nothing remains below \"{prefix}\"")]
fn nothing_remains(scenario_context: &ScenarioContext, prefix: String) -> Result<(), StepError> {
    let leftovers: Vec<_> = scenario_context
        .store
        .objects(BUCKET)
        .into_iter()
        .filter(|name| name.starts_with(prefix.trim()))
        .collect();
    if leftovers.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected an empty prefix, found {leftovers:?}"
        )))
    }
}

#[then("no batch prediction was requested")]
fn no_prediction(scenario_context: &ScenarioContext) -> Result<(), StepError> {
    let calls = scenario_context.service.predict_calls();
    if calls == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no prediction, got {calls} calls"
        )))
    }
}
