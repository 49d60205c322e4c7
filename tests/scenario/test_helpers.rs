//! Shared fixtures and helpers for batch prediction scenarios.

use std::time::Duration;

use automl_harness::test_support::{InMemoryObjectStore, ScriptedModelService};
use automl_harness::{BatchPredictHarness, HarnessConfig, ScenarioError};
use rstest::fixture;

pub const BUCKET: &str = "p-lcm";
pub const INPUT_OBJECT: &str = "entity-extraction/input.jsonl";

/// Phase a scenario failed in, as named by the feature files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Setup,
    Action,
    Teardown,
    Assertion,
}

impl Phase {
    pub fn of(error: &ScenarioError) -> Self {
        match error {
            ScenarioError::Setup { .. } => Self::Setup,
            ScenarioError::Action { .. } => Self::Action,
            ScenarioError::Teardown { .. } => Self::Teardown,
            ScenarioError::Assertion { .. } => Self::Assertion,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "setup" => Some(Self::Setup),
            "action" => Some(Self::Action),
            "teardown" => Some(Self::Teardown),
            "assertion" => Some(Self::Assertion),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub output: String,
    pub failure: Option<(Phase, String)>,
}

#[derive(Clone, Debug)]
pub struct ScenarioContext {
    pub service: ScriptedModelService,
    pub store: InMemoryObjectStore,
    pub outcome: Option<RunSummary>,
}

#[fixture]
pub fn scenario_context() -> ScenarioContext {
    let store = InMemoryObjectStore::new();
    store.insert(BUCKET, INPUT_OBJECT);
    ScenarioContext {
        service: ScriptedModelService::default(),
        store,
        outcome: None,
    }
}

pub fn harness_config() -> HarnessConfig {
    HarnessConfig {
        project_id: String::from("p"),
        model_id: String::from("m"),
        region: String::from("us-central1"),
        bucket_id: None,
        input_object: String::from(INPUT_OBJECT),
        output_prefix: String::from("TEST_BATCH_PREDICT/"),
        sweep_max_depth: None,
    }
}

pub fn build_harness(
    context: &ScenarioContext,
) -> BatchPredictHarness<ScriptedModelService, InMemoryObjectStore> {
    BatchPredictHarness::from_config(
        &harness_config(),
        context.service.clone(),
        context.store.clone(),
    )
    .unwrap_or_else(|err| panic!("harness configuration should be valid: {err}"))
    .with_poll_interval(Duration::from_millis(1))
    .with_transition_timeout(Duration::from_millis(50))
}
