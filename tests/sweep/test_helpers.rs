//! Shared fixtures and helpers for sweeper BDD scenarios.

use automl_harness::SweepSummary;
use automl_harness::test_support::InMemoryObjectStore;
use rstest::fixture;

pub const BUCKET: &str = "p-lcm";

#[derive(Clone, Debug)]
pub enum SweepOutcome {
    Success(SweepSummary),
    Failure(String),
}

#[derive(Clone, Debug)]
pub struct SweepContext {
    pub store: InMemoryObjectStore,
    pub outcome: Option<SweepOutcome>,
}

#[fixture]
pub fn sweep_context() -> SweepContext {
    let store = InMemoryObjectStore::new();
    store.insert(BUCKET, "entity-extraction/input.jsonl");
    SweepContext {
        store,
        outcome: None,
    }
}

/// Objects written by a batch prediction run, relative to its prefix.
pub const NESTED_OUTPUTS: [&str; 4] = [
    "top.jsonl",
    "a/mid.jsonl",
    "a/b/deep.jsonl",
    "a/b/c/deepest.jsonl",
];
