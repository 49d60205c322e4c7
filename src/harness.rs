//! The batch prediction scenario wired from configuration.
//!
//! Setup deploys the model when needed, the body runs a batch prediction into
//! the output prefix, and teardown sweeps that prefix.

use std::time::Duration;

use crate::config::{ConfigError, HarnessConfig};
use crate::deploy::DeploymentGuard;
use crate::predict::{self, BATCH_PREDICT_BANNER};
use crate::scenario::{Scenario, TestOutcome};
use crate::service::{BatchPredictRequest, ModelName, ModelService, ObjectStore};
use crate::sweep::Sweeper;

/// Name reported for the batch prediction scenario.
pub const SCENARIO_NAME: &str = "batch_predict";

/// Batch prediction scenario against a model service and an object store.
#[derive(Debug)]
pub struct BatchPredictHarness<M, S> {
    guard: DeploymentGuard<M>,
    sweeper: Sweeper<S>,
    model: ModelName,
    request: BatchPredictRequest,
}

impl<M, S> BatchPredictHarness<M, S>
where
    M: ModelService,
    S: ObjectStore,
{
    /// Builds a harness for `model`; teardown sweeps the request's output
    /// prefix.
    pub const fn new(model: ModelName, request: BatchPredictRequest, service: M, store: S) -> Self {
        Self {
            guard: DeploymentGuard::new(service),
            sweeper: Sweeper::new(store),
            model,
            request,
        }
    }

    /// Builds the harness described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration is invalid.
    pub fn from_config(config: &HarnessConfig, service: M, store: S) -> Result<Self, ConfigError> {
        let harness = Self::new(
            config.model_name()?,
            config.batch_predict_request()?,
            service,
            store,
        );
        let max_depth = config.max_depth();
        Ok(harness.map_sweeper(|sweeper| sweeper.with_max_depth(max_depth)))
    }

    /// Overrides how often the deployment state is polled during a
    /// transition.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.guard = self.guard.with_poll_interval(interval);
        self
    }

    /// Overrides how long setup waits for a transition to settle.
    #[must_use]
    pub fn with_transition_timeout(mut self, timeout: Duration) -> Self {
        self.guard = self.guard.with_transition_timeout(timeout);
        self
    }

    fn map_sweeper(mut self, f: impl FnOnce(Sweeper<S>) -> Sweeper<S>) -> Self {
        self.sweeper = f(self.sweeper);
        self
    }

    /// Model exercised by the scenario.
    #[must_use]
    pub const fn model(&self) -> &ModelName {
        &self.model
    }

    /// Request sent by the scenario body.
    #[must_use]
    pub const fn request(&self) -> &BatchPredictRequest {
        &self.request
    }

    /// Runs the scenario once.
    pub async fn run(&self) -> TestOutcome {
        let output = &self.request.output_uri_prefix;
        Scenario::new(SCENARIO_NAME)
            .expect_output(BATCH_PREDICT_BANNER)
            .run(
                async { self.guard.ensure_deployed(&self.model).await.map(|_| ()) },
                |mut sink| async move {
                    predict::batch_predict(
                        self.guard.service(),
                        &self.model,
                        &self.request,
                        &mut sink,
                    )
                    .await
                },
                self.sweeper.sweep(&output.bucket, &output.path),
            )
            .await
    }
}
