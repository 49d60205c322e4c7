//! Precondition enforcement: make sure a model is deployed before a scenario
//! runs.
//!
//! The guard reads the model's deployment state and only mutates it when the
//! model is undeployed. A model that is mid-transition is polled until it
//! settles; no deploy request is issued while it is observed transitioning.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::service::{DeploymentState, ModelName, ModelService};

/// Interval between state checks while a model is transitioning.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Upper bound on how long a transitioning model is awaited.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Errors surfaced while enforcing the deployed precondition.
#[derive(Debug, Error)]
pub enum DeployError<ServiceError>
where
    ServiceError: std::error::Error + 'static,
{
    /// Raised when the model snapshot cannot be fetched.
    #[error("failed to fetch model {model}: {source}")]
    Fetch {
        /// Model being checked.
        model: String,
        /// Provider-specific error.
        #[source]
        source: ServiceError,
    },
    /// Raised when the deploy request or its operation fails.
    #[error("failed to deploy model {model}: {source}")]
    Deploy {
        /// Model being deployed.
        model: String,
        /// Provider-specific error.
        #[source]
        source: ServiceError,
    },
    /// Raised when a transitioning model does not settle in time.
    #[error("model {model} still transitioning after {waited_secs} seconds")]
    TransitionTimeout {
        /// Model being awaited.
        model: String,
        /// Seconds spent polling.
        waited_secs: u64,
    },
}

/// What the guard had to do to satisfy the precondition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeployOutcome {
    /// The model was already deployed; nothing was mutated.
    AlreadyDeployed,
    /// A deploy request was issued and completed.
    Deployed,
    /// The model was transitioning and settled as deployed.
    AwaitedTransition,
}

/// Ensures models are deployed using the provided service.
#[derive(Clone, Debug)]
pub struct DeploymentGuard<S> {
    service: S,
    poll_interval: Duration,
    transition_timeout: Duration,
}

impl<S> DeploymentGuard<S>
where
    S: ModelService,
{
    /// Creates a guard with the default polling policy.
    #[must_use]
    pub const fn new(service: S) -> Self {
        Self {
            service,
            poll_interval: DEFAULT_POLL_INTERVAL,
            transition_timeout: DEFAULT_TRANSITION_TIMEOUT,
        }
    }

    /// Overrides the interval between state checks for transitioning models.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides how long a transitioning model is awaited.
    #[must_use]
    pub const fn with_transition_timeout(mut self, timeout: Duration) -> Self {
        self.transition_timeout = timeout;
        self
    }

    /// Returns the underlying service.
    #[must_use]
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Makes sure `name` is deployed, deploying it when it is undeployed.
    ///
    /// A deployed model costs one fetch and nothing else. An undeployed model
    /// gets exactly one deploy request, awaited until the remote operation
    /// completes. Failures are not retried.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError`] when the fetch or deploy call fails, or when a
    /// transitioning model does not settle before the transition timeout.
    pub async fn ensure_deployed(
        &self,
        name: &ModelName,
    ) -> Result<DeployOutcome, DeployError<S::Error>> {
        match self.fetch_state(name).await? {
            DeploymentState::Deployed => {
                debug!(model = %name, "model already deployed");
                Ok(DeployOutcome::AlreadyDeployed)
            }
            DeploymentState::Undeployed => {
                self.deploy(name).await?;
                Ok(DeployOutcome::Deployed)
            }
            DeploymentState::Deploying => {
                info!(model = %name, "model is transitioning, waiting for it to settle");
                if self.await_transition(name).await? == DeploymentState::Deployed {
                    return Ok(DeployOutcome::AwaitedTransition);
                }
                self.deploy(name).await?;
                Ok(DeployOutcome::Deployed)
            }
        }
    }

    async fn fetch_state(
        &self,
        name: &ModelName,
    ) -> Result<DeploymentState, DeployError<S::Error>> {
        let model = self
            .service
            .get_model(name)
            .await
            .map_err(|source| DeployError::Fetch {
                model: name.to_string(),
                source,
            })?;
        Ok(model.deployment_state)
    }

    async fn deploy(&self, name: &ModelName) -> Result<(), DeployError<S::Error>> {
        info!(model = %name, "model undeployed, issuing deploy request");
        self.service
            .deploy_model(name)
            .await
            .map_err(|source| DeployError::Deploy {
                model: name.to_string(),
                source,
            })?;
        info!(model = %name, "model deployed");
        Ok(())
    }

    async fn await_transition(
        &self,
        name: &ModelName,
    ) -> Result<DeploymentState, DeployError<S::Error>> {
        let deadline = Instant::now() + self.transition_timeout;
        while Instant::now() <= deadline {
            sleep(self.poll_interval).await;
            let state = self.fetch_state(name).await?;
            if state != DeploymentState::Deploying {
                debug!(model = %name, %state, "model settled");
                return Ok(state);
            }
        }

        Err(DeployError::TransitionTimeout {
            model: name.to_string(),
            waited_secs: self.transition_timeout.as_secs(),
        })
    }
}
