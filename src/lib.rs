//! Core library for the AutoML scenario harness.
//!
//! The crate runs integration scenarios against a managed model service and
//! its object store: a deployment guard makes sure the model can serve, the
//! scenario body writes into a namespaced storage prefix, and a sweeper
//! removes everything below that prefix afterwards. Remote services sit
//! behind the [`ModelService`] and [`ObjectStore`] traits; [`GcpClient`]
//! implements both against Google Cloud.

pub mod config;
pub mod deploy;
pub mod gcp;
pub mod harness;
pub mod logging;
pub mod predict;
pub mod scenario;
pub mod service;
pub mod sweep;
pub mod test_support;

pub use config::{ConfigError, HarnessConfig};
pub use deploy::{DeployError, DeployOutcome, DeploymentGuard};
pub use gcp::{Endpoints, GcpClient, GcpError};
pub use harness::BatchPredictHarness;
pub use logging::{LogFormat, LoggingError, init_tracing};
pub use predict::{BATCH_PREDICT_BANNER, PredictError};
pub use scenario::{OutputSink, Scenario, ScenarioError, TestOutcome};
pub use service::{
    BatchPredictRequest, DeploymentState, GcsUri, LocationName, Model, ModelName, ModelService,
    ObjectStore, ResourceNameError, StorageEntry,
};
pub use sweep::{SweepError, SweepSummary, Sweeper};
