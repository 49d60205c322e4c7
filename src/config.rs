//! Configuration loading via `ortho-config`.

use std::env;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::service::{BatchPredictRequest, GcsUri, ModelName};
use crate::sweep::{DEFAULT_MAX_DEPTH, prefix_violation};

/// Environment variable naming the service account key used for
/// Application Default Credentials.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Suffix appended to the project id when no bucket is configured.
pub const DEFAULT_BUCKET_SUFFIX: &str = "-lcm";

/// Harness configuration derived from environment variables and
/// configuration files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "AUTOML")]
pub struct HarnessConfig {
    /// Project owning the model and the bucket. Required.
    pub project_id: String,
    /// Model exercised by the scenario. Required.
    pub model_id: String,
    /// Region hosting the model. Defaults to `us-central1`.
    #[ortho_config(default = "us-central1".to_owned())]
    pub region: String,
    /// Bucket holding scenario inputs and outputs. Defaults to
    /// `<project_id>-lcm`.
    pub bucket_id: Option<String>,
    /// Object holding the batch prediction input, relative to the bucket.
    #[ortho_config(default = "entity-extraction/input.jsonl".to_owned())]
    pub input_object: String,
    /// Prefix the scenario writes to and the sweeper cleans.
    #[ortho_config(default = "TEST_BATCH_PREDICT/".to_owned())]
    pub output_prefix: String,
    /// Directory levels the sweeper walks below the output prefix.
    pub sweep_max_depth: Option<usize>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl HarnessConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to the configuration file",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails, including when a
    /// required value is absent from every source.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("automl-harness")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::InvalidField`] when the output prefix would be
    /// refused by the sweeper.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.project_id,
            &FieldMetadata::new("AutoML project ID", "AUTOML_PROJECT_ID", "project_id"),
        )?;
        Self::require_field(
            &self.model_id,
            &FieldMetadata::new("model ID", "AUTOML_MODEL_ID", "model_id"),
        )?;
        Self::require_field(
            &self.region,
            &FieldMetadata::new("compute region", "AUTOML_REGION", "region"),
        )?;
        Self::require_field(
            &self.output_prefix,
            &FieldMetadata::new("output prefix", "AUTOML_OUTPUT_PREFIX", "output_prefix"),
        )?;
        if let Some(reason) = prefix_violation(&self.output_prefix) {
            return Err(ConfigError::InvalidField(format!(
                "output prefix '{}' is not sweepable ({reason}): set AUTOML_OUTPUT_PREFIX \
                 or output_prefix in the configuration file",
                self.output_prefix
            )));
        }
        Self::require_field(
            &self.input_object,
            &FieldMetadata::new("input object", "AUTOML_INPUT_OBJECT", "input_object"),
        )?;
        if let Some(bucket) = &self.bucket_id {
            Self::require_field(
                bucket,
                &FieldMetadata::new("bucket ID", "AUTOML_BUCKET_ID", "bucket_id"),
            )?;
        }
        Ok(())
    }

    /// Bucket used for inputs and outputs.
    #[must_use]
    pub fn bucket(&self) -> String {
        self.bucket_id.as_ref().map_or_else(
            || default_bucket(&self.project_id),
            |bucket| bucket.trim().to_owned(),
        )
    }

    /// Depth bound applied by the sweeper.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.sweep_max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }

    /// Fully-qualified name of the configured model.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails or the identifiers do
    /// not form a valid name.
    pub fn model_name(&self) -> Result<ModelName, ConfigError> {
        self.validate()?;
        ModelName::new(&self.project_id, &self.region, &self.model_id)
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// `gs://` URI of the batch prediction input.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the bucket is malformed.
    pub fn input_uri(&self) -> Result<GcsUri, ConfigError> {
        GcsUri::new(self.bucket(), &self.input_object)
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// `gs://` URI of the batch prediction output prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the bucket is malformed.
    pub fn output_uri(&self) -> Result<GcsUri, ConfigError> {
        GcsUri::new(self.bucket(), &self.output_prefix)
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Batch prediction request reading the input object and writing below
    /// the output prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when either URI is malformed.
    pub fn batch_predict_request(&self) -> Result<BatchPredictRequest, ConfigError> {
        Ok(BatchPredictRequest {
            input_uris: vec![self.input_uri()?],
            output_uri_prefix: self.output_uri()?,
        })
    }
}

/// Bucket used when none is configured: `<project_id>-lcm`.
#[must_use]
pub fn default_bucket(project_id: &str) -> String {
    format!("{}{DEFAULT_BUCKET_SUFFIX}", project_id.trim())
}

/// Fails unless `name` is set to a non-blank value.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnvironment`] when the variable is unset or
/// blank.
pub fn require_env_var(name: &str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvironment(name.to_owned()))
}

/// Fails unless Application Default Credentials point at a key file.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnvironment`] when
/// `GOOGLE_APPLICATION_CREDENTIALS` is unset or blank.
pub fn require_credentials() -> Result<(), ConfigError> {
    require_env_var(CREDENTIALS_ENV).map(|_| ())
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration field holds an unusable value.
    #[error("invalid configuration field: {0}")]
    InvalidField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Indicates a required environment variable is not set.
    #[error("environment variable '{0}' is required to run scenarios")]
    MissingEnvironment(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
