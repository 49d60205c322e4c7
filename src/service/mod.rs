//! Seams to the remote model and storage services.
//!
//! The harness never owns remote state. Everything it knows about a model or
//! a bucket comes back through these traits, which lets tests swap the Google
//! Cloud client for in-memory doubles.

mod resource;

use std::future::Future;
use std::pin::Pin;

pub use resource::{
    DeploymentState, GcsUri, LocationName, Model, ModelName, ResourceNameError, StorageEntry,
};

/// Future returned by service operations.
pub type ServiceFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Parameters for a batch prediction run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BatchPredictRequest {
    /// Input files (JSON lines) read by the service.
    pub input_uris: Vec<GcsUri>,
    /// Destination prefix under which the service writes its results.
    pub output_uri_prefix: GcsUri,
}

impl BatchPredictRequest {
    /// Starts a builder for a [`BatchPredictRequest`].
    #[must_use]
    pub fn builder() -> BatchPredictRequestBuilder {
        BatchPredictRequestBuilder::default()
    }
}

/// Builder for [`BatchPredictRequest`] that defers URI parsing to
/// construction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchPredictRequestBuilder {
    input_uris: Vec<String>,
    output_uri_prefix: String,
}

impl BatchPredictRequestBuilder {
    /// Adds an input URI.
    #[must_use]
    pub fn input_uri(mut self, value: impl Into<String>) -> Self {
        self.input_uris.push(value.into());
        self
    }

    /// Sets the output URI prefix.
    #[must_use]
    pub fn output_uri_prefix(mut self, value: impl Into<String>) -> Self {
        self.output_uri_prefix = value.into();
        self
    }

    /// Parses every URI and builds the request.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceNameError`] when no input is given or any URI is not
    /// a `gs://` URI.
    pub fn build(self) -> Result<BatchPredictRequest, ResourceNameError> {
        if self.input_uris.is_empty() {
            return Err(ResourceNameError::Blank {
                field: String::from("input_uris"),
            });
        }
        let input_uris = self
            .input_uris
            .iter()
            .map(|uri| GcsUri::parse(uri))
            .collect::<Result<Vec<_>, _>>()?;
        let output_uri_prefix = GcsUri::parse(&self.output_uri_prefix)?;
        Ok(BatchPredictRequest {
            input_uris,
            output_uri_prefix,
        })
    }
}

/// Remote model service (AutoML in production).
pub trait ModelService {
    /// Provider specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches the current snapshot of a model.
    fn get_model<'a>(&'a self, name: &'a ModelName) -> ServiceFuture<'a, Model, Self::Error>;

    /// Requests deployment and resolves once the remote operation completes.
    fn deploy_model<'a>(&'a self, name: &'a ModelName) -> ServiceFuture<'a, (), Self::Error>;

    /// Lists every model in a location matching `filter` (empty for all).
    fn list_models<'a>(
        &'a self,
        location: &'a LocationName,
        filter: &'a str,
    ) -> ServiceFuture<'a, Vec<Model>, Self::Error>;

    /// Starts a batch prediction and resolves once the remote operation
    /// completes.
    fn batch_predict<'a>(
        &'a self,
        name: &'a ModelName,
        request: &'a BatchPredictRequest,
    ) -> ServiceFuture<'a, (), Self::Error>;
}

/// Remote object store (Cloud Storage in production).
pub trait ObjectStore {
    /// Provider specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists the entries directly under `prefix`, following every page.
    ///
    /// Listing uses current-directory semantics: objects nested below the
    /// next `/` are folded into a single directory entry.
    fn list<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
    ) -> ServiceFuture<'a, Vec<StorageEntry>, Self::Error>;

    /// Deletes a single leaf object.
    fn delete<'a>(&'a self, entry: &'a StorageEntry) -> ServiceFuture<'a, (), Self::Error>;
}
