//! Google Cloud REST client implementing the service seams.
//!
//! [`GcpClient`] talks to the AutoML v1 API and the Cloud Storage JSON API
//! with bearer tokens from a [`TokenSource`]. Long-running operations are
//! polled until they report `done`.

mod auth;
mod automl;
mod error;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::trace;

pub use auth::{AdcTokenSource, CLOUD_PLATFORM_SCOPE, StaticToken, TokenSource};
pub use error::GcpError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Default delay between operation polls.
pub const DEFAULT_OPERATION_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default upper bound on waiting for a long-running operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Base URLs of the APIs used by the client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoints {
    /// AutoML API root, without the version segment.
    pub automl: String,
    /// Cloud Storage API root.
    pub storage: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            automl: String::from("https://automl.googleapis.com"),
            storage: String::from("https://storage.googleapis.com"),
        }
    }
}

impl Endpoints {
    /// Routes both APIs to the same root, as a local emulator or mock does.
    #[must_use]
    pub fn single(root: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            automl: root.clone(),
            storage: root,
        }
    }
}

/// REST client for AutoML and Cloud Storage.
#[derive(Clone)]
pub struct GcpClient {
    http: Client,
    token: Arc<dyn TokenSource>,
    endpoints: Endpoints,
    poll_interval: Duration,
    operation_timeout: Duration,
}

impl GcpClient {
    /// Builds a client that authenticates with Application Default
    /// Credentials against the public endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::Auth`] when no credentials are available, or
    /// [`GcpError::Http`] when the HTTP client cannot be built.
    pub async fn from_adc() -> Result<Self, GcpError> {
        let token = AdcTokenSource::discover().await?;
        Self::with_token_source(Arc::new(token), Endpoints::default())
    }

    /// Builds a client with an explicit token source and endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::Http`] when the HTTP client cannot be built.
    pub fn with_token_source(
        token: Arc<dyn TokenSource>,
        endpoints: Endpoints,
    ) -> Result<Self, GcpError> {
        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            token,
            endpoints,
            poll_interval: DEFAULT_OPERATION_POLL_INTERVAL,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        })
    }

    /// Overrides the delay between long-running operation polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Overrides how long to wait for a long-running operation.
    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    fn automl_url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.endpoints.automl.trim_end_matches('/'))
    }

    fn storage_url<'s>(
        &self,
        segments: impl IntoIterator<Item = &'s str>,
    ) -> Result<Url, GcpError> {
        let invalid = |message: String| GcpError::Endpoint {
            endpoint: self.endpoints.storage.clone(),
            message,
        };
        let mut url = Url::parse(&self.endpoints.storage).map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid(String::from("endpoint cannot carry a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn authorised(&self, request: RequestBuilder) -> Result<RequestBuilder, GcpError> {
        let token = self.token.token().await?;
        Ok(request.bearer_auth(token))
    }

    /// Sends `request` and returns the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, GcpError> {
        let response = self.authorised(request).await?.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let body = response.text().await?;
        trace!(%url, status = status.as_u16(), "received response");
        if !status.is_success() {
            return Err(GcpError::Api {
                status: status.as_u16(),
                message: error::error_message(&body),
            });
        }
        Ok(body)
    }

    async fn send_json<T>(&self, request: RequestBuilder, resource: &str) -> Result<T, GcpError>
    where
        T: DeserializeOwned,
    {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|err| GcpError::Decode {
            resource: resource.to_owned(),
            message: err.to_string(),
        })
    }
}
