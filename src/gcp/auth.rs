//! Access token sources for the Google Cloud client.

use std::sync::Arc;

use crate::service::ServiceFuture;

use super::GcpError;

/// OAuth scope covering AutoML and Cloud Storage.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Supplies bearer tokens for API calls.
pub trait TokenSource: Send + Sync {
    /// Returns a valid access token.
    fn token(&self) -> ServiceFuture<'_, String, GcpError>;
}

/// Token source backed by Application Default Credentials.
///
/// Resolution follows `gcp_auth`: `GOOGLE_APPLICATION_CREDENTIALS`, then the
/// metadata server, then the local `gcloud` configuration.
pub struct AdcTokenSource {
    provider: Arc<dyn gcp_auth::TokenProvider>,
}

impl AdcTokenSource {
    /// Discovers credentials from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::Auth`] when no credentials can be found.
    pub async fn discover() -> Result<Self, GcpError> {
        let provider = gcp_auth::provider().await.map_err(|err| GcpError::Auth {
            message: err.to_string(),
        })?;
        Ok(Self { provider })
    }
}

impl TokenSource for AdcTokenSource {
    fn token(&self) -> ServiceFuture<'_, String, GcpError> {
        Box::pin(async move {
            let token = self
                .provider
                .token(&[CLOUD_PLATFORM_SCOPE])
                .await
                .map_err(|err| GcpError::Auth {
                    message: err.to_string(),
                })?;
            Ok(token.as_str().to_owned())
        })
    }
}

/// Fixed token, for tests and for tokens minted outside the process.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn token(&self) -> ServiceFuture<'_, String, GcpError> {
        Box::pin(async move { Ok(self.0.clone()) })
    }
}
