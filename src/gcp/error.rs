//! Error types for the Google Cloud client.

use serde::Deserialize;
use thiserror::Error;

/// Errors raised by the Google Cloud client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum GcpError {
    /// Raised when no access token can be obtained.
    #[error("authentication failed: {message}")]
    Auth {
        /// Message returned by the credential provider.
        message: String,
    },
    /// Raised when the HTTP exchange itself fails.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Transport error message.
        message: String,
    },
    /// Raised when the API answers with a non-success status.
    #[error("API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the Google error envelope, or the raw body.
        message: String,
    },
    /// Raised when a response body does not match the expected shape.
    #[error("failed to decode {resource} response: {message}")]
    Decode {
        /// Resource being decoded (for example `model`).
        resource: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when a long-running operation completes with an error.
    #[error("operation {name} failed with code {code}: {message}")]
    Operation {
        /// Operation resource name.
        name: String,
        /// Google RPC status code.
        code: i32,
        /// Status message.
        message: String,
    },
    /// Raised when a long-running operation does not finish in time.
    #[error("timeout waiting for operation {name}")]
    Timeout {
        /// Operation resource name.
        name: String,
    },
    /// Raised when an endpoint URL cannot be built.
    #[error("invalid endpoint {endpoint}: {message}")]
    Endpoint {
        /// Endpoint that failed to parse.
        endpoint: String,
        /// Parser message.
        message: String,
    },
}

impl From<reqwest::Error> for GcpError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http {
            message: value.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: String,
}

/// Extracts `STATUS: message` from a Google error envelope, falling back to
/// the trimmed body.
pub(super) fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error:
                ErrorBody {
                    status: Some(status),
                    message,
                },
        }) => format!("{status}: {message}"),
        Ok(ErrorEnvelope { error }) => error.message,
        Err(_) => body.trim().to_owned(),
    }
}
