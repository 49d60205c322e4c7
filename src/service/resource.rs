//! Resource names and snapshots exchanged with the remote services.

use std::fmt;

use thiserror::Error;

/// Errors raised when building a resource name or URI.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResourceNameError {
    /// Raised when a required identifier is empty after trimming.
    #[error("missing or empty field: {field}")]
    Blank {
        /// Name of the offending field.
        field: String,
    },
    /// Raised when an identifier would break the structured name.
    #[error("field {field} must not contain '/': {value}")]
    Separator {
        /// Name of the offending field.
        field: String,
        /// Value supplied by the caller.
        value: String,
    },
    /// Raised when a storage URI is not of the form `gs://bucket/path`.
    #[error("invalid Cloud Storage URI '{uri}': {reason}")]
    InvalidUri {
        /// URI supplied by the caller.
        uri: String,
        /// Why the URI was rejected.
        reason: String,
    },
}

fn identifier(field: &str, value: impl Into<String>) -> Result<String, ResourceNameError> {
    let trimmed = value.into().trim().to_owned();
    if trimmed.is_empty() {
        return Err(ResourceNameError::Blank {
            field: field.to_owned(),
        });
    }
    if trimmed.contains('/') {
        return Err(ResourceNameError::Separator {
            field: field.to_owned(),
            value: trimmed,
        });
    }
    Ok(trimmed)
}

/// Project and region pair that scopes model listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocationName {
    /// Google Cloud project identifier.
    pub project: String,
    /// Compute region (for example `us-central1`).
    pub region: String,
}

impl LocationName {
    /// Builds a location, trimming both identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceNameError`] when an identifier is blank or contains
    /// a `/`.
    pub fn new(
        project: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self, ResourceNameError> {
        Ok(Self {
            project: identifier("project", project)?,
            region: identifier("region", region)?,
        })
    }
}

impl fmt::Display for LocationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/locations/{}", self.project, self.region)
    }
}

/// Fully-qualified reference to a remote model.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModelName {
    /// Google Cloud project identifier.
    pub project: String,
    /// Compute region hosting the model.
    pub region: String,
    /// Model identifier within the location.
    pub model_id: String,
}

impl ModelName {
    /// Builds a model reference, trimming every identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceNameError`] when an identifier is blank or contains
    /// a `/`.
    pub fn new(
        project: impl Into<String>,
        region: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Result<Self, ResourceNameError> {
        Ok(Self {
            project: identifier("project", project)?,
            region: identifier("region", region)?,
            model_id: identifier("model_id", model_id)?,
        })
    }

    /// Returns the location that owns this model.
    #[must_use]
    pub fn location(&self) -> LocationName {
        LocationName {
            project: self.project.clone(),
            region: self.region.clone(),
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/models/{}", self.location(), self.model_id)
    }
}

/// Deployment state reported by the model service.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentState {
    /// The model cannot serve predictions.
    Undeployed,
    /// The service reports neither state; a deploy or undeploy is in flight.
    Deploying,
    /// The model is serving.
    Deployed,
}

impl DeploymentState {
    /// Maps the REST enum string to a state.
    ///
    /// Anything other than `DEPLOYED` or `UNDEPLOYED` (including
    /// `DEPLOYMENT_STATE_UNSPECIFIED`) is treated as in transition.
    #[must_use]
    pub fn from_api(value: &str) -> Self {
        match value {
            "DEPLOYED" => Self::Deployed,
            "UNDEPLOYED" => Self::Undeployed,
            _ => Self::Deploying,
        }
    }

    /// Returns the REST spelling of the state.
    #[must_use]
    pub const fn as_api_str(self) -> &'static str {
        match self {
            Self::Undeployed => "UNDEPLOYED",
            Self::Deploying => "DEPLOYMENT_STATE_UNSPECIFIED",
            Self::Deployed => "DEPLOYED",
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Snapshot of a remote model.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    /// Full resource name (`projects/.../models/<id>`).
    pub name: String,
    /// Human readable display name.
    pub display_name: String,
    /// Dataset the model was trained on.
    pub dataset_id: String,
    /// Creation timestamp as reported by the service (RFC 3339).
    pub create_time: Option<String>,
    /// Current deployment state.
    pub deployment_state: DeploymentState,
    /// Text extraction metadata, when the model is an entity extractor.
    pub text_extraction_metadata: Option<serde_json::Value>,
}

impl Model {
    /// Returns the model id, the last segment of the resource name.
    #[must_use]
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(self.name.as_str())
    }
}

/// Entry returned by a one-level ("current directory") storage listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StorageEntry {
    /// Bucket holding the entry.
    pub bucket: String,
    /// Full object name or synthesized prefix.
    pub name: String,
    /// Whether the entry is a directory rather than a leaf object.
    pub is_directory: bool,
}

impl StorageEntry {
    /// Builds a leaf object entry.
    #[must_use]
    pub fn object(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            is_directory: false,
        }
    }

    /// Builds a directory entry.
    #[must_use]
    pub fn directory(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            is_directory: true,
        }
    }
}

const GCS_SCHEME: &str = "gs://";

/// Parsed `gs://bucket/path` URI.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GcsUri {
    /// Bucket component.
    pub bucket: String,
    /// Object path within the bucket (may be empty or end with `/`).
    pub path: String,
}

impl GcsUri {
    /// Builds a URI from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceNameError`] when the bucket is blank or contains a
    /// `/`.
    pub fn new(
        bucket: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<Self, ResourceNameError> {
        Ok(Self {
            bucket: identifier("bucket", bucket)?,
            path: path.into().trim_start_matches('/').to_owned(),
        })
    }

    /// Parses a `gs://bucket/path` string.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceNameError::InvalidUri`] when the scheme is missing or
    /// the bucket is empty.
    pub fn parse(uri: &str) -> Result<Self, ResourceNameError> {
        let invalid = |reason: &str| ResourceNameError::InvalidUri {
            uri: uri.to_owned(),
            reason: reason.to_owned(),
        };
        let rest = uri
            .trim()
            .strip_prefix(GCS_SCHEME)
            .ok_or_else(|| invalid("expected the gs:// scheme"))?;
        let (bucket, path) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(invalid("bucket is empty"));
        }
        Ok(Self {
            bucket: bucket.to_owned(),
            path: path.to_owned(),
        })
    }
}

impl fmt::Display for GcsUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{GCS_SCHEME}{}/{}", self.bucket, self.path)
    }
}
