//! AutoML v1 REST mapping.

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::service::{
    BatchPredictRequest, DeploymentState, LocationName, Model, ModelName, ModelService,
    ServiceFuture,
};

use super::{GcpClient, GcpError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelResource {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    dataset_id: String,
    #[serde(default)]
    create_time: Option<String>,
    #[serde(default)]
    deployment_state: String,
    #[serde(default)]
    text_extraction_model_metadata: Option<serde_json::Value>,
}

impl From<ModelResource> for Model {
    fn from(value: ModelResource) -> Self {
        Self {
            deployment_state: DeploymentState::from_api(&value.deployment_state),
            name: value.name,
            display_name: value.display_name,
            dataset_id: value.dataset_id,
            create_time: value.create_time,
            text_extraction_metadata: value.text_extraction_model_metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    model: Vec<ModelResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<RpcStatus>,
}

impl Operation {
    fn into_result(self) -> Result<(), GcpError> {
        match self.error {
            Some(status) => Err(GcpError::Operation {
                name: self.name,
                code: status.code,
                message: status.message,
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchPredictBody {
    input_config: InputConfig,
    output_config: OutputConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InputConfig {
    gcs_source: GcsSource,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GcsSource {
    input_uris: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputConfig {
    gcs_destination: GcsDestination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GcsDestination {
    output_uri_prefix: String,
}

impl From<&BatchPredictRequest> for BatchPredictBody {
    fn from(value: &BatchPredictRequest) -> Self {
        Self {
            input_config: InputConfig {
                gcs_source: GcsSource {
                    input_uris: value.input_uris.iter().map(ToString::to_string).collect(),
                },
            },
            output_config: OutputConfig {
                gcs_destination: GcsDestination {
                    output_uri_prefix: value.output_uri_prefix.to_string(),
                },
            },
        }
    }
}

impl GcpClient {
    async fn fetch_operation(&self, name: &str) -> Result<Operation, GcpError> {
        let request = self.http.get(self.automl_url(name));
        self.send_json(request, "operation").await
    }

    /// Polls `operation` until it is done or the timeout elapses.
    async fn wait_for_operation(&self, operation: Operation) -> Result<(), GcpError> {
        let deadline = Instant::now() + self.operation_timeout;
        let mut current = operation;
        loop {
            if current.done {
                debug!(operation = %current.name, "operation finished");
                return current.into_result();
            }
            if Instant::now() >= deadline {
                return Err(GcpError::Timeout { name: current.name });
            }
            sleep(self.poll_interval).await;
            current = self.fetch_operation(&current.name).await?;
        }
    }

    async fn start_operation<B>(&self, url: String, body: &B) -> Result<(), GcpError>
    where
        B: Serialize + Sync,
    {
        let request = self.http.post(url).json(body);
        let operation: Operation = self.send_json(request, "operation").await?;
        info!(operation = %operation.name, "started long-running operation");
        self.wait_for_operation(operation).await
    }

    async fn list_model_pages(
        &self,
        location: &LocationName,
        filter: &str,
    ) -> Result<Vec<Model>, GcpError> {
        let url = self.automl_url(&format!("{location}/models"));
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.http.get(&url).query(&[("filter", filter)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: ListModelsResponse = self.send_json(request, "model list").await?;
            models.extend(page.model.into_iter().map(Model::from));
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(models),
            }
        }
    }
}

impl ModelService for GcpClient {
    type Error = GcpError;

    fn get_model<'a>(&'a self, name: &'a ModelName) -> ServiceFuture<'a, Model, Self::Error> {
        Box::pin(async move {
            let request = self.http.get(self.automl_url(&name.to_string()));
            let resource: ModelResource = self.send_json(request, "model").await?;
            Ok(Model::from(resource))
        })
    }

    fn deploy_model<'a>(&'a self, name: &'a ModelName) -> ServiceFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let url = self.automl_url(&format!("{name}:deploy"));
            self.start_operation(url, &serde_json::json!({})).await
        })
    }

    fn list_models<'a>(
        &'a self,
        location: &'a LocationName,
        filter: &'a str,
    ) -> ServiceFuture<'a, Vec<Model>, Self::Error> {
        Box::pin(async move { self.list_model_pages(location, filter).await })
    }

    fn batch_predict<'a>(
        &'a self,
        name: &'a ModelName,
        request: &'a BatchPredictRequest,
    ) -> ServiceFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let url = self.automl_url(&format!("{name}:batchPredict"));
            self.start_operation(url, &BatchPredictBody::from(request))
                .await
        })
    }
}
