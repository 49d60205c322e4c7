//! Scenario bodies that call the model service and report progress as
//! human-readable lines.

use std::io::{self, Write};

use thiserror::Error;
use tracing::debug;

use crate::service::{BatchPredictRequest, LocationName, ModelName, ModelService};

/// Line written once batch prediction results are available.
pub const BATCH_PREDICT_BANNER: &str =
    "Batch Prediction results saved to specified Cloud Storage bucket";

/// Errors raised by the sample actions.
#[derive(Debug, Error)]
pub enum PredictError<ServiceError>
where
    ServiceError: std::error::Error + 'static,
{
    /// Raised when the remote call fails.
    #[error("model service call failed: {0}")]
    Service(#[source] ServiceError),
    /// Raised when progress cannot be written to the output.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Runs a batch prediction and reports completion to `out`.
///
/// # Errors
///
/// Returns [`PredictError`] when the remote operation fails or `out` cannot
/// be written.
pub async fn batch_predict<S, W>(
    service: &S,
    model: &ModelName,
    request: &BatchPredictRequest,
    out: &mut W,
) -> Result<(), PredictError<S::Error>>
where
    S: ModelService,
    W: Write,
{
    debug!(
        %model,
        output = %request.output_uri_prefix,
        inputs = request.input_uris.len(),
        "starting batch prediction"
    );
    writeln!(out, "Waiting for operation to complete...")?;
    service
        .batch_predict(model, request)
        .await
        .map_err(PredictError::Service)?;
    writeln!(out, "{BATCH_PREDICT_BANNER}.")?;
    Ok(())
}

/// Lists the models in `location` matching `filter` and prints their
/// details. Returns how many models were listed.
///
/// # Errors
///
/// Returns [`PredictError`] when the listing fails or `out` cannot be
/// written.
pub async fn list_models<S, W>(
    service: &S,
    location: &LocationName,
    filter: &str,
    out: &mut W,
) -> Result<usize, PredictError<S::Error>>
where
    S: ModelService,
    W: Write,
{
    let models = service
        .list_models(location, filter)
        .await
        .map_err(PredictError::Service)?;

    writeln!(out, "List of models:")?;
    for model in &models {
        writeln!(out)?;
        writeln!(out, "Model name: {}", model.name)?;
        writeln!(out, "Model Id: {}", model.id())?;
        writeln!(out, "Model display name: {}", model.display_name)?;
        writeln!(out, "Dataset Id: {}", model.dataset_id)?;
        match &model.text_extraction_metadata {
            Some(metadata) => writeln!(out, "TextExtractionModelMetadata: {metadata}")?,
            None => writeln!(out, "TextExtractionModelMetadata: {{}}")?,
        }
        writeln!(
            out,
            "Model create time: {}",
            model.create_time.as_deref().unwrap_or("unknown")
        )?;
        writeln!(out, "Model deployment state: {}", model.deployment_state)?;
    }
    Ok(models.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::DeploymentState;
    use crate::test_support::{ScriptedError, ScriptedModelService, model_snapshot};
    use rstest::rstest;

    fn model() -> ModelName {
        ModelName::new("p", "us-central1", "m").expect("valid model name")
    }

    fn request() -> BatchPredictRequest {
        BatchPredictRequest::builder()
            .input_uri("gs://p-lcm/entity-extraction/input.jsonl")
            .output_uri_prefix("gs://p-lcm/TEST_BATCH_PREDICT/")
            .build()
            .expect("valid request")
    }

    #[rstest]
    #[tokio::test]
    async fn batch_predict_reports_saved_results() {
        let service = ScriptedModelService::with_state(DeploymentState::Deployed);
        let mut out = Vec::new();

        batch_predict(&service, &model(), &request(), &mut out)
            .await
            .expect("prediction should succeed");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains(BATCH_PREDICT_BANNER), "output: {text}");
        assert_eq!(service.last_request(), Some(request()));
    }

    #[rstest]
    #[tokio::test]
    async fn batch_predict_failure_omits_banner() {
        let service = ScriptedModelService::with_state(DeploymentState::Deployed);
        service.fail_on_predict();
        let mut out = Vec::new();

        let err = batch_predict(&service, &model(), &request(), &mut out)
            .await
            .expect_err("prediction should fail");

        assert!(matches!(err, PredictError::Service(ScriptedError::Predict)));
        let text = String::from_utf8(out).expect("utf8");
        assert!(!text.contains(BATCH_PREDICT_BANNER));
    }

    #[rstest]
    #[tokio::test]
    async fn list_models_prints_each_model() {
        let service = ScriptedModelService::default();
        let first = ModelName::new("p", "us-central1", "TEN1").expect("name");
        let second = ModelName::new("p", "us-central1", "TEN2").expect("name");
        service.set_models(vec![
            model_snapshot(&first, DeploymentState::Deployed),
            model_snapshot(&second, DeploymentState::Undeployed),
        ]);
        let mut out = Vec::new();

        let count = list_models(&service, &first.location(), "", &mut out)
            .await
            .expect("listing should succeed");

        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(count, 2);
        assert!(text.starts_with("List of models:"));
        assert!(text.contains("Model Id: TEN2"));
        assert!(text.contains("Model deployment state: UNDEPLOYED"));
        assert_eq!(text.matches("TextExtractionModelMetadata: {}").count(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn list_models_prints_metadata_when_present() {
        let service = ScriptedModelService::default();
        let name = ModelName::new("p", "us-central1", "TEN1").expect("name");
        let mut snapshot = model_snapshot(&name, DeploymentState::Deployed);
        snapshot.text_extraction_metadata = Some(serde_json::json!({ "modelHint": "default" }));
        service.set_models(vec![snapshot]);
        let mut out = Vec::new();

        list_models(&service, &name.location(), "", &mut out)
            .await
            .expect("listing should succeed");

        let text = String::from_utf8(out).expect("utf8");
        assert!(
            text.contains(r#"TextExtractionModelMetadata: {"modelHint":"default"}"#),
            "output: {text}"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn list_models_failure_is_reported() {
        let service = ScriptedModelService::default();
        service.fail_on_list();
        let location = model().location();
        let mut out = Vec::new();

        let err = list_models(&service, &location, "", &mut out)
            .await
            .expect_err("listing should fail");

        assert!(matches!(err, PredictError::Service(ScriptedError::ListModels)));
        assert!(out.is_empty(), "nothing should be printed on failure");
    }
}
