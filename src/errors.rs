use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failure while fetching or parsing the classifier artifact.
///
/// Clonable so every caller waiting on the same in-flight load observes the
/// same error. A failed load is never cached; the next call retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelLoadError {
    #[error("failed to fetch model artifact: {0}")]
    Fetch(String),

    #[error("failed to parse model artifact: {0}")]
    Parse(String),

    #[error("model outputs {actual} classes but the label catalog has {expected}")]
    ClassCountMismatch { expected: usize, actual: usize },
}

/// Forward-pass failure inside the compute backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("inference failed: {0}")]
pub struct InferenceError(pub String);

/// Everything a `classify` call can fail with. Propagated to the caller
/// as-is: no retry, no fallback prediction.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    #[error("failed to decode input image: {0}")]
    ImageDecode(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl From<image::ImageError> for ClassifyError {
    fn from(err: image::ImageError) -> Self {
        ClassifyError::ImageDecode(err.to_string())
    }
}

impl IntoResponse for ClassifyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ClassifyError::ImageDecode(_) => StatusCode::BAD_REQUEST,
            ClassifyError::ModelLoad(_) => StatusCode::BAD_GATEWAY,
            ClassifyError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
