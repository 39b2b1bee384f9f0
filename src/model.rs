//! Classifier backend: trait seams plus the TensorFlow frozen-graph
//! implementation.

use std::fs::File;
use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use tensorflow::{Graph, ImportGraphDefOptions, Session, SessionOptions, SessionRunArgs, Tensor};

use crate::errors::{InferenceError, ModelLoadError};
use crate::preprocess::{CHANNELS, INPUT_LEN, INPUT_SIZE};
use crate::utils::ensure_model_file;

const INPUT_OP: &str = "x";
const OUTPUT_OP: &str = "Identity";

/// A loaded classification model. Immutable once constructed; shared
/// read-only across concurrent classify calls.
pub trait Classifier: Send + Sync {
    /// Width of the output probability vector.
    fn class_count(&self) -> usize;

    /// Runs the forward pass on one flattened 224x224 RGB image normalized
    /// to `[0,1]` and returns the probability vector. All tensors created
    /// for the pass are released before returning, on success and on error.
    fn infer(&self, pixels: &[f32]) -> Result<Vec<f32>, InferenceError>;
}

/// Produces a classifier from wherever the artifact lives. The seam the
/// service loads through, and the seam tests inject fakes through.
#[async_trait]
pub trait ClassifierLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Classifier>, ModelLoadError>;
}

/// TensorFlow frozen-graph classifier.
pub struct FrozenGraphClassifier {
    graph: Graph,
    session: Session,
    class_count: usize,
}

impl FrozenGraphClassifier {
    /// Imports a frozen graph and probes it with a zero input. The probe
    /// surfaces an unrunnable graph at load time and fixes the output
    /// width, so a catalog mismatch is caught before any request runs.
    pub fn from_file(model_path: &str) -> Result<Self, ModelLoadError> {
        let mut graph = Graph::new();
        let mut model_file = File::open(model_path)
            .map_err(|e| ModelLoadError::Fetch(format!("{}: {}", model_path, e)))?;
        let mut model_bytes = Vec::new();
        model_file
            .read_to_end(&mut model_bytes)
            .map_err(|e| ModelLoadError::Fetch(e.to_string()))?;

        graph
            .import_graph_def(&model_bytes, &ImportGraphDefOptions::new())
            .map_err(|e| ModelLoadError::Parse(e.to_string()))?;

        let session = Session::new(&SessionOptions::new(), &graph)
            .map_err(|e| ModelLoadError::Parse(e.to_string()))?;

        let mut classifier = FrozenGraphClassifier {
            graph,
            session,
            class_count: 0,
        };
        let zeros = vec![0.0; INPUT_LEN];
        let probe = classifier
            .run(&zeros)
            .map_err(|e| ModelLoadError::Parse(e.to_string()))?;
        classifier.class_count = probe.len();

        Ok(classifier)
    }

    fn run(&self, pixels: &[f32]) -> Result<Vec<f32>, InferenceError> {
        if pixels.len() != INPUT_LEN {
            return Err(InferenceError(format!(
                "expected {} input values, got {}",
                INPUT_LEN,
                pixels.len()
            )));
        }

        // Scoped to this call: dropped on every exit path below.
        let mut input: Tensor<f32> =
            Tensor::new(&[1, INPUT_SIZE as u64, INPUT_SIZE as u64, CHANNELS as u64]);
        input.copy_from_slice(pixels);

        let mut args = SessionRunArgs::new();

        let input_operation = self
            .graph
            .operation_by_name(INPUT_OP)
            .map_err(|e| InferenceError(e.to_string()))?
            .ok_or_else(|| {
                InferenceError(format!("input operation '{}' not found in graph", INPUT_OP))
            })?;
        let output_operation = self
            .graph
            .operation_by_name(OUTPUT_OP)
            .map_err(|e| InferenceError(e.to_string()))?
            .ok_or_else(|| {
                InferenceError(format!(
                    "output operation '{}' not found in graph",
                    OUTPUT_OP
                ))
            })?;

        args.add_feed(&input_operation, 0, &input);
        let output_token = args.request_fetch(&output_operation, 0);
        self.session
            .run(&mut args)
            .map_err(|e| InferenceError(e.to_string()))?;

        let output_tensor: Tensor<f32> = args
            .fetch(output_token)
            .map_err(|e| InferenceError(e.to_string()))?;
        Ok(output_tensor.to_vec())
    }
}

impl Classifier for FrozenGraphClassifier {
    fn class_count(&self) -> usize {
        self.class_count
    }

    fn infer(&self, pixels: &[f32]) -> Result<Vec<f32>, InferenceError> {
        self.run(pixels)
    }
}

/// Loads the frozen graph from a local path, downloading it first when the
/// file is absent and a URL is configured.
pub struct GraphLoader {
    model_path: String,
    model_url: Option<String>,
}

impl GraphLoader {
    pub fn new(model_path: impl Into<String>, model_url: Option<String>) -> Self {
        GraphLoader {
            model_path: model_path.into(),
            model_url,
        }
    }
}

#[async_trait]
impl ClassifierLoader for GraphLoader {
    async fn load(&self) -> Result<Arc<dyn Classifier>, ModelLoadError> {
        ensure_model_file(&self.model_path, self.model_url.as_deref()).await?;

        // Graph parsing and the probe run are blocking work.
        let path = self.model_path.clone();
        let classifier =
            tokio::task::spawn_blocking(move || FrozenGraphClassifier::from_file(&path))
                .await
                .map_err(|e| ModelLoadError::Parse(format!("model load task failed: {}", e)))??;

        Ok(Arc::new(classifier))
    }
}
