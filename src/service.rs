//! The inference service: lazy single-flight classifier loading, image
//! classification, and result post-processing.

use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::catalog::{self, LabelCatalog};
use crate::errors::{ClassifyError, InferenceError, ModelLoadError};
use crate::model::{Classifier, ClassifierLoader};
use crate::preprocess;

/// A loadable image input: raw encoded bytes or a remote URL.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Url(String),
}

/// The structured diagnosis produced by one classify call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub disease_name: String,
    /// Rounded percentage of the top class, 0 to 100.
    pub confidence: u8,
    pub description: String,
    pub treatment: String,
}

/// Ceiling for remote image downloads, the same as the default upload
/// body limit.
const MAX_REMOTE_IMAGE_BYTES: usize = 5 * 1024 * 1024;

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<dyn Classifier>, ModelLoadError>>>;

enum LoadState {
    Unloaded,
    Loading(SharedLoad),
    Ready(Arc<dyn Classifier>),
}

/// Owns the classifier lifecycle and exposes `classify`.
///
/// The classifier is loaded lazily on first use. Concurrent callers during
/// a load all await the same shared future, so at most one load runs at a
/// time and every waiter observes the same outcome. Success is cached for
/// the process lifetime; failure resets the state so the next call retries.
pub struct ModelService {
    loader: Arc<dyn ClassifierLoader>,
    catalog: Arc<LabelCatalog>,
    state: Mutex<LoadState>,
    http: reqwest::Client,
}

impl ModelService {
    pub fn new(loader: Arc<dyn ClassifierLoader>) -> Self {
        Self::with_catalog(loader, LabelCatalog::builtin())
    }

    pub fn with_catalog(loader: Arc<dyn ClassifierLoader>, catalog: LabelCatalog) -> Self {
        ModelService {
            loader,
            catalog: Arc::new(catalog),
            state: Mutex::new(LoadState::Unloaded),
            http: reqwest::Client::new(),
        }
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    /// Returns the cached classifier, joining an in-flight load or starting
    /// one if needed. A loaded classifier whose output width disagrees with
    /// the label catalog fails the load here rather than corrupting every
    /// later prediction.
    pub async fn load_classifier(&self) -> Result<Arc<dyn Classifier>, ModelLoadError> {
        let pending = {
            let mut state = self.state.lock().await;
            match &*state {
                LoadState::Ready(classifier) => return Ok(classifier.clone()),
                LoadState::Loading(pending) => pending.clone(),
                LoadState::Unloaded => {
                    info!("loading classifier");
                    let loader = self.loader.clone();
                    let expected = self.catalog.len();
                    let load = async move {
                        let classifier = loader.load().await?;
                        let actual = classifier.class_count();
                        if actual != expected {
                            return Err(ModelLoadError::ClassCountMismatch { expected, actual });
                        }
                        Ok(classifier)
                    }
                    .boxed()
                    .shared();
                    *state = LoadState::Loading(load.clone());
                    load
                }
            }
        };

        let outcome = pending.clone().await;

        let mut state = self.state.lock().await;
        // Only transition for the load this call awaited. A waiter that
        // wakes late, after another caller has already started a fresh
        // load, must leave that newer load untouched.
        let awaited_is_current =
            matches!(&*state, LoadState::Loading(current) if current.ptr_eq(&pending));
        if awaited_is_current {
            match &outcome {
                Ok(classifier) => {
                    info!("classifier ready with {} classes", classifier.class_count());
                    *state = LoadState::Ready(classifier.clone());
                }
                Err(err) => {
                    warn!("classifier load failed: {err}");
                    *state = LoadState::Unloaded;
                }
            }
        }
        outcome
    }

    /// Classifies one leaf image and returns the structured diagnosis.
    ///
    /// Drives the load if the classifier is not yet ready. Errors propagate
    /// uncaught: a failed call is visibly a failure, never a default or
    /// stale prediction.
    pub async fn classify(&self, image: ImageSource) -> Result<PredictionResult, ClassifyError> {
        let classifier = self.load_classifier().await?;
        let bytes = self.resolve_image(image).await?;
        let pixels = preprocess::pixels_from_bytes(&bytes)?;
        let probabilities = classifier.infer(&pixels)?;
        self.build_result(&probabilities)
    }

    async fn resolve_image(&self, image: ImageSource) -> Result<Vec<u8>, ClassifyError> {
        match image {
            ImageSource::Bytes(bytes) => Ok(bytes),
            ImageSource::Url(url) => {
                let mut response = self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| ClassifyError::ImageDecode(format!("failed to fetch {}: {}", url, e)))?;
                if !response.status().is_success() {
                    return Err(ClassifyError::ImageDecode(format!(
                        "failed to fetch {}: {}",
                        url,
                        response.status()
                    )));
                }
                if let Some(length) = response.content_length() {
                    if length > MAX_REMOTE_IMAGE_BYTES as u64 {
                        return Err(ClassifyError::ImageDecode(format!(
                            "remote image is {} bytes, limit is {}",
                            length, MAX_REMOTE_IMAGE_BYTES
                        )));
                    }
                }
                let mut bytes = Vec::new();
                while let Some(chunk) = response
                    .chunk()
                    .await
                    .map_err(|e| ClassifyError::ImageDecode(e.to_string()))?
                {
                    if bytes.len() + chunk.len() > MAX_REMOTE_IMAGE_BYTES {
                        return Err(ClassifyError::ImageDecode(format!(
                            "remote image exceeds the {} byte limit",
                            MAX_REMOTE_IMAGE_BYTES
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                Ok(bytes)
            }
        }
    }

    fn build_result(&self, probabilities: &[f32]) -> Result<PredictionResult, ClassifyError> {
        let (index, max_probability) = argmax(probabilities)
            .ok_or_else(|| InferenceError("empty probability vector".into()))?;
        let label = self.catalog.get(index).ok_or_else(|| {
            InferenceError(format!(
                "predicted class {} outside catalog of {}",
                index,
                self.catalog.len()
            ))
        })?;

        // Round half away from zero.
        let confidence = (max_probability * 100.0).round() as u8;

        let result = if label.is_healthy() {
            PredictionResult {
                disease_name: format!("Healthy {}", label.plant()),
                confidence,
                description: format!(
                    "This {} plant appears to be healthy with no visible signs of disease.",
                    label.plant().to_lowercase()
                ),
                treatment: catalog::HEALTHY_TREATMENT.to_string(),
            }
        } else {
            let condition = label.condition().replace('_', " ");
            let plant = label.plant().to_lowercase();
            PredictionResult {
                disease_name: condition.clone(),
                confidence,
                description: format!(
                    "This appears to be {} on a {} plant. This is a common disease affecting {} crops.",
                    condition, plant, plant
                ),
                treatment: catalog::treatment_for(label.raw()).to_string(),
            }
        };
        Ok(result)
    }
}

/// Index and value of the maximum probability. First index wins on ties.
fn argmax(probabilities: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &p) in probabilities.iter().enumerate() {
        match best {
            Some((_, max)) if p <= max => {}
            _ => best = Some((i, p)),
        }
    }
    best
}
