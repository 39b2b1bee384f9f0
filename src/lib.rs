//! leafscan: plant leaf disease inference service.
//!
//! Owns the classifier lifecycle (lazy, single-flight, cached), image
//! preprocessing, inference, and result post-processing. The HTTP surface
//! in `main.rs` is a thin caller of [`service::ModelService`].

pub mod catalog;
pub mod errors;
pub mod model;
pub mod preprocess;
pub mod service;
pub mod utils;

pub use errors::{ClassifyError, InferenceError, ModelLoadError};
pub use service::{ImageSource, ModelService, PredictionResult};
