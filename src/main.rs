use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use leafscan::errors::ClassifyError;
use leafscan::model::GraphLoader;
use leafscan::service::{ImageSource, ModelService, PredictionResult};
use leafscan::utils::get_env;

const MODEL_PATH: &str = "./model/frozen_graph.pb";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = get_env();
    let loader = Arc::new(GraphLoader::new(MODEL_PATH, config.model_url));
    let shared_state = Arc::new(ModelService::new(loader));

    let app = Router::new()
        .route("/predict", post(predict_handler))
        .route("/predict_url", post(predict_url_handler))
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
        .route("/health", get(health_check));

    info!("Listening on http://0.0.0.0:{}", config.port);
    axum::Server::bind(
        &format!("0.0.0.0:{}", config.port)
            .parse()
            .expect("invalid bind address"),
    )
    .serve(app.into_make_service())
    .await
    .expect("server failed");
}

async fn predict_handler(
    State(service): State<Arc<ModelService>>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResult>, ClassifyError> {
    let mut image_data = Vec::new();

    // Process multipart form to find the file
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ClassifyError::ImageDecode(e.to_string()))?
    {
        if field.name() == Some("file") {
            image_data = field
                .bytes()
                .await
                .map_err(|e| ClassifyError::ImageDecode(e.to_string()))?
                .to_vec();
            break;
        }
    }

    if image_data.is_empty() {
        return Err(ClassifyError::ImageDecode("no file uploaded".into()));
    }

    let result = service.classify(ImageSource::Bytes(image_data)).await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct PredictUrlRequest {
    url: String,
}

async fn predict_url_handler(
    State(service): State<Arc<ModelService>>,
    Json(request): Json<PredictUrlRequest>,
) -> Result<Json<PredictionResult>, ClassifyError> {
    let result = service.classify(ImageSource::Url(request.url)).await?;
    Ok(Json(result))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}
