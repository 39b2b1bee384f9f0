use std::{env, fs, path::Path};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::info;

use crate::errors::ModelLoadError;

/// Environment-driven server configuration.
pub struct Config {
    pub body_limit_bytes: usize,
    pub port: u16,
    pub model_url: Option<String>,
}

pub fn get_env() -> Config {
    let body_limit_bytes = {
        let mb = env::var("BODY_LIMIT_MB")
            .unwrap_or_else(|_| "5".into())
            .parse::<usize>()
            .expect("BODY_LIMIT_MB must be a valid integer");
        mb * 1024 * 1024
    };

    let port = env::var("PORT")
        .unwrap_or_else(|_| "5020".into())
        .parse::<u16>()
        .expect("PORT must be a valid number between 0 and 65535");

    let model_url = env::var("MODEL_URL").ok();

    Config {
        body_limit_bytes,
        port,
        model_url,
    }
}

/// Downloads the model artifact when it is not already on disk.
pub async fn ensure_model_file(
    model_path: &str,
    model_url: Option<&str>,
) -> Result<(), ModelLoadError> {
    if Path::new(model_path).exists() {
        return Ok(());
    }

    let url = model_url.ok_or_else(|| {
        ModelLoadError::Fetch(format!(
            "{} is missing and MODEL_URL is not set",
            model_path
        ))
    })?;
    download_file(url, model_path).await
}

async fn download_file(url: &str, path: &str) -> Result<(), ModelLoadError> {
    info!("Downloading {} from {}", path, url);

    let mut header_map = HeaderMap::new();

    if let Ok(token) = env::var("GITHUB_TOKEN") {
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ModelLoadError::Fetch("invalid GITHUB_TOKEN format".into()))?;
        header_map.insert(HeaderName::from_static("authorization"), auth_value);
    }
    header_map.insert(
        HeaderName::from_static("accept"),
        HeaderValue::from_static("application/octet-stream"),
    );

    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .headers(header_map)
        .send()
        .await
        .map_err(|e| ModelLoadError::Fetch(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ModelLoadError::Fetch(format!(
            "failed to download {}: {}",
            url,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ModelLoadError::Fetch(e.to_string()))?;
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent).map_err(|e| ModelLoadError::Fetch(e.to_string()))?;
    }
    fs::write(path, bytes).map_err(|e| ModelLoadError::Fetch(e.to_string()))?;
    Ok(())
}
