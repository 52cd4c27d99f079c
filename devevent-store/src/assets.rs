use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::error;

use devevent_core::upload::{ImageUploader, UploadError};

use crate::app_config::AssetsConfig;

/// Client for the external asset host: ships raw image bytes, gets back the
/// public URL that is stored on the event.
pub struct AssetHostClient {
    http: reqwest::Client,
    base_url: String,
    folder: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

impl AssetHostClient {
    pub fn new(config: &AssetsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            folder: config.folder.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl ImageUploader for AssetHostClient {
    async fn upload(&self, bytes: Vec<u8>) -> Result<String, UploadError> {
        let form = Form::new()
            .text("folder", self.folder.clone())
            .part("file", Part::bytes(bytes).file_name("image"));

        let mut request = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UploadError(e.to_string()))?;

        if !response.status().is_success() {
            error!("Asset host rejected upload: {}", response.status());
            return Err(UploadError(format!(
                "asset host returned {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError(e.to_string()))?;
        Ok(body.url)
    }
}
