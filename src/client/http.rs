//! reqwest implementation of [`ImageBackend`]

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{BatchJobResult, BatchStartResponse, HealthStatus, ReloadResponse};
use super::ImageBackend;
use crate::config::ClientConfig;
use crate::error::{NeuroPixelError, Result};
use crate::pipeline::BatchRunRequest;
use crate::plugins::{PluginCatalog, PluginRunRequest, PluginRunResponse, PluginSpec};
use crate::types::{split_extension, Image, ImageId};

#[derive(Deserialize)]
struct CategoriesResponse {
    categories: BTreeMap<String, Vec<PluginSpec>>,
}

/// Client for the NeuroPixel FastAPI service
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend using the URL and timeout from `config`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http_client,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        tracing::debug!("GET {}", path);
        let response = self.http_client.get(self.url(path)).send().await?;
        decode(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!("POST {}", path);
        let mut request = self.http_client.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        decode(request.send().await?).await
    }
}

/// Turn a non-success response into a service error carrying its `detail`
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = extract_detail(&body);
    tracing::warn!("Backend answered {}: {:?}", status, detail);
    Err(NeuroPixelError::service(status.as_u16(), detail))
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// The `detail` field of an error body.
///
/// Validation errors carry a list instead of a string; those are passed on
/// as compact JSON.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = split_extension(file_name)
        .1
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ImageBackend for HttpBackend {
    async fn health(&self) -> Result<HealthStatus> {
        self.get_json("/health").await
    }

    async fn list_plugins(&self) -> Result<PluginCatalog> {
        self.get_json("/plugins").await
    }

    async fn plugin_categories(&self) -> Result<BTreeMap<String, Vec<PluginSpec>>> {
        let response: CategoriesResponse = self.get_json("/plugins/categories").await?;
        Ok(response.categories)
    }

    async fn run_plugin(&self, request: &PluginRunRequest) -> Result<PluginRunResponse> {
        tracing::info!("Running {} on image {}", request.plugin_name, request.image_id);
        self.post_json("/plugins/run", Some(request)).await
    }

    async fn upload_image(&self, file_name: &str, bytes: Vec<u8>) -> Result<Image> {
        tracing::info!("Uploading {} ({} bytes)", file_name, bytes.len());
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http_client
            .post(self.url("/images/upload"))
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }

    async fn list_images(&self) -> Result<Vec<Image>> {
        self.get_json("/images").await
    }

    async fn delete_image(&self, id: &ImageId) -> Result<()> {
        tracing::debug!("DELETE /images/{}", id);
        let response = self
            .http_client
            .delete(self.url(&format!("/images/{}", id)))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn start_batch(&self, request: &BatchRunRequest) -> Result<BatchStartResponse> {
        tracing::info!(
            "Starting batch of {} steps into {}",
            request.pipeline_steps.len(),
            request.output_folder
        );
        self.post_json("/batch/run", Some(request)).await
    }

    async fn batch_status(&self, job_id: &str) -> Result<BatchJobResult> {
        self.get_json(&format!("/batch/{}", job_id)).await
    }

    async fn cancel_batch(&self, job_id: &str) -> Result<()> {
        let _: Value = self
            .post_json::<(), _>(&format!("/batch/{}/cancel", job_id), None)
            .await?;
        Ok(())
    }

    async fn reload_plugins(&self) -> Result<ReloadResponse> {
        self.post_json::<(), _>("/system/reload-plugins", None).await
    }
}
