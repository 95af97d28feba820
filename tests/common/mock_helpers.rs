//! Mock construction helpers

use std::collections::BTreeMap;

use async_trait::async_trait;
use mockall::mock;

use neuropixel::client::{BatchJobResult, BatchStartResponse, HealthStatus, ImageBackend, ReloadResponse};
use neuropixel::pipeline::BatchRunRequest;
use neuropixel::plugins::{PluginCatalog, PluginRunRequest, PluginRunResponse, PluginSpec};
use neuropixel::types::{Image, ImageId};
use neuropixel::Result;

use super::builders::{test_catalog, ImageBuilder};

mock! {
    pub Backend {}

    #[async_trait]
    impl ImageBackend for Backend {
        async fn health(&self) -> Result<HealthStatus>;
        async fn list_plugins(&self) -> Result<PluginCatalog>;
        async fn plugin_categories(&self) -> Result<BTreeMap<String, Vec<PluginSpec>>>;
        async fn run_plugin(&self, request: &PluginRunRequest) -> Result<PluginRunResponse>;
        async fn upload_image(&self, file_name: &str, bytes: Vec<u8>) -> Result<Image>;
        async fn list_images(&self) -> Result<Vec<Image>>;
        async fn delete_image(&self, id: &ImageId) -> Result<()>;
        async fn start_batch(&self, request: &BatchRunRequest) -> Result<BatchStartResponse>;
        async fn batch_status(&self, job_id: &str) -> Result<BatchJobResult>;
        async fn cancel_batch(&self, job_id: &str) -> Result<()>;
        async fn reload_plugins(&self) -> Result<ReloadResponse>;
    }
}

/// Mock backend that serves the test catalog and accepts uploads.
///
/// Uploading `name.ext` yields an original with id `name`.
pub fn create_test_backend() -> MockBackend {
    let mut backend = MockBackend::new();
    backend
        .expect_list_plugins()
        .returning(|| Ok(test_catalog()));
    backend.expect_upload_image().returning(|file_name, _| {
        let id = file_name.split('.').next().unwrap_or(file_name);
        Ok(ImageBuilder::new(id).name(file_name).build())
    });
    backend
}
