//! Backend collaborators
//!
//! The client core never talks HTTP directly. Every remote operation goes
//! through [`ImageBackend`], so the workstation can run against the real
//! service ([`HttpBackend`]) or a mock in tests.

pub mod http;
pub mod types;

pub use http::HttpBackend;
pub use types::{BatchJobResult, BatchJobStatus, BatchStartResponse, HealthStatus, ReloadResponse};

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::BatchRunRequest;
use crate::plugins::{PluginCatalog, PluginRunRequest, PluginRunResponse, PluginSpec};
use crate::types::{Image, ImageId};

/// Remote image, plugin and batch services.
///
/// Implementations report non-success responses as
/// `NeuroPixelError::Service` carrying the backend's `detail` message.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Check that the backend is reachable
    async fn health(&self) -> Result<HealthStatus>;

    /// Fetch every plugin spec with the category index
    async fn list_plugins(&self) -> Result<PluginCatalog>;

    /// Fetch full specs grouped by category
    async fn plugin_categories(&self) -> Result<BTreeMap<String, Vec<PluginSpec>>>;

    /// Execute one plugin on one image
    async fn run_plugin(&self, request: &PluginRunRequest) -> Result<PluginRunResponse>;

    /// Upload an image file; the returned record is an original
    async fn upload_image(&self, file_name: &str, bytes: Vec<u8>) -> Result<Image>;

    /// Images currently stored on the backend
    async fn list_images(&self) -> Result<Vec<Image>>;

    async fn delete_image(&self, id: &ImageId) -> Result<()>;

    /// Start a batch job; returns immediately with the job id
    async fn start_batch(&self, request: &BatchRunRequest) -> Result<BatchStartResponse>;

    async fn batch_status(&self, job_id: &str) -> Result<BatchJobResult>;

    async fn cancel_batch(&self, job_id: &str) -> Result<()>;

    /// Ask the backend to rescan its plugin directory
    async fn reload_plugins(&self) -> Result<ReloadResponse>;
}
