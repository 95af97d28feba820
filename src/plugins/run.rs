//! Request and response bodies for `POST /plugins/run`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{NeuroPixelError, Result};
use crate::plugins::params::{wire_params, ParamMap};
use crate::session::RevisionOutput;
use crate::types::ImageId;

/// Request to execute a plugin on an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRunRequest {
    pub image_id: ImageId,
    pub plugin_name: String,
    /// Parameters in wire form (ranges already split)
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl PluginRunRequest {
    pub fn new(image_id: ImageId, plugin_name: impl Into<String>, params: &ParamMap) -> Self {
        Self {
            image_id,
            plugin_name: plugin_name.into(),
            params: wire_params(params),
        }
    }
}

/// Successful plugin execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRunResponse {
    pub success: bool,
    pub result_id: ImageId,
    pub result_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub execution_time_ms: f64,
    pub plugin_name: String,
    #[serde(default)]
    pub params_used: Map<String, Value>,
}

impl PluginRunResponse {
    /// The part of the response the session reconciles.
    ///
    /// A response that reports `success: false` is treated as a failure.
    pub fn revision(&self) -> Result<RevisionOutput> {
        if !self.success {
            return Err(NeuroPixelError::service(200, None));
        }
        Ok(RevisionOutput::from(self))
    }
}

impl From<&PluginRunResponse> for RevisionOutput {
    fn from(response: &PluginRunResponse) -> Self {
        RevisionOutput {
            result_id: response.result_id.clone(),
            result_url: response.result_url.clone(),
            thumbnail_url: response.thumbnail_url.clone(),
        }
    }
}
