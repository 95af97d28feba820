//! Client settings loaded from `config.toml`
//!
//! These control how the client talks to the backend and how plugin results
//! are folded into the session. Every field has a default, so an empty or
//! partial file is valid.
//!
//! # Example
//!
//! ```toml
//! backend_url = "http://gpu-box:8000"
//! request_timeout_secs = 60
//! reconcile_mode = "in_place"
//! ```
//!
//! The `NEUROPIXEL_BACKEND_URL` environment variable overrides
//! `backend_url` when set.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{NeuroPixelError, Result};
use crate::pipeline::DEFAULT_BATCH_OUTPUT;
use crate::plugins::DEFAULT_CATALOG_TTL;
use crate::session::history::DEFAULT_HISTORY_DEPTH;
use crate::session::ReconcileMode;

/// Environment variable overriding the backend URL
pub const BACKEND_URL_ENV: &str = "NEUROPIXEL_BACKEND_URL";

/// Backend the client talks to when nothing else is configured
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Default timeout for a single HTTP request in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the NeuroPixel backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Timeout for a single request; plugin runs on large images can be slow
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long the plugin catalog is cached
    #[serde(default = "default_catalog_ttl_secs")]
    pub catalog_ttl_secs: u64,

    /// Reconciliation mode used when a caller does not pick one
    #[serde(default)]
    pub reconcile_mode: ReconcileMode,

    /// Where batch jobs write when the graph names no folder
    #[serde(default = "default_batch_output_folder")]
    pub batch_output_folder: String,

    /// Number of in-place edits that can be undone
    #[serde(default = "default_undo_depth")]
    pub undo_depth: usize,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_catalog_ttl_secs() -> u64 {
    DEFAULT_CATALOG_TTL.as_secs()
}

fn default_batch_output_folder() -> String {
    DEFAULT_BATCH_OUTPUT.to_string()
}

fn default_undo_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout_secs(),
            catalog_ttl_secs: default_catalog_ttl_secs(),
            reconcile_mode: ReconcileMode::default(),
            batch_output_folder: default_batch_output_folder(),
            undo_depth: default_undo_depth(),
        }
    }
}

impl ClientConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| NeuroPixelError::Config(format!("Failed to parse client config: {}", e)))
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No client config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            NeuroPixelError::Config(format!("Failed to read client config {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from the app data directory, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        let loaded = match super::client_config_path() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        };
        loaded
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to load client config, using defaults: {}", e);
                Self::default()
            })
            .with_env_overrides()
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| NeuroPixelError::Config(format!("Failed to serialize client config: {}", e)))
    }

    /// Write to a TOML file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NeuroPixelError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }
        std::fs::write(path, self.to_toml_string()?).map_err(|e| {
            NeuroPixelError::Config(format!("Failed to write client config {:?}: {}", path, e))
        })
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                tracing::debug!("Backend URL overridden from environment: {}", url);
                self.backend_url = url;
            }
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }

    /// Backend URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.backend_url.trim_end_matches('/')
    }
}
