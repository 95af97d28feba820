//! Response bodies of the backend's system and batch routes

use serde::{Deserialize, Serialize};

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub gpu_active: bool,
    #[serde(default)]
    pub version: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// `POST /system/reload-plugins`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub plugins_loaded: usize,
}

/// `POST /batch/run`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStartResponse {
    pub job_id: String,
    #[serde(default)]
    pub status: String,
}

/// Lifecycle of a batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl BatchJobStatus {
    /// Check if the job will make no further progress
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            BatchJobStatus::Completed | BatchJobStatus::Failed | BatchJobStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchJobStatus::Pending => "pending",
            BatchJobStatus::Processing => "processing",
            BatchJobStatus::Completed => "completed",
            BatchJobStatus::Failed => "failed",
            BatchJobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BatchJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `GET /batch/{job_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJobResult {
    pub job_id: String,
    pub status: BatchJobStatus,
    pub processed: u32,
    pub failed: u32,
    pub total: u32,
    pub elapsed_seconds: f64,
    pub output_folder: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl BatchJobResult {
    /// Fraction of images handled so far, successful or not
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.processed + self.failed) / f64::from(self.total)
    }
}
