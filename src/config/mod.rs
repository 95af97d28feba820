//! Configuration module for NeuroPixel
//!
//! This module handles client configuration including:
//! - Client settings (backend URL, timeouts, reconciliation mode) in TOML
//! - Application state persistence (recent folders, last pipeline) in JSON
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.neuropixel.client/`
//! - **macOS**: `~/Library/Application Support/dev.neuropixel.client/`
//! - **Windows**: `%APPDATA%\dev.neuropixel.client\`
//!
//! # Files
//!
//! - `config.toml` - Client settings, see [`ClientConfig`]
//! - `app_state.json` - Recent folders and last pipeline file
//!
//! # Example
//!
//! ```ignore
//! use neuropixel::config::{AppState, ClientConfig};
//!
//! let config = ClientConfig::load_or_default();
//! let mut state = AppState::load_or_default();
//!
//! state.add_recent_input_folder("/data/scans");
//! state.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{NeuroPixelError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.neuropixel.client";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Client settings filename
pub const CLIENT_CONFIG_FILE: &str = "config.toml";

/// Maximum number of recent folders to remember per list
pub const MAX_RECENT_FOLDERS: usize = 10;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        NeuroPixelError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            NeuroPixelError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

/// Get the path to the client settings file
pub fn client_config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CLIENT_CONFIG_FILE))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ==================== Recent Folder Entry ====================

/// A folder the user picked before
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFolder {
    pub path: PathBuf,

    /// Last used timestamp (Unix seconds)
    pub last_used: u64,
}

impl RecentFolder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_used: unix_now(),
        }
    }

    /// Check if the folder still exists
    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }
}

/// Which recents list a folder selection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderRole {
    Input,
    Output,
}

// ==================== App State ====================

/// Persistent application state
///
/// This stores history that persists across sessions, separate from the
/// client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Recently used batch input folders, most recent first
    #[serde(default)]
    pub recent_input_folders: Vec<RecentFolder>,

    /// Recently used output folders, most recent first
    #[serde(default)]
    pub recent_output_folders: Vec<RecentFolder>,

    /// Last pipeline graph file opened or saved
    #[serde(default)]
    pub last_pipeline_path: Option<PathBuf>,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            recent_input_folders: Vec::new(),
            recent_output_folders: Vec::new(),
            last_pipeline_path: None,
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            NeuroPixelError::Config("Could not determine app state path".to_string())
        })?;
        Self::load_from(path)
    }

    /// Load app state from `path`. A missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| NeuroPixelError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| NeuroPixelError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(APP_STATE_FILE))
    }

    /// Save app state to `path`
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| NeuroPixelError::Config(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| NeuroPixelError::Config(format!("Failed to write app state: {}", e)))
    }

    fn recents_mut(&mut self, role: FolderRole) -> &mut Vec<RecentFolder> {
        match role {
            FolderRole::Input => &mut self.recent_input_folders,
            FolderRole::Output => &mut self.recent_output_folders,
        }
    }

    /// Add or refresh a recent folder
    pub fn add_recent_folder(&mut self, role: FolderRole, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let recents = self.recents_mut(role);

        // Remove existing entry for this path
        recents.retain(|f| f.path != path);

        recents.insert(0, RecentFolder::new(path));
        recents.truncate(MAX_RECENT_FOLDERS);
    }

    pub fn add_recent_input_folder(&mut self, path: impl AsRef<Path>) {
        self.add_recent_folder(FolderRole::Input, path);
    }

    pub fn add_recent_output_folder(&mut self, path: impl AsRef<Path>) {
        self.add_recent_folder(FolderRole::Output, path);
    }

    /// Most recently used folder for `role`
    pub fn last_folder(&self, role: FolderRole) -> Option<&Path> {
        let recents = match role {
            FolderRole::Input => &self.recent_input_folders,
            FolderRole::Output => &self.recent_output_folders,
        };
        recents.first().map(|f| f.path.as_path())
    }

    /// Clean up recent folders that no longer exist
    pub fn cleanup_missing_folders(&mut self) {
        self.recent_input_folders.retain(|f| f.exists());
        self.recent_output_folders.retain(|f| f.exists());

        if let Some(ref last) = self.last_pipeline_path {
            if !last.exists() {
                self.last_pipeline_path = None;
            }
        }
    }

    pub fn set_last_pipeline(&mut self, path: impl Into<PathBuf>) {
        self.last_pipeline_path = Some(path.into());
    }

    /// Get the last pipeline path if it still exists
    pub fn get_last_pipeline(&self) -> Option<&Path> {
        self.last_pipeline_path
            .as_ref()
            .filter(|p| p.exists())
            .map(|p| p.as_path())
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_default() {
        let state = AppState::default();
        assert!(state.recent_input_folders.is_empty());
        assert!(state.last_pipeline_path.is_none());
        assert_eq!(state.version, 1);
    }

    #[test]
    fn test_add_recent_folder() {
        let mut state = AppState::default();

        state.add_recent_input_folder("/data/a");
        state.add_recent_input_folder("/data/b");
        assert_eq!(state.recent_input_folders.len(), 2);
        assert_eq!(state.last_folder(FolderRole::Input), Some(Path::new("/data/b")));

        // Adding same path again should move it up, not duplicate
        state.add_recent_input_folder("/data/a");
        assert_eq!(state.recent_input_folders.len(), 2);
        assert_eq!(state.last_folder(FolderRole::Input), Some(Path::new("/data/a")));
        assert!(state.recent_output_folders.is_empty());
    }

    #[test]
    fn test_recent_folders_max_limit() {
        let mut state = AppState::default();
        for i in 0..15 {
            state.add_recent_output_folder(format!("/out/{}", i));
        }
        assert_eq!(state.recent_output_folders.len(), MAX_RECENT_FOLDERS);
        assert_eq!(state.last_folder(FolderRole::Output), Some(Path::new("/out/14")));
    }

    #[test]
    fn test_app_state_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_STATE_FILE);

        let mut state = AppState::default();
        state.add_recent_input_folder(dir.path());
        state.set_last_pipeline(dir.path().join("graph.json"));
        state.save_to(&path).unwrap();

        let loaded = AppState::load_from(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_cleanup_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::default();
        state.add_recent_input_folder(dir.path());
        state.add_recent_input_folder("/definitely/not/here");
        state.set_last_pipeline("/definitely/not/here.json");

        state.cleanup_missing_folders();
        assert_eq!(state.recent_input_folders.len(), 1);
        assert!(state.last_pipeline_path.is_none());
    }

    #[test]
    fn test_last_pipeline_only_if_present() {
        let dir = tempfile::tempdir().unwrap();
        let graph = dir.path().join("graph.json");
        let mut state = AppState::default();
        assert!(state.get_last_pipeline().is_none());

        state.set_last_pipeline(&graph);
        assert!(state.get_last_pipeline().is_none());

        std::fs::write(&graph, "{}").unwrap();
        assert_eq!(state.get_last_pipeline(), Some(graph.as_path()));
    }

    #[test]
    fn test_corrupt_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_STATE_FILE);
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(AppState::load_from(&path), Err(NeuroPixelError::Config(_))));
    }
}
