//! # NeuroPixel: image workstation client core
//!
//! Client-side state for an image-analysis workstation whose processing
//! plugins run on a remote backend. The core has two halves that share the
//! plugin catalog:
//!
//! ## Architecture
//!
//! - **Session**: tracks uploaded images and the results derived from them,
//!   reconciling each plugin result by copy-then-replace or in place
//! - **Pipeline**: a typed node graph (load, operator, save, preview, note)
//!   that validates connections, orders nodes topologically and converts
//!   linear graphs into batch jobs
//! - **Plugins**: specs, parameter validation and a cached catalog
//! - **Client**: the backend collaborator trait and its HTTP implementation
//! - **Workstation**: ties the above together with per-lineage busy flags
//!   and undo for in-place edits
//!
//! ## Configuration
//!
//! Client settings and app state (recent folders) are stored in the
//! platform-appropriate data directory under `dev.neuropixel.client`:
//!
//! - **Linux**: `~/.local/share/dev.neuropixel.client/`
//! - **macOS**: `~/Library/Application Support/dev.neuropixel.client/`
//! - **Windows**: `%APPDATA%\dev.neuropixel.client\`
//!
//! ## Example
//!
//! ```ignore
//! use neuropixel::{
//!     client::HttpBackend,
//!     config::ClientConfig,
//!     session::ReconcileMode,
//!     plugins::ParamMap,
//!     Workstation,
//! };
//!
//! #[tokio::main]
//! async fn main() -> neuropixel::Result<()> {
//!     let config = ClientConfig::load_or_default();
//!     let backend = HttpBackend::new(&config)?;
//!     let mut workstation = Workstation::new(backend, config);
//!
//!     let bytes = std::fs::read("photo.png")?;
//!     let id = workstation.upload("photo.png", bytes).await?;
//!     workstation
//!         .run_plugin(&id, "gaussian_blur", &ParamMap::new(), ReconcileMode::CopyThenReplace)
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod picker;
pub mod pipeline;
pub mod plugins;
pub mod session;
pub mod types;
pub mod workstation;

// Re-export commonly used types
pub use client::{HttpBackend, ImageBackend};
pub use config::{AppState, ClientConfig};
pub use error::{NeuroPixelError, Result};
pub use pipeline::{PipelineCompiler, PipelineGraph};
pub use plugins::{PluginCatalog, PluginSpec};
pub use session::{ImageSession, ReconcileMode, UndoHistory};
pub use types::{Image, ImageId};
pub use workstation::{InvocationTicket, Workstation};
