//! Image revision tracking
//!
//! This module owns the canonical list of images in the current session and
//! the rules for how a plugin's output supersedes or creates a derived image.
//!
//! # Features
//!
//! - Insert, patch, remove and select images through [`ImageSession`]
//! - Copy-then-replace reconciliation: one visible working copy per original
//! - In-place reconciliation: rewrite locators of the edited image
//! - Bounded undo/redo of in-place edits via [`UndoHistory`]
//!
//! # Lineage
//!
//! ```text
//! photo.png (original) ◄── source_id ── photo_copy.png (result)
//! ```
//!
//! A derived copy always points at the root original, never at an
//! intermediate copy, so the chain is at most one hop long for images the
//! session creates itself.

pub mod history;
pub mod tracker;
pub mod types;

pub use history::UndoHistory;
pub use tracker::{copy_name, ImageSession};
pub use types::{ReconcileMode, RevisionOutput};
