//! Session data types

use serde::{Deserialize, Serialize};

use crate::types::ImageId;

/// How a successful plugin result is folded back into the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// Keep the original untouched and maintain one derived working copy
    #[default]
    CopyThenReplace,
    /// Rewrite the target image's locators; undo is handled by the caller
    InPlace,
}

impl ReconcileMode {
    /// Check if this mode mutates the target record
    pub fn is_destructive(&self) -> bool {
        matches!(self, ReconcileMode::InPlace)
    }

    /// Display name for the mode
    pub fn display_name(&self) -> &'static str {
        match self {
            ReconcileMode::CopyThenReplace => "Copy then replace",
            ReconcileMode::InPlace => "In place",
        }
    }

    /// Get all modes
    pub fn all() -> &'static [ReconcileMode] {
        &[ReconcileMode::CopyThenReplace, ReconcileMode::InPlace]
    }
}

impl std::fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// The part of a successful plugin run the session needs to reconcile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionOutput {
    /// Identifier the backend assigned to the processed image
    pub result_id: ImageId,
    pub result_url: String,
    /// Falls back to `result_url` when the backend sends none
    pub thumbnail_url: Option<String>,
}

impl RevisionOutput {
    pub fn new(result_id: impl Into<ImageId>, result_url: impl Into<String>) -> Self {
        Self {
            result_id: result_id.into(),
            result_url: result_url.into(),
            thumbnail_url: None,
        }
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// Thumbnail locator, or the full result locator when none was sent
    pub fn thumbnail_or_result(&self) -> &str {
        self.thumbnail_url.as_deref().unwrap_or(&self.result_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_mode_serde() {
        let json = serde_json::to_string(&ReconcileMode::InPlace).unwrap();
        assert_eq!(json, "\"in_place\"");
        let mode: ReconcileMode = serde_json::from_str("\"copy_then_replace\"").unwrap();
        assert_eq!(mode, ReconcileMode::CopyThenReplace);
        assert_eq!(ReconcileMode::default(), ReconcileMode::CopyThenReplace);
    }

    #[test]
    fn test_thumbnail_fallback() {
        let out = RevisionOutput::new("r1", "http://h/images/r1/preview");
        assert_eq!(out.thumbnail_or_result(), "http://h/images/r1/preview");
        let out = out.with_thumbnail("http://h/images/r1/thumbnail");
        assert_eq!(out.thumbnail_or_result(), "http://h/images/r1/thumbnail");
    }
}
