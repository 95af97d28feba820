//! Core data types for the NeuroPixel client
//!
//! This module contains the image records shared between the session
//! tracker, the backend client and the pipeline graph.
//!
//! # Main Types
//!
//! - [`ImageId`] - Backend-assigned identifier of an image
//! - [`ImageMetadata`] - Dimensions, channels, bit depth and byte size
//! - [`Image`] - One image visible to the user, original or derived
//! - [`ImagePatch`] - Partial update merged by `ImageSession::update_image`
//!
//! # Lineage
//!
//! An image produced by a plugin carries `is_result = true` and a `source_id`
//! naming the original it was derived from. Uploaded images are originals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-assigned identifier of an image. Assumed globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ImageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Image properties reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    /// Human readable depth as reported by the backend, e.g. "8-bit", "32-bit Float"
    pub bit_depth: String,
    /// Size of the stored file in bytes
    pub file_size: u64,
}

impl Default for ImageMetadata {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            channels: 0,
            bit_depth: "8-bit".to_string(),
            file_size: 0,
        }
    }
}

/// One image artifact visible to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    /// Display name, e.g. `photo.png` or `photo_copy.png`
    pub name: String,
    /// Full-resolution preview locator
    pub url: String,
    /// Thumbnail locator
    pub thumbnail_url: String,
    #[serde(default)]
    pub metadata: ImageMetadata,
    /// Original image this one was derived from
    #[serde(default)]
    pub source_id: Option<ImageId>,
    /// True when the image was produced by a plugin rather than uploaded
    #[serde(default)]
    pub is_result: bool,
}

impl Image {
    /// Create an original (uploaded) image record
    pub fn original(
        id: impl Into<ImageId>,
        name: impl Into<String>,
        url: impl Into<String>,
        thumbnail_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            thumbnail_url: thumbnail_url.into(),
            metadata: ImageMetadata::default(),
            source_id: None,
            is_result: false,
        }
    }

    /// Mark this record as a plugin result derived from `source`
    pub fn derived_from(mut self, source: impl Into<ImageId>) -> Self {
        self.source_id = Some(source.into());
        self.is_result = true;
        self
    }

    pub fn with_metadata(mut self, metadata: ImageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// File extension of the display name, without the dot
    pub fn extension(&self) -> Option<&str> {
        split_extension(&self.name).1
    }
}

/// Split a display name into base and extension (`photo.png` -> `photo`, `png`).
///
/// A leading dot does not start an extension (`.hidden` has none).
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Partial update for an image record. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImagePatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub metadata: Option<ImageMetadata>,
    pub source_id: Option<ImageId>,
    pub is_result: Option<bool>,
}

impl ImagePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn thumbnail_url(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    pub fn metadata(mut self, metadata: ImageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Merge this patch into `image`
    pub fn apply_to(self, image: &mut Image) {
        if let Some(name) = self.name {
            image.name = name;
        }
        if let Some(url) = self.url {
            image.url = url;
        }
        if let Some(thumbnail_url) = self.thumbnail_url {
            image.thumbnail_url = thumbnail_url;
        }
        if let Some(metadata) = self.metadata {
            image.metadata = metadata;
        }
        if let Some(source_id) = self.source_id {
            image.source_id = Some(source_id);
        }
        if let Some(is_result) = self.is_result {
            image.is_result = is_result;
        }
    }
}

/// Append a `t=<stamp>` query parameter so viewers refetch a rewritten locator.
///
/// An existing `t` parameter is replaced rather than repeated.
pub fn cache_busted(url: &str, stamp_ms: i64) -> String {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    };

    let stamp = format!("t={}", stamp_ms);
    let mut params: Vec<&str> = query
        .map(|q| {
            q.split('&')
                .filter(|p| !p.is_empty() && *p != "t" && !p.starts_with("t="))
                .collect()
        })
        .unwrap_or_default();
    params.push(&stamp);
    format!("{}?{}", base, params.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("photo.png"), ("photo", Some("png")));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_extension("README"), ("README", None));
        assert_eq!(split_extension(".hidden"), (".hidden", None));
        assert_eq!(split_extension("trailing."), ("trailing.", None));
    }

    #[test]
    fn test_cache_busted() {
        assert_eq!(
            cache_busted("http://localhost:8000/images/a/preview", 42),
            "http://localhost:8000/images/a/preview?t=42"
        );
        assert_eq!(
            cache_busted("http://h/images/a/thumbnail?size=80", 7),
            "http://h/images/a/thumbnail?size=80&t=7"
        );
        assert_eq!(cache_busted("http://h/p?t=1&size=80", 2), "http://h/p?size=80&t=2");
    }

    #[test]
    fn test_patch_apply() {
        let mut image = Image::original("a", "photo.png", "u", "t");
        ImagePatch::new().url("u2").apply_to(&mut image);
        assert_eq!(image.url, "u2");
        assert_eq!(image.thumbnail_url, "t");
        assert_eq!(image.name, "photo.png");
    }

    #[test]
    fn test_image_deserialize_upload_response() {
        let json = r#"{
            "id": "abc",
            "name": "photo.png",
            "url": "http://localhost:8000/images/abc/preview",
            "thumbnail_url": "http://localhost:8000/images/abc/thumbnail",
            "metadata": {"width": 640, "height": 480, "channels": 3, "bit_depth": "8-bit", "file_size": 1024},
            "source_id": null
        }"#;
        let image: Image = serde_json::from_str(json).unwrap();
        assert_eq!(image.id, ImageId::from("abc"));
        assert!(!image.is_result);
        assert_eq!(image.metadata.width, 640);
        assert_eq!(image.extension(), Some("png"));
    }
}
