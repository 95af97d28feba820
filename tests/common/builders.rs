//! Test data builders for creating test objects

use neuropixel::plugins::{DataKind, PluginCatalog, PluginParam, PluginRunResponse, PluginSpec};
use neuropixel::types::{Image, ImageMetadata};
use serde_json::Map;

pub const BACKEND: &str = "http://localhost:8000";

/// Builder for uploaded (original) images
pub struct ImageBuilder {
    id: String,
    name: String,
    width: u32,
    height: u32,
}

impl ImageBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("{}.png", id),
            width: 640,
            height: 480,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn build(self) -> Image {
        Image::original(
            self.id.as_str(),
            self.name,
            format!("{}/images/{}/preview", BACKEND, self.id),
            format!("{}/images/{}/thumbnail", BACKEND, self.id),
        )
        .with_metadata(ImageMetadata {
            width: self.width,
            height: self.height,
            channels: 3,
            ..ImageMetadata::default()
        })
    }
}

pub fn gaussian_blur() -> PluginSpec {
    PluginSpec::new("gaussian_blur", "Gaussian Blur", "Filters")
        .with_icon("blur_on")
        .with_param(PluginParam::float("sigma", 1.0, 0.1, 10.0))
}

pub fn otsu_threshold() -> PluginSpec {
    PluginSpec::new("otsu_threshold", "Otsu Threshold", "Segmentation")
        .with_param(PluginParam::boolean("invert", false))
        .with_io(DataKind::Image, DataKind::Mask)
}

pub fn canny_edge() -> PluginSpec {
    PluginSpec::new("canny_edge", "Canny Edge Detection", "Edge Detection")
        .with_param(PluginParam::range("threshold", 0.1, 0.2, 0.0, 1.0))
        .with_param(PluginParam::select("method", "auto", &["auto", "manual"]))
}

/// Catalog with the three standard test plugins
pub fn test_catalog() -> PluginCatalog {
    PluginCatalog::from_specs(vec![gaussian_blur(), otsu_threshold(), canny_edge()])
}

/// A successful run response for `result_id`
pub fn run_response(plugin: &str, result_id: &str) -> PluginRunResponse {
    PluginRunResponse {
        success: true,
        result_id: result_id.into(),
        result_url: format!("{}/images/{}/preview", BACKEND, result_id),
        thumbnail_url: Some(format!("{}/images/{}/thumbnail", BACKEND, result_id)),
        execution_time_ms: 12.5,
        plugin_name: plugin.to_string(),
        params_used: Map::new(),
    }
}
