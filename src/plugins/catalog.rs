//! Plugin catalog: the spec list plus its category index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{NeuroPixelError, Result};
use crate::plugins::spec::PluginSpec;

/// All plugins the backend offers, as returned by `GET /plugins`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginCatalog {
    pub plugins: Vec<PluginSpec>,
    /// Category name to plugin names
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
}

impl PluginCatalog {
    /// Build a catalog and its category index from bare specs
    pub fn from_specs(plugins: Vec<PluginSpec>) -> Self {
        let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for spec in &plugins {
            categories
                .entry(spec.category.clone())
                .or_default()
                .push(spec.name.clone());
        }
        Self { plugins, categories }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PluginSpec> {
        self.plugins.iter().find(|p| p.name == name)
    }

    /// Like [`get`](Self::get) but reports a missing plugin as an error
    pub fn require(&self, name: &str) -> Result<&PluginSpec> {
        self.get(name)
            .ok_or_else(|| NeuroPixelError::NotFound(format!("plugin '{}'", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.name.as_str())
    }

    /// Specs grouped by category, in the order the index lists them
    pub fn by_category(&self) -> BTreeMap<&str, Vec<&PluginSpec>> {
        let mut grouped: BTreeMap<&str, Vec<&PluginSpec>> = BTreeMap::new();
        for (category, names) in &self.categories {
            let specs = names.iter().filter_map(|n| self.get(n)).collect();
            grouped.insert(category.as_str(), specs);
        }
        // Specs missing from the index still show up under their own category
        for spec in &self.plugins {
            let listed = self
                .categories
                .get(&spec.category)
                .is_some_and(|names| names.contains(&spec.name));
            if !listed {
                grouped.entry(spec.category.as_str()).or_default().push(spec);
            }
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PluginCatalog {
        PluginCatalog::from_specs(vec![
            PluginSpec::new("gaussian_blur", "Gaussian Blur", "Filters"),
            PluginSpec::new("otsu_threshold", "Otsu Threshold", "Segmentation"),
            PluginSpec::new("denoise", "Denoise", "Filters"),
        ])
    }

    #[test]
    fn test_category_index() {
        let catalog = catalog();
        assert_eq!(catalog.categories["Filters"], vec!["gaussian_blur", "denoise"]);
        assert_eq!(catalog.categories["Segmentation"], vec!["otsu_threshold"]);
    }

    #[test]
    fn test_lookup() {
        let catalog = catalog();
        assert_eq!(catalog.get("denoise").unwrap().display_name, "Denoise");
        assert!(matches!(catalog.require("nope"), Err(NeuroPixelError::NotFound(_))));
    }

    #[test]
    fn test_by_category_includes_unindexed() {
        let mut catalog = catalog();
        catalog.plugins.push(PluginSpec::new("canny_edge", "Canny", "Edge Detection"));

        let grouped = catalog.by_category();
        assert_eq!(grouped["Filters"].len(), 2);
        assert_eq!(grouped["Edge Detection"][0].name, "canny_edge");
    }
}
