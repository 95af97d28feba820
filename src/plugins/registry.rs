//! Time-bounded cache of the plugin catalog.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::plugins::catalog::PluginCatalog;

/// How long a fetched catalog stays valid by default
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(300);

/// Holds the last fetched catalog until it expires or is invalidated
#[derive(Debug, Clone)]
pub struct CatalogCache {
    ttl: Duration,
    entry: Option<(Instant, Arc<PluginCatalog>)>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_TTL)
    }
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached catalog if it has not expired
    pub fn cached(&self) -> Option<Arc<PluginCatalog>> {
        self.cached_at(Instant::now())
    }

    fn cached_at(&self, now: Instant) -> Option<Arc<PluginCatalog>> {
        match &self.entry {
            Some((fetched, catalog)) if now.duration_since(*fetched) < self.ttl => {
                Some(Arc::clone(catalog))
            }
            _ => None,
        }
    }

    /// Replace the cached catalog
    pub fn store(&mut self, catalog: PluginCatalog) -> Arc<PluginCatalog> {
        self.store_at(catalog, Instant::now())
    }

    fn store_at(&mut self, catalog: PluginCatalog, now: Instant) -> Arc<PluginCatalog> {
        let catalog = Arc::new(catalog);
        self.entry = Some((now, Arc::clone(&catalog)));
        catalog
    }

    /// Return the cached catalog, calling `fetch` when it is missing or stale.
    ///
    /// A failed fetch leaves any previous entry in place.
    pub async fn get_or_fetch<F, Fut>(&mut self, fetch: F) -> Result<Arc<PluginCatalog>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PluginCatalog>>,
    {
        if let Some(catalog) = self.cached() {
            return Ok(catalog);
        }

        let catalog = fetch().await?;
        tracing::debug!("Fetched plugin catalog ({} plugins)", catalog.len());
        Ok(self.store(catalog))
    }

    /// Drop the cached catalog so the next access refetches
    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            tracing::debug!("Plugin catalog cache invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NeuroPixelError;
    use crate::plugins::spec::PluginSpec;

    fn one_plugin() -> PluginCatalog {
        PluginCatalog::from_specs(vec![PluginSpec::new("gaussian_blur", "Gaussian Blur", "Filters")])
    }

    #[test]
    fn test_expiry() {
        let mut cache = CatalogCache::new(Duration::from_secs(10));
        let start = Instant::now();
        cache.store_at(one_plugin(), start);

        assert!(cache.cached_at(start + Duration::from_secs(9)).is_some());
        assert!(cache.cached_at(start + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn test_invalidate() {
        let mut cache = CatalogCache::default();
        cache.store(one_plugin());
        assert!(cache.cached().is_some());
        cache.invalidate();
        assert!(cache.cached().is_none());
    }

    #[tokio::test]
    async fn test_get_or_fetch_uses_cache() {
        let mut cache = CatalogCache::default();
        let first = cache.get_or_fetch(|| async { Ok(one_plugin()) }).await.unwrap();
        assert_eq!(first.len(), 1);

        // Second call must not fetch
        let second = cache
            .get_or_fetch(|| async { Err(NeuroPixelError::Config("unexpected fetch".into())) })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_failed_fetch_propagates() {
        let mut cache = CatalogCache::default();
        let result = cache
            .get_or_fetch(|| async { Err(NeuroPixelError::service(503, None)) })
            .await;
        assert!(result.is_err());
        assert!(cache.cached().is_none());
    }
}
