//! Time-bounded cache of the packaging catalog.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::error::StoreError;
use crate::model::{Packaging, PackagingId};
use crate::store::PersistentStore;

pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
struct CatalogEntry {
    packagings: Arc<[Packaging]>,
    loaded_at: Instant,
}

/// Holds the whole packaging catalog as one cache entry.
///
/// The entry expires as a unit after the configured TTL. Concurrent callers
/// that observe an expired entry each reload it; reloads are plain reads of
/// the store, so the last writer simply wins.
pub struct PackagingCatalogCache {
    store: Arc<dyn PersistentStore>,
    ttl: Duration,
    entry: RwLock<Option<CatalogEntry>>,
}

impl PackagingCatalogCache {
    pub fn new(store: Arc<dyn PersistentStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entry: RwLock::new(None),
        }
    }

    async fn fresh(&self) -> Option<Arc<[Packaging]>> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|entry| entry.loaded_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.packagings))
    }

    /// Every packaging of the catalog. An empty catalog is a valid answer.
    pub async fn all_packagings(&self) -> Result<Arc<[Packaging]>, StoreError> {
        if let Some(packagings) = self.fresh().await {
            return Ok(packagings);
        }

        let packagings: Arc<[Packaging]> = self.store.find_all_packagings().await?.into();
        debug!(packagings = packagings.len(), "packaging catalog reloaded");

        *self.entry.write().await = Some(CatalogEntry {
            packagings: Arc::clone(&packagings),
            loaded_at: Instant::now(),
        });
        Ok(packagings)
    }

    /// Translates a packaging id reported by a packing backend into the
    /// catalog entry.
    ///
    /// A fresh cached catalog answers directly; otherwise the store is asked.
    pub async fn find_packaging(&self, id: PackagingId) -> Result<Option<Packaging>, StoreError> {
        if let Some(packagings) = self.fresh().await {
            if let Some(packaging) = packagings.iter().find(|packaging| packaging.id == id) {
                return Ok(Some(packaging.clone()));
            }
        }
        self.store.find_packaging_by_id(id).await
    }

    /// Drops the cached catalog so the next read hits the store.
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingStore, packaging};

    fn cache_over(store: &Arc<CountingStore>, ttl: Duration) -> PackagingCatalogCache {
        PackagingCatalogCache::new(Arc::clone(store) as Arc<dyn PersistentStore>, ttl)
    }

    #[tokio::test(start_paused = true)]
    async fn catalog_is_loaded_once_per_ttl() {
        let store = Arc::new(CountingStore::with_packagings(vec![packaging(1, 10.0)]));
        let cache = cache_over(&store, Duration::from_secs(60));

        assert_eq!(cache.all_packagings().await.unwrap().len(), 1);
        assert_eq!(cache.all_packagings().await.unwrap().len(), 1);
        assert_eq!(store.catalog_loads(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        cache.all_packagings().await.unwrap();
        assert_eq!(store.catalog_loads(), 2);
    }

    #[tokio::test]
    async fn empty_catalog_is_not_an_error() {
        let store = Arc::new(CountingStore::with_packagings(Vec::new()));
        let cache = cache_over(&store, DEFAULT_CATALOG_TTL);
        assert!(cache.all_packagings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_packaging_uses_cached_catalog() {
        let store = Arc::new(CountingStore::with_packagings(vec![
            packaging(1, 10.0),
            packaging(2, 20.0),
        ]));
        let cache = cache_over(&store, DEFAULT_CATALOG_TTL);
        cache.all_packagings().await.unwrap();

        let found = cache.find_packaging(PackagingId::new(2)).await.unwrap();
        assert_eq!(found.map(|p| p.id), Some(PackagingId::new(2)));
        assert_eq!(store.point_lookups(), 0);

        assert!(cache.find_packaging(PackagingId::new(9)).await.unwrap().is_none());
        assert_eq!(store.point_lookups(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let store = Arc::new(CountingStore::with_packagings(vec![packaging(1, 10.0)]));
        let cache = cache_over(&store, DEFAULT_CATALOG_TTL);
        cache.all_packagings().await.unwrap();
        cache.invalidate().await;
        cache.all_packagings().await.unwrap();
        assert_eq!(store.catalog_loads(), 2);
    }
}
