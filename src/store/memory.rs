use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PersistentStore, StoreDocument};
use crate::error::StoreError;
use crate::fingerprint::Fingerprint;
use crate::model::{MinimalPackaging, Packaging, PackagingId, Product};

/// Store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: RwLock<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_packagings(packagings: Vec<Packaging>) -> Self {
        Self {
            document: RwLock::new(StoreDocument::with_packagings(packagings)),
        }
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> StoreDocument {
        self.document.read().await.clone()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn find_all_packagings(&self) -> Result<Vec<Packaging>, StoreError> {
        Ok(self.document.read().await.packagings.clone())
    }

    async fn find_packaging_by_id(
        &self,
        id: PackagingId,
    ) -> Result<Option<Packaging>, StoreError> {
        Ok(self.document.read().await.packaging(id).cloned())
    }

    async fn find_result_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<MinimalPackaging>, StoreError> {
        self.document.read().await.result(fingerprint)
    }

    async fn save_result(&self, result: &MinimalPackaging) -> Result<(), StoreError> {
        self.document.write().await.insert_result(result)
    }

    async fn find_or_create_product(
        &self,
        sorted_dims: [f64; 3],
        weight: f64,
    ) -> Result<(Product, bool), StoreError> {
        Ok(self
            .document
            .write()
            .await
            .find_or_create_product(sorted_dims, weight))
    }

    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
