//! Persistent store capability.
//!
//! The resolver only needs a handful of operations from durable storage:
//! read the packaging catalog, find or create deduplicated products, and
//! read/write memoized results keyed by fingerprint. Two implementations
//! ship with the crate: [`MemoryStore`] and [`JsonFileStore`].

mod document;
mod file;
mod memory;

use async_trait::async_trait;

pub use document::{StoreDocument, StoredResult};
pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::fingerprint::Fingerprint;
use crate::model::{MinimalPackaging, Packaging, PackagingId, Product};

#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Every packaging in the catalog, in storage order.
    async fn find_all_packagings(&self) -> Result<Vec<Packaging>, StoreError>;

    async fn find_packaging_by_id(&self, id: PackagingId)
    -> Result<Option<Packaging>, StoreError>;

    async fn find_result_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<MinimalPackaging>, StoreError>;

    /// Writes a new result.
    ///
    /// Fails with [`StoreError::DuplicateFingerprint`] when a result with the
    /// same fingerprint exists already.
    async fn save_result(&self, result: &MinimalPackaging) -> Result<(), StoreError>;

    /// Returns the product with exactly these (ascending) dimensions and
    /// weight, creating it when missing. The flag tells whether it was created.
    async fn find_or_create_product(
        &self,
        sorted_dims: [f64; 3],
        weight: f64,
    ) -> Result<(Product, bool), StoreError>;

    /// Makes every pending write durable.
    async fn flush(&self) -> Result<(), StoreError>;
}
