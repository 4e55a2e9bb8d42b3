use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::{PersistentStore, StoreDocument};
use crate::error::StoreError;
use crate::fingerprint::Fingerprint;
use crate::model::{MinimalPackaging, Packaging, PackagingId, Product};

/// Store backed by a single JSON document on disk.
///
/// The document is read once on [`JsonFileStore::open`]. Every change is
/// applied to a copy, written to disk (temporary file + rename) and only then
/// made visible, so a failed write leaves memory and file unchanged.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    document: RwLock<StoreDocument>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens the store, starting with an empty document when the file does
    /// not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let document = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<StoreDocument>(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "store file missing, starting with an empty store");
                StoreDocument::default()
            }
            Err(err) => return Err(StoreError::Io(err)),
        };

        info!(
            path = %path.display(),
            packagings = document.packagings.len(),
            products = document.products.len(),
            results = document.results.len(),
            "store loaded"
        );

        Ok(Self {
            path,
            document: RwLock::new(document),
            write_lock: Mutex::new(()),
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_document(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(document)?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, &bytes).await?;
        fs::rename(&temp_path, &self.path).await?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "store written");
        Ok(())
    }

    /// Applies `change` to a copy of the document and swaps it in once it is
    /// on disk. `change` reports whether it modified the copy.
    async fn commit<T>(
        &self,
        change: impl FnOnce(&mut StoreDocument) -> Result<(T, bool), StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.document.read().await.clone();
        let (value, changed) = change(&mut next)?;
        if changed {
            self.write_document(&next).await?;
            *self.document.write().await = next;
        }
        Ok(value)
    }
}

#[async_trait]
impl PersistentStore for JsonFileStore {
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
        self.commit(|document| document.insert_result(result).map(|()| ((), true)))
            .await
    }

    async fn find_or_create_product(
        &self,
        sorted_dims: [f64; 3],
        weight: f64,
    ) -> Result<(Product, bool), StoreError> {
        self.commit(|document| {
            let (product, created) = document.find_or_create_product(sorted_dims, weight);
            Ok(((product, created), created))
        })
        .await
    }

    /// Writes go to disk as they happen; this only rewrites the current
    /// document.
    async fn flush(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let document = self.document.read().await.clone();
        self.write_document(&document).await
    }
}
