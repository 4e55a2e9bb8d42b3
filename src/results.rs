//! Memoized minimal-packaging results.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{ResolutionError, StoreError};
use crate::fingerprint::Fingerprint;
use crate::model::{MinimalPackaging, Packaging, Product};
use crate::store::PersistentStore;

/// Read and write access to results keyed by product-set fingerprint.
#[derive(Clone)]
pub struct ResultStore {
    store: Arc<dyn PersistentStore>,
}

impl ResultStore {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    pub async fn lookup(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<MinimalPackaging>, StoreError> {
        self.store.find_result_by_fingerprint(fingerprint).await
    }

    /// Records `packaging` as the minimal packaging of `products`.
    ///
    /// When another request stored the same fingerprint in the meantime, the
    /// stored result wins and is returned instead.
    pub async fn persist(
        &self,
        packaging: Packaging,
        products: &[Product],
        volume_utilization: f64,
    ) -> Result<MinimalPackaging, ResolutionError> {
        if products.is_empty() {
            return Err(ResolutionError::invalid_input(
                "cannot persist a result for an empty product set",
            ));
        }

        let fingerprint = Fingerprint::of(products)?;
        let result = MinimalPackaging::new(packaging, fingerprint, volume_utilization);

        match self.store.save_result(&result).await {
            Ok(()) => {}
            Err(err) if err.is_duplicate() => {
                debug!(fingerprint = %result.fingerprint(), "result stored concurrently, re-reading");
                return match self.lookup(result.fingerprint()).await? {
                    Some(existing) => Ok(existing),
                    None => Err(StoreError::Unavailable(format!(
                        "result {} reported as duplicate but cannot be read",
                        result.fingerprint()
                    ))
                    .into()),
                };
            }
            Err(err) => return Err(err.into()),
        }
        self.store.flush().await?;

        info!(
            fingerprint = %result.fingerprint(),
            packaging = %result.packaging().id,
            volume_utilization = result.volume_utilization(),
            "minimal packaging stored"
        );
        Ok(result)
    }
}
