use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::fingerprint::Fingerprint;
use crate::model::{MinimalPackaging, Packaging, PackagingId, Product, ProductId};

/// A memoized result as it is stored: the packaging is referenced by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub fingerprint: Fingerprint,
    pub packaging_id: PackagingId,
    pub volume_utilization: f64,
}

/// Complete store contents, shared by the in-memory and the file store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub packagings: Vec<Packaging>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub results: Vec<StoredResult>,
}

impl StoreDocument {
    pub fn with_packagings(packagings: Vec<Packaging>) -> Self {
        Self {
            packagings,
            ..Self::default()
        }
    }

    pub fn packaging(&self, id: PackagingId) -> Option<&Packaging> {
        self.packagings.iter().find(|packaging| packaging.id == id)
    }

    pub fn result(&self, fingerprint: &Fingerprint) -> Result<Option<MinimalPackaging>, StoreError> {
        let Some(stored) = self
            .results
            .iter()
            .find(|stored| &stored.fingerprint == fingerprint)
        else {
            return Ok(None);
        };

        let packaging = self.packaging(stored.packaging_id).ok_or_else(|| {
            StoreError::Unavailable(format!(
                "result {} references unknown packaging {}",
                stored.fingerprint, stored.packaging_id
            ))
        })?;

        Ok(Some(MinimalPackaging::new(
            packaging.clone(),
            stored.fingerprint.clone(),
            stored.volume_utilization,
        )))
    }

    pub fn insert_result(&mut self, result: &MinimalPackaging) -> Result<(), StoreError> {
        if self
            .results
            .iter()
            .any(|stored| &stored.fingerprint == result.fingerprint())
        {
            return Err(StoreError::DuplicateFingerprint(
                result.fingerprint().clone(),
            ));
        }

        self.results.push(StoredResult {
            fingerprint: result.fingerprint().clone(),
            packaging_id: result.packaging().id,
            volume_utilization: result.volume_utilization(),
        });
        Ok(())
    }

    pub fn find_or_create_product(&mut self, sorted_dims: [f64; 3], weight: f64) -> (Product, bool) {
        if let Some(existing) = self
            .products
            .iter()
            .find(|product| product.matches(&sorted_dims, weight))
        {
            return (existing.clone(), false);
        }

        let next_id = self
            .products
            .iter()
            .map(|product| product.id.get())
            .max()
            .unwrap_or(0)
            + 1;
        let product = Product {
            id: ProductId::new(next_id),
            dims: sorted_dims,
            weight,
        };
        self.products.push(product.clone());
        (product, true)
    }
}
