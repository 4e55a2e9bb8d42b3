//! Deduplication of requested items into durable products.

use std::sync::Arc;

use tracing::debug;

use crate::error::ResolutionError;
use crate::model::{Product, RequestedItem};
use crate::store::PersistentStore;

/// Maps requested items onto stored products.
///
/// Items with the same dimensions (in any orientation) and the same weight
/// become the same product, whatever id the caller gave them.
#[derive(Clone)]
pub struct ProductRegistry {
    store: Arc<dyn PersistentStore>,
}

impl ProductRegistry {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    /// Returns one product per item, in request order.
    pub async fn normalize(&self, items: &[RequestedItem]) -> Result<Vec<Product>, ResolutionError> {
        let mut products = Vec::with_capacity(items.len());
        let mut created = 0usize;

        for item in items {
            item.validate().map_err(|err| {
                ResolutionError::invalid_input(format!("item {}: {err}", item.id))
            })?;
            let (product, is_new) = self
                .store
                .find_or_create_product(item.sorted_dims(), item.weight)
                .await?;
            if is_new {
                created += 1;
            }
            products.push(product);
        }

        if created > 0 {
            self.store.flush().await?;
            debug!(created, "new products registered");
        }
        Ok(products)
    }
}
