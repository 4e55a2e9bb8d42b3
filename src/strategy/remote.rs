use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{PackingStrategy, StrategyKind, StrategyOutcome};
use crate::catalog::PackagingCatalogCache;
use crate::error::ResolutionError;
use crate::model::Product;
use crate::remote::{RemotePackingApi, RemotePackingOutcome};
use crate::results::ResultStore;

/// Asks the remote optimizer for a single-bin packing and stores the answer.
pub struct RemoteOptimizerStrategy {
    api: Arc<dyn RemotePackingApi>,
    catalog: Arc<PackagingCatalogCache>,
    results: ResultStore,
}

impl RemoteOptimizerStrategy {
    pub fn new(
        api: Arc<dyn RemotePackingApi>,
        catalog: Arc<PackagingCatalogCache>,
        results: ResultStore,
    ) -> Self {
        Self {
            api,
            catalog,
            results,
        }
    }
}

#[async_trait]
impl PackingStrategy for RemoteOptimizerStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Remote
    }

    async fn resolve(&self, products: &[Product]) -> Result<StrategyOutcome, ResolutionError> {
        if products.is_empty() {
            return Err(ResolutionError::invalid_input("no products to pack"));
        }

        let packagings = self.catalog.all_packagings().await?;
        if packagings.is_empty() {
            return Ok(StrategyOutcome::Miss);
        }

        let (packaging_id, volume_utilization) =
            match self.api.find_minimal_packaging(&packagings, products).await {
                Ok(RemotePackingOutcome::Packed {
                    packaging_id,
                    volume_utilization,
                }) => (packaging_id, volume_utilization),
                Ok(RemotePackingOutcome::Infeasible(reason)) => {
                    info!(%reason, "remote optimizer found no single packaging");
                    return Ok(StrategyOutcome::Miss);
                }
                Err(err) => {
                    warn!(error = %err, "remote optimizer unavailable, falling through");
                    return Ok(StrategyOutcome::Undecided);
                }
            };

        let packaging = self
            .catalog
            .find_packaging(packaging_id)
            .await?
            .ok_or_else(|| {
                ResolutionError::inconsistency(format!(
                    "remote optimizer chose packaging {packaging_id} which is not in the catalog"
                ))
            })?;

        let result = self
            .results
            .persist(packaging, products, volume_utilization)
            .await?;
        Ok(StrategyOutcome::Found(result))
    }
}
