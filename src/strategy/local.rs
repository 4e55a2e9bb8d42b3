use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{PackingStrategy, StrategyKind, StrategyOutcome};
use crate::catalog::PackagingCatalogCache;
use crate::engine::{EngineBox, EngineError, EngineItem, LocalPackingEngine};
use crate::error::ResolutionError;
use crate::model::Product;
use crate::results::ResultStore;

/// Packs the products with the in-process engine and stores the answer.
///
/// Never undecided: the engine has no external dependency.
pub struct LocalHeuristicStrategy {
    engine: Arc<dyn LocalPackingEngine>,
    catalog: Arc<PackagingCatalogCache>,
    results: ResultStore,
}

impl LocalHeuristicStrategy {
    pub fn new(
        engine: Arc<dyn LocalPackingEngine>,
        catalog: Arc<PackagingCatalogCache>,
        results: ResultStore,
    ) -> Self {
        Self {
            engine,
            catalog,
            results,
        }
    }
}

#[async_trait]
impl PackingStrategy for LocalHeuristicStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Local
    }

    async fn resolve(&self, products: &[Product]) -> Result<StrategyOutcome, ResolutionError> {
        if products.is_empty() {
            return Err(ResolutionError::invalid_input("no products to pack"));
        }

        let packagings = self.catalog.all_packagings().await?;
        if packagings.is_empty() {
            return Ok(StrategyOutcome::Miss);
        }

        let boxes: Vec<EngineBox> = packagings.iter().map(EngineBox::from_packaging).collect();
        let items: Vec<EngineItem> = products.iter().map(EngineItem::from_product).collect();
        let engine = Arc::clone(&self.engine);

        let packed = tokio::task::spawn_blocking(move || engine.pack(&boxes, &items))
            .await
            .map_err(|err| {
                ResolutionError::inconsistency(format!("local packing task failed: {err}"))
            })?;

        let packed = match packed {
            Ok(packed) => packed,
            Err(EngineError::NoBoxesAvailable(product)) => {
                debug!(%product, "no packaging can hold product");
                return Ok(StrategyOutcome::Miss);
            }
            Err(EngineError::NothingToPack) => {
                return Err(ResolutionError::invalid_input("no products to pack"));
            }
        };

        let used = match packed.as_slice() {
            [] => return Ok(StrategyOutcome::Miss),
            [single] => single,
            many => {
                return Err(ResolutionError::inconsistency(format!(
                    "local engine needed {} packagings for a single-packaging request",
                    many.len()
                )));
            }
        };

        let packaging = self
            .catalog
            .find_packaging(used.reference)
            .await?
            .ok_or_else(|| {
                ResolutionError::inconsistency(format!(
                    "local engine used packaging {} which is not in the catalog",
                    used.reference
                ))
            })?;

        info!(packaging = %packaging.id, items = products.len(), "local engine packed all products");
        let result = self
            .results
            .persist(packaging, products, used.volume_utilization)
            .await?;
        Ok(StrategyOutcome::Found(result))
    }
}
