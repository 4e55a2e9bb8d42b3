//! Ordered fallback over packing strategies.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::PackagingCatalogCache;
use crate::engine::LocalPackingEngine;
use crate::error::ResolutionError;
use crate::model::{MinimalPackaging, Product};
use crate::remote::RemotePackingApi;
use crate::results::ResultStore;
use crate::strategy::{
    LocalHeuristicStrategy, PackingStrategy, PersistedLookupStrategy, RemoteOptimizerStrategy,
    StrategyKind, StrategyOutcome,
};

/// Tries strategies in order until one finds a packaging.
///
/// Misses and undecided answers fall through; errors stop the chain at once.
#[derive(Clone)]
pub struct ResolutionChain {
    strategies: Vec<Arc<dyn PackingStrategy>>,
}

impl ResolutionChain {
    pub fn new(strategies: Vec<Arc<dyn PackingStrategy>>) -> Self {
        Self { strategies }
    }

    /// Builds the chain in the given order.
    ///
    /// The remote strategy is left out when no remote API is available.
    pub fn assemble(
        order: &[StrategyKind],
        results: ResultStore,
        catalog: Arc<PackagingCatalogCache>,
        remote: Option<Arc<dyn RemotePackingApi>>,
        engine: Arc<dyn LocalPackingEngine>,
    ) -> Self {
        let mut strategies: Vec<Arc<dyn PackingStrategy>> = Vec::with_capacity(order.len());
        for kind in order {
            match kind {
                StrategyKind::Persisted => {
                    strategies.push(Arc::new(PersistedLookupStrategy::new(results.clone())));
                }
                StrategyKind::Remote => match &remote {
                    Some(api) => strategies.push(Arc::new(RemoteOptimizerStrategy::new(
                        Arc::clone(api),
                        Arc::clone(&catalog),
                        results.clone(),
                    ))),
                    None => warn!("remote strategy requested but no remote API configured, skipping"),
                },
                StrategyKind::Local => {
                    strategies.push(Arc::new(LocalHeuristicStrategy::new(
                        Arc::clone(&engine),
                        Arc::clone(&catalog),
                        results.clone(),
                    )));
                }
            }
        }
        Self::new(strategies)
    }

    pub fn order(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|strategy| strategy.kind()).collect()
    }

    /// Resolves the minimal packaging of `products`.
    ///
    /// `Ok(None)` means no strategy found a single packaging for them.
    pub async fn resolve(
        &self,
        products: &[Product],
    ) -> Result<Option<MinimalPackaging>, ResolutionError> {
        if products.is_empty() {
            return Err(ResolutionError::invalid_input("no products to pack"));
        }

        for strategy in &self.strategies {
            let kind = strategy.kind();
            let outcome = strategy.resolve(products).await?;
            debug!(strategy = %kind, outcome = outcome.label(), "strategy answered");

            if let StrategyOutcome::Found(result) = outcome {
                info!(
                    strategy = %kind,
                    fingerprint = %result.fingerprint(),
                    packaging = %result.packaging().id,
                    "minimal packaging resolved"
                );
                return Ok(Some(result));
            }
        }

        info!(products = products.len(), "no strategy found a minimal packaging");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::fingerprint::Fingerprint;
    use crate::testing::{packaging, product};

    enum Scripted {
        Found(u64),
        Miss,
        Undecided,
        Fails,
    }

    struct ScriptedStrategy {
        kind: StrategyKind,
        answer: Scripted,
        log: Arc<Mutex<Vec<StrategyKind>>>,
    }

    #[async_trait]
    impl PackingStrategy for ScriptedStrategy {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        async fn resolve(&self, products: &[Product]) -> Result<StrategyOutcome, ResolutionError> {
            self.log.lock().unwrap().push(self.kind);
            match self.answer {
                Scripted::Found(id) => Ok(StrategyOutcome::Found(MinimalPackaging::new(
                    packaging(id, 10.0),
                    Fingerprint::of(products)?,
                    0.5,
                ))),
                Scripted::Miss => Ok(StrategyOutcome::Miss),
                Scripted::Undecided => Ok(StrategyOutcome::Undecided),
                Scripted::Fails => Err(ResolutionError::inconsistency("two boxes")),
            }
        }
    }

    fn chain(
        script: Vec<(StrategyKind, Scripted)>,
    ) -> (ResolutionChain, Arc<Mutex<Vec<StrategyKind>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let strategies = script
            .into_iter()
            .map(|(kind, answer)| {
                Arc::new(ScriptedStrategy {
                    kind,
                    answer,
                    log: Arc::clone(&log),
                }) as Arc<dyn PackingStrategy>
            })
            .collect();
        (ResolutionChain::new(strategies), log)
    }

    fn products() -> Vec<Product> {
        vec![product(1, [1.0, 1.0, 1.0], 1.0)]
    }

    #[tokio::test]
    async fn first_found_wins() {
        let (chain, log) = chain(vec![
            (StrategyKind::Persisted, Scripted::Found(1)),
            (StrategyKind::Remote, Scripted::Found(2)),
        ]);
        let result = chain.resolve(&products()).await.unwrap().unwrap();
        assert_eq!(result.packaging().id.get(), 1);
        assert_eq!(*log.lock().unwrap(), vec![StrategyKind::Persisted]);
    }

    #[tokio::test]
    async fn misses_and_undecided_fall_through() {
        let (chain, log) = chain(vec![
            (StrategyKind::Persisted, Scripted::Miss),
            (StrategyKind::Remote, Scripted::Undecided),
            (StrategyKind::Local, Scripted::Found(3)),
        ]);
        let result = chain.resolve(&products()).await.unwrap().unwrap();
        assert_eq!(result.packaging().id.get(), 3);
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn geometric_miss_does_not_stop_the_chain() {
        let (chain, log) = chain(vec![
            (StrategyKind::Remote, Scripted::Miss),
            (StrategyKind::Local, Scripted::Miss),
        ]);
        assert!(chain.resolve(&products()).await.unwrap().is_none());
        assert_eq!(
            *log.lock().unwrap(),
            vec![StrategyKind::Remote, StrategyKind::Local]
        );
    }

    #[tokio::test]
    async fn errors_stop_the_chain() {
        let (chain, log) = chain(vec![
            (StrategyKind::Remote, Scripted::Fails),
            (StrategyKind::Local, Scripted::Found(1)),
        ]);
        assert!(matches!(
            chain.resolve(&products()).await,
            Err(ResolutionError::EngineInconsistency(_))
        ));
        assert_eq!(*log.lock().unwrap(), vec![StrategyKind::Remote]);
    }

    #[test]
    fn assemble_skips_missing_remote() {
        let store = Arc::new(crate::store::MemoryStore::new());
        let catalog = Arc::new(PackagingCatalogCache::new(
            Arc::clone(&store) as Arc<dyn crate::store::PersistentStore>,
            crate::catalog::DEFAULT_CATALOG_TTL,
        ));
        let chain = ResolutionChain::assemble(
            &StrategyKind::DEFAULT_ORDER,
            ResultStore::new(store),
            catalog,
            None,
            crate::testing::StubEngine::using(vec![1]),
        );
        assert_eq!(
            chain.order(),
            vec![StrategyKind::Persisted, StrategyKind::Local]
        );
    }

    #[tokio::test]
    async fn empty_products_are_rejected_before_any_strategy() {
        let (chain, log) = chain(vec![(StrategyKind::Persisted, Scripted::Miss)]);
        assert!(matches!(
            chain.resolve(&[]).await,
            Err(ResolutionError::InvalidInput(_))
        ));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(chain.order(), vec![StrategyKind::Persisted]);
    }
}
