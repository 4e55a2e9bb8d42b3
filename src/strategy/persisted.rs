use async_trait::async_trait;
use tracing::debug;

use super::{PackingStrategy, StrategyKind, StrategyOutcome};
use crate::error::ResolutionError;
use crate::fingerprint::Fingerprint;
use crate::model::Product;
use crate::results::ResultStore;

/// Answers from previously stored results only.
///
/// A missing record says nothing about feasibility, so a miss here always
/// lets the chain continue.
pub struct PersistedLookupStrategy {
    results: ResultStore,
}

impl PersistedLookupStrategy {
    pub fn new(results: ResultStore) -> Self {
        Self { results }
    }
}

#[async_trait]
impl PackingStrategy for PersistedLookupStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Persisted
    }

    async fn resolve(&self, products: &[Product]) -> Result<StrategyOutcome, ResolutionError> {
        let fingerprint = Fingerprint::of(products)?;
        match self.results.lookup(&fingerprint).await? {
            Some(result) => {
                debug!(%fingerprint, "stored result found");
                Ok(StrategyOutcome::Found(result))
            }
            None => Ok(StrategyOutcome::Miss),
        }
    }
}
