//! Packing strategies tried by the resolution chain.
//!
//! Every strategy answers with a [`StrategyOutcome`]. Only
//! [`StrategyOutcome::Found`] ends a resolution; a miss and an undecided
//! answer both hand over to the next strategy. Errors abort the resolution.

mod local;
mod persisted;
mod remote;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

pub use local::LocalHeuristicStrategy;
pub use persisted::PersistedLookupStrategy;
pub use remote::RemoteOptimizerStrategy;

use crate::error::ResolutionError;
use crate::model::{MinimalPackaging, Product};

#[derive(Clone, Debug, PartialEq)]
pub enum StrategyOutcome {
    /// A single packaging holds every product.
    Found(MinimalPackaging),
    /// This strategy has no result for the products.
    Miss,
    /// This strategy could not answer at all.
    Undecided,
}

impl StrategyOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            StrategyOutcome::Found(_) => "found",
            StrategyOutcome::Miss => "miss",
            StrategyOutcome::Undecided => "undecided",
        }
    }
}

#[async_trait]
pub trait PackingStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn resolve(&self, products: &[Product]) -> Result<StrategyOutcome, ResolutionError>;
}

/// Names of the strategies, as used in the configured order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Persisted,
    Remote,
    Local,
}

impl StrategyKind {
    pub const DEFAULT_ORDER: [StrategyKind; 3] =
        [StrategyKind::Persisted, StrategyKind::Remote, StrategyKind::Local];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Persisted => "persisted",
            StrategyKind::Remote => "remote",
            StrategyKind::Local => "local",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown strategy '{0}' (expected persisted, remote or local)")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "persisted" => Ok(StrategyKind::Persisted),
            "remote" => Ok(StrategyKind::Remote),
            "local" => Ok(StrategyKind::Local),
            _ => Err(UnknownStrategy(raw.trim().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_names_round_trip() {
        for kind in StrategyKind::DEFAULT_ORDER {
            assert_eq!(kind.as_str().parse::<StrategyKind>(), Ok(kind));
        }
        assert_eq!(" Remote ".parse::<StrategyKind>(), Ok(StrategyKind::Remote));
        assert_eq!(
            "cloud".parse::<StrategyKind>(),
            Err(UnknownStrategy("cloud".to_string()))
        );
    }
}
