//! Canonical cache keys for product sets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;
use crate::model::{Product, ProductId};

/// Order-insensitive key of a product-id multiset.
///
/// The ids are sorted ascending and written as decimal numbers joined by `.`,
/// prefixed with their count, e.g. `3:1.7.7`. Decimal digits never contain
/// the separator, so different multisets cannot collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Builds the fingerprint of a multiset of product ids.
    ///
    /// Repeated ids are kept: two units of the same product are a different
    /// request than one unit.
    pub fn from_ids(ids: impl IntoIterator<Item = ProductId>) -> Result<Self, ResolutionError> {
        let mut ids: Vec<u64> = ids.into_iter().map(ProductId::get).collect();
        if ids.is_empty() {
            return Err(ResolutionError::invalid_input(
                "cannot fingerprint an empty product set",
            ));
        }

        ids.sort_unstable();
        let joined = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Ok(Self(format!("{}:{}", ids.len(), joined)))
    }

    /// Fingerprint of a set of already deduplicated products.
    pub fn of(products: &[Product]) -> Result<Self, ResolutionError> {
        Self::from_ids(products.iter().map(|product| product.id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
