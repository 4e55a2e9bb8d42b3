//! Local packing engine capability.
//!
//! The engine works on integer units: every dimension and weight is scaled by
//! [`SCALE`] and rounded, so that fit checks never depend on floating-point
//! drift. Boxes and items carry a reference back to the catalog packaging and
//! the product they were built from.

mod heuristic;

pub use heuristic::{HeuristicPacker, PackingConfig, PackingConfigBuilder};

use thiserror::Error;

use crate::geometry::Cuboid;
use crate::model::{Packaging, PackagingId, Product, ProductId};

/// Factor applied to dimensions and weights before packing.
pub const SCALE: f64 = 100.0;

/// Converts a positive measurement into engine units.
pub fn scale(value: f64) -> u64 {
    let scaled = (value * SCALE).round();
    if scaled.is_finite() && scaled > 0.0 {
        scaled as u64
    } else {
        0
    }
}

/// A box the engine may use.
///
/// `width`/`length` span the floor, `depth` is the vertical extent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineBox {
    pub reference: PackagingId,
    pub width: u64,
    pub length: u64,
    pub depth: u64,
    pub max_weight: u64,
}

impl EngineBox {
    pub fn from_packaging(packaging: &Packaging) -> Self {
        Self {
            reference: packaging.id,
            width: scale(packaging.width),
            length: scale(packaging.length),
            depth: scale(packaging.height),
            max_weight: scale(packaging.max_weight),
        }
    }

    #[inline]
    pub fn bounds(&self) -> [u64; 3] {
        [self.width, self.length, self.depth]
    }

    pub fn volume(&self) -> u128 {
        (u128::from(self.width) * u128::from(self.length)).saturating_mul(u128::from(self.depth))
    }
}

/// An item to pack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineItem {
    pub reference: ProductId,
    pub dims: [u64; 3],
    pub weight: u64,
}

impl EngineItem {
    pub fn from_product(product: &Product) -> Self {
        Self {
            reference: product.id,
            dims: product.dims.map(scale),
            weight: scale(product.weight),
        }
    }

    pub fn volume(&self) -> u128 {
        self.dims
            .iter()
            .fold(1u128, |acc, &d| acc.saturating_mul(u128::from(d)))
    }
}

/// An item with its final position inside a box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedItem {
    pub reference: ProductId,
    pub weight: u64,
    pub cuboid: Cuboid,
}

/// One box used by a packing run.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedBox {
    pub reference: PackagingId,
    pub items: Vec<PlacedItem>,
    /// Packed item volume divided by the box volume (0.0 to 1.0).
    pub volume_utilization: f64,
}

impl PackedBox {
    pub fn total_weight(&self) -> u128 {
        self.items.iter().map(|item| u128::from(item.weight)).sum()
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// At least one item fits none of the boxes, so no packing exists.
    #[error("no box can hold item {0}")]
    NoBoxesAvailable(ProductId),

    #[error("nothing to pack")]
    NothingToPack,
}

/// A packer that distributes items over as few boxes as it can.
///
/// Implementations are synchronous and CPU-bound; async callers should run
/// them on a blocking thread.
pub trait LocalPackingEngine: Send + Sync {
    /// Packs every item and returns the boxes actually used.
    fn pack(&self, boxes: &[EngineBox], items: &[EngineItem]) -> Result<Vec<PackedBox>, EngineError>;
}
