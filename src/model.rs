//! Data model of the packaging resolver.
//!
//! - `RequestedItem`: an item as the caller describes it
//! - `Product`: the deduplicated, dimension-normalized form of an item
//! - `Packaging`: a container definition from the catalog
//! - `MinimalPackaging`: the memoized answer for one product set

use std::fmt;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::fingerprint::Fingerprint;

/// Validation error for item and packaging data.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidDimension(String),
    InvalidWeight(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidDimension(msg) => write!(f, "Invalid dimension: {}", msg),
            ValidationError::InvalidWeight(msg) => write!(f, "Invalid weight: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Upper bound for every dimension and weight.
///
/// Keeps scaled engine units well inside `u64`.
pub const MAX_MEASUREMENT: f64 = 1e9;

fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    if value > MAX_MEASUREMENT {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must not exceed {}, got: {}",
            name, MAX_MEASUREMENT, value
        )));
    }
    Ok(())
}

fn validate_weight_value(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    if value > MAX_MEASUREMENT {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must not exceed {}, got: {}",
            name, MAX_MEASUREMENT, value
        )));
    }
    Ok(())
}

/// Stable identity of a deduplicated product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a packaging in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackagingId(u64);

impl PackagingId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PackagingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An item as supplied by the caller.
///
/// `id` is the caller's own reference (e.g. a warehouse item id). It is not
/// used for caching: physically identical items with different ids collapse
/// into one [`Product`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "id": 1, "width": 1.1, "height": 2.2, "length": 3.3, "weight": 4.0 }))]
pub struct RequestedItem {
    pub id: u64,
    pub width: f64,
    pub height: f64,
    pub length: f64,
    pub weight: f64,
}

impl RequestedItem {
    /// Creates a validated item.
    ///
    /// # Examples
    /// ```
    /// use packwise::model::RequestedItem;
    ///
    /// assert!(RequestedItem::new(1, 10.0, 20.0, 30.0, 5.0).is_ok());
    /// assert!(RequestedItem::new(1, -10.0, 20.0, 30.0, 5.0).is_err());
    /// ```
    pub fn new(
        id: u64,
        width: f64,
        height: f64,
        length: f64,
        weight: f64,
    ) -> Result<Self, ValidationError> {
        let item = Self {
            id,
            width,
            height,
            length,
            weight,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dimension(self.width, "Width")?;
        validate_dimension(self.height, "Height")?;
        validate_dimension(self.length, "Length")?;
        validate_weight_value(self.weight, "Weight")?;
        Ok(())
    }

    /// The three dimensions sorted ascending, so that a 3×4×5 item and a
    /// 5×3×4 item of the same weight are the same product.
    pub fn sorted_dims(&self) -> [f64; 3] {
        sort_dims([self.width, self.height, self.length])
    }
}

fn sort_dims(mut dims: [f64; 3]) -> [f64; 3] {
    dims.sort_by(f64::total_cmp);
    dims
}

/// Deduplicated product record.
///
/// Dimensions are always stored sorted ascending.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub dims: [f64; 3],
    pub weight: f64,
}

impl Product {
    pub fn new(id: ProductId, dims: [f64; 3], weight: f64) -> Result<Self, ValidationError> {
        validate_dimension(dims[0], "Dimension 1")?;
        validate_dimension(dims[1], "Dimension 2")?;
        validate_dimension(dims[2], "Dimension 3")?;
        validate_weight_value(weight, "Weight")?;
        Ok(Self {
            id,
            dims: sort_dims(dims),
            weight,
        })
    }

    /// Whether this record describes the given sorted dimensions and weight.
    pub fn matches(&self, sorted_dims: &[f64; 3], weight: f64) -> bool {
        self.dims == *sorted_dims && self.weight == weight
    }
}

/// A packaging (container) definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Packaging {
    pub id: PackagingId,
    pub width: f64,
    pub height: f64,
    pub length: f64,
    pub max_weight: f64,
}

impl Packaging {
    pub fn new(
        id: PackagingId,
        width: f64,
        height: f64,
        length: f64,
        max_weight: f64,
    ) -> Result<Self, ValidationError> {
        validate_dimension(width, "Packaging width")?;
        validate_dimension(height, "Packaging height")?;
        validate_dimension(length, "Packaging length")?;
        validate_weight_value(max_weight, "Packaging max weight")?;
        Ok(Self {
            id,
            width,
            height,
            length,
            max_weight,
        })
    }
}

/// Rounds a raw volume-utilization fraction to two decimals.
///
/// The result is clamped to `0.01..=1.0`: a packed box is never reported as
/// empty, even when the items are tiny compared to it.
pub fn round_utilization(raw: f64) -> f64 {
    let rounded = (raw * 100.0).round() / 100.0;
    if rounded.is_nan() {
        return 0.01;
    }
    rounded.clamp(0.01, 1.0)
}

/// The smallest packaging found for one product set.
///
/// Created once per fingerprint and never changed afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct MinimalPackaging {
    packaging: Packaging,
    fingerprint: Fingerprint,
    volume_utilization: f64,
}

impl MinimalPackaging {
    pub fn new(packaging: Packaging, fingerprint: Fingerprint, volume_utilization: f64) -> Self {
        Self {
            packaging,
            fingerprint,
            volume_utilization: round_utilization(volume_utilization),
        }
    }

    pub fn packaging(&self) -> &Packaging {
        &self.packaging
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn volume_utilization(&self) -> f64 {
        self.volume_utilization
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_item_rejects_non_positive_values() {
        assert!(RequestedItem::new(1, 0.0, 1.0, 1.0, 1.0).is_err());
        assert!(RequestedItem::new(1, 1.0, f64::NAN, 1.0, 1.0).is_err());
        assert!(RequestedItem::new(1, 1.0, 1.0, f64::INFINITY, 1.0).is_err());
        assert!(matches!(
            RequestedItem::new(1, 1.0, 1.0, 1.0, 0.0),
            Err(ValidationError::InvalidWeight(_))
        ));
    }

    #[test]
    fn oversized_measurements_are_rejected() {
        assert!(RequestedItem::new(1, MAX_MEASUREMENT, 1.0, 1.0, MAX_MEASUREMENT).is_ok());
        assert!(matches!(
            RequestedItem::new(1, 1.0, 1.0, 1.0, 1e17),
            Err(ValidationError::InvalidWeight(_))
        ));
        assert!(matches!(
            RequestedItem::new(1, 1.0, 2e9, 1.0, 1.0),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(Packaging::new(PackagingId::new(1), 10.0, 10.0, 10.0, 1e18).is_err());
    }

    #[test]
    fn sorted_dims_collapse_rotations() {
        let a = RequestedItem::new(1, 3.0, 4.0, 5.0, 2.0).unwrap();
        let b = RequestedItem::new(2, 5.0, 3.0, 4.0, 2.0).unwrap();
        assert_eq!(a.sorted_dims(), [3.0, 4.0, 5.0]);
        assert_eq!(a.sorted_dims(), b.sorted_dims());
    }

    #[test]
    fn product_sorts_dimensions_on_construction() {
        let product = Product::new(ProductId::new(1), [5.0, 3.0, 4.0], 2.0).unwrap();
        assert_eq!(product.dims, [3.0, 4.0, 5.0]);
        assert!(product.matches(&[3.0, 4.0, 5.0], 2.0));
        assert!(!product.matches(&[3.0, 4.0, 5.0], 2.5));
    }

    #[test]
    fn utilization_is_rounded_and_kept_positive() {
        assert_eq!(round_utilization(1.1 * 2.2 * 3.3 / 1000.0), 0.01);
        assert_eq!(round_utilization(0.456), 0.46);
        assert_eq!(round_utilization(0.000_001), 0.01);
        assert_eq!(round_utilization(1.2), 1.0);
    }

    #[test]
    fn packaging_validates_dimensions() {
        assert!(Packaging::new(PackagingId::new(1), 10.0, 10.0, 10.0, 10.0).is_ok());
        assert!(Packaging::new(PackagingId::new(1), 10.0, -1.0, 10.0, 10.0).is_err());
    }
}
