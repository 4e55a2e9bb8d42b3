//! Heuristic box packer.
//!
//! Boxes are tried smallest first; the first box that takes every item wins.
//! When no single box works, items are spread greedily over several boxes so
//! the caller can tell "needs more than one box" apart from "cannot be packed
//! at all". Placement inside a box considers:
//! - collisions with already placed items
//! - support from below (minimum supported base fraction, centre resting on a
//!   supporting item)
//! - stacking order (nothing heavier on top of something lighter)

use super::{EngineBox, EngineError, EngineItem, LocalPackingEngine, PackedBox, PlacedItem, scale};
use crate::geometry::{Cuboid, fits_within, footprint_contains_doubled, intersects, overlap_area_xy};

/// Tuning knobs of the heuristic packer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PackingConfig {
    /// Spacing of the candidate position grid, in catalog units.
    pub grid_step: f64,
    /// Minimum fraction of an item's base that must rest on items below (0.0 to 1.0).
    pub support_ratio: f64,
    /// Whether items may be turned into any of their six orientations.
    pub allow_item_rotation: bool,
}

impl PackingConfig {
    pub const DEFAULT_GRID_STEP: f64 = 5.0;
    pub const DEFAULT_SUPPORT_RATIO: f64 = 0.6;
    pub const DEFAULT_ALLOW_ITEM_ROTATION: bool = true;

    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            grid_step: Self::DEFAULT_GRID_STEP,
            support_ratio: Self::DEFAULT_SUPPORT_RATIO,
            allow_item_rotation: Self::DEFAULT_ALLOW_ITEM_ROTATION,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    pub fn grid_step(mut self, step: f64) -> Self {
        self.config.grid_step = step;
        self
    }

    pub fn support_ratio(mut self, ratio: f64) -> Self {
        self.config.support_ratio = ratio;
        self
    }

    pub fn allow_item_rotation(mut self, allow: bool) -> Self {
        self.config.allow_item_rotation = allow;
        self
    }

    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// A box being filled.
struct OpenBox {
    spec: EngineBox,
    placed: Vec<PlacedItem>,
}

impl OpenBox {
    fn new(spec: &EngineBox) -> Self {
        Self {
            spec: spec.clone(),
            placed: Vec::new(),
        }
    }

    fn total_weight(&self) -> u128 {
        self.placed.iter().map(|item| u128::from(item.weight)).sum()
    }

    fn place(&mut self, item: &EngineItem, cuboid: Cuboid) {
        self.placed.push(PlacedItem {
            reference: item.reference,
            weight: item.weight,
            cuboid,
        });
    }

    fn finish(self) -> PackedBox {
        let used = self
            .placed
            .iter()
            .fold(0u128, |acc, item| acc.saturating_add(item.cuboid.volume()));
        let total = self.spec.volume();
        let volume_utilization = if total == 0 {
            0.0
        } else {
            used as f64 / total as f64
        };
        PackedBox {
            reference: self.spec.reference,
            items: self.placed,
            volume_utilization,
        }
    }
}

/// The built-in [`LocalPackingEngine`].
#[derive(Clone, Debug, Default)]
pub struct HeuristicPacker {
    config: PackingConfig,
}

impl HeuristicPacker {
    pub fn new(config: PackingConfig) -> Self {
        Self { config }
    }

    fn grid_step(&self) -> u64 {
        scale(self.config.grid_step).max(1)
    }

    fn orientations(&self, dims: [u64; 3]) -> Vec<[u64; 3]> {
        if !self.config.allow_item_rotation {
            return vec![dims];
        }
        let [a, b, c] = dims;
        let mut all = vec![
            [a, b, c],
            [a, c, b],
            [b, a, c],
            [b, c, a],
            [c, a, b],
            [c, b, a],
        ];
        all.sort_unstable();
        all.dedup();
        all
    }

    /// Whether the item fits an empty instance of the box at all.
    fn fits_empty(&self, spec: &EngineBox, item: &EngineItem) -> bool {
        item.weight <= spec.max_weight
            && self
                .orientations(item.dims)
                .into_iter()
                .any(|dims| fits_within(dims, spec.bounds()))
    }

    fn pack_single(&self, spec: &EngineBox, items: &[EngineItem]) -> Option<PackedBox> {
        let mut open = OpenBox::new(spec);
        for item in items {
            let cuboid = self.find_stable_position(item, &open)?;
            open.place(item, cuboid);
        }
        Some(open.finish())
    }

    fn pack_many(
        &self,
        boxes: &[EngineBox],
        items: &[EngineItem],
    ) -> Result<Vec<PackedBox>, EngineError> {
        let mut open_boxes: Vec<OpenBox> = Vec::new();

        for item in items {
            let existing = open_boxes.iter().enumerate().find_map(|(idx, open)| {
                self.find_stable_position(item, open)
                    .map(|cuboid| (idx, cuboid))
            });
            if let Some((idx, cuboid)) = existing {
                open_boxes[idx].place(item, cuboid);
                continue;
            }

            let fresh = boxes.iter().find_map(|spec| {
                let open = OpenBox::new(spec);
                self.find_stable_position(item, &open)
                    .map(|cuboid| (open, cuboid))
            });
            match fresh {
                Some((mut open, cuboid)) => {
                    open.place(item, cuboid);
                    open_boxes.push(open);
                }
                None => return Err(EngineError::NoBoxesAvailable(item.reference)),
            }
        }

        Ok(open_boxes.into_iter().map(OpenBox::finish).collect())
    }

    /// Finds the lowest, then frontmost, then leftmost stable position.
    fn find_stable_position(&self, item: &EngineItem, open: &OpenBox) -> Option<Cuboid> {
        if open.total_weight() + u128::from(item.weight) > u128::from(open.spec.max_weight) {
            return None;
        }

        let bounds = open.spec.bounds();
        let mut z_layers: Vec<u64> = open.placed.iter().map(|p| p.cuboid.top_z()).collect();
        z_layers.push(0);
        z_layers.sort_unstable();
        z_layers.dedup();

        let mut best: Option<Cuboid> = None;
        for dims in self.orientations(item.dims) {
            if !fits_within(dims, bounds) {
                continue;
            }

            let xs = self.axis_positions(bounds[0], dims[0], open, 0);
            let ys = self.axis_positions(bounds[1], dims[1], open, 1);

            'layers: for &z in &z_layers {
                if z + dims[2] > bounds[2] {
                    // Layers are ascending, so every later layer is too high as well.
                    break;
                }
                for &y in &ys {
                    for &x in &xs {
                        let candidate = Cuboid::new([x, y, z], dims);
                        if open.placed.iter().any(|p| intersects(&p.cuboid, &candidate)) {
                            continue;
                        }
                        if z > 0 && !self.is_supported(&candidate, item.weight, open) {
                            continue;
                        }
                        if best.is_none_or(|current| is_better_position(&candidate, &current)) {
                            best = Some(candidate);
                        }
                        break 'layers;
                    }
                }
            }
        }

        best
    }

    /// Candidate positions along one axis: a regular grid, the far wall and
    /// the far edges of already placed items.
    fn axis_positions(&self, container_len: u64, object_len: u64, open: &OpenBox, axis: usize) -> Vec<u64> {
        let Some(max_pos) = container_len.checked_sub(object_len) else {
            return Vec::new();
        };

        let step = self.grid_step();
        let mut positions: Vec<u64> = (0..=max_pos).step_by(step as usize).collect();
        positions.push(max_pos);
        positions.extend(
            open.placed
                .iter()
                .map(|p| p.cuboid.end(axis))
                .filter(|&edge| edge <= max_pos),
        );
        positions.sort_unstable();
        positions.dedup();
        positions
    }

    /// Stability rules for an item that does not stand on the floor.
    fn is_supported(&self, candidate: &Cuboid, weight: u64, open: &OpenBox) -> bool {
        let z = candidate.position[2];
        let center = candidate.doubled_center_xy();
        let mut support_area: u128 = 0;
        let mut center_supported = false;

        for below in open.placed.iter().filter(|p| p.cuboid.top_z() == z) {
            let area = overlap_area_xy(candidate, &below.cuboid);
            if area == 0 {
                continue;
            }
            // Heavier items must not rest on lighter ones.
            if below.weight < weight {
                return false;
            }
            support_area = support_area.saturating_add(area);
            if footprint_contains_doubled(center, &below.cuboid) {
                center_supported = true;
            }
        }

        let base_area = candidate.base_area();
        if base_area == 0 || !center_supported {
            return false;
        }
        (support_area as f64 / base_area as f64) >= self.config.support_ratio
    }
}

fn is_better_position(new: &Cuboid, current: &Cuboid) -> bool {
    let key = |c: &Cuboid| (c.position[2], c.position[1], c.position[0]);
    key(new) < key(current)
}

/// Heavy and large items first, ties broken by reference for determinism.
fn packing_order(items: &[EngineItem]) -> Vec<EngineItem> {
    let mut ordered = items.to_vec();
    ordered.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| b.volume().cmp(&a.volume()))
            .then_with(|| a.reference.cmp(&b.reference))
    });
    ordered
}

fn box_order(boxes: &[EngineBox]) -> Vec<EngineBox> {
    let mut ordered = boxes.to_vec();
    ordered.sort_by(|a, b| {
        a.volume()
            .cmp(&b.volume())
            .then_with(|| a.max_weight.cmp(&b.max_weight))
            .then_with(|| a.reference.cmp(&b.reference))
    });
    ordered
}

impl LocalPackingEngine for HeuristicPacker {
    fn pack(&self, boxes: &[EngineBox], items: &[EngineItem]) -> Result<Vec<PackedBox>, EngineError> {
        let first = items.first().ok_or(EngineError::NothingToPack)?;
        if boxes.is_empty() {
            return Err(EngineError::NoBoxesAvailable(first.reference));
        }

        let boxes = box_order(boxes);
        let items = packing_order(items);

        if let Some(unfit) = items
            .iter()
            .find(|item| !boxes.iter().any(|spec| self.fits_empty(spec, item)))
        {
            return Err(EngineError::NoBoxesAvailable(unfit.reference));
        }

        let total_weight: u128 = items.iter().map(|item| u128::from(item.weight)).sum();
        let total_volume = items
            .iter()
            .fold(0u128, |acc, item| acc.saturating_add(item.volume()));

        for spec in &boxes {
            if total_weight > u128::from(spec.max_weight) || total_volume > spec.volume() {
                continue;
            }
            if let Some(packed) = self.pack_single(spec, &items) {
                return Ok(vec![packed]);
            }
        }

        self.pack_many(&boxes, &items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PackagingId, ProductId};

    fn engine_box(id: u64, dims: [u64; 3], max_weight: u64) -> EngineBox {
        EngineBox {
            reference: PackagingId::new(id),
            width: dims[0],
            length: dims[1],
            depth: dims[2],
            max_weight,
        }
    }

    fn item(id: u64, dims: [u64; 3], weight: u64) -> EngineItem {
        EngineItem {
            reference: ProductId::new(id),
            dims,
            weight,
        }
    }

    fn assert_no_overlaps(packed: &PackedBox) {
        for (i, a) in packed.items.iter().enumerate() {
            for b in packed.items.iter().skip(i + 1) {
                assert!(
                    !intersects(&a.cuboid, &b.cuboid),
                    "items {} and {} overlap",
                    a.reference,
                    b.reference
                );
            }
        }
    }

    #[test]
    fn single_item_lands_in_the_corner() {
        let packer = HeuristicPacker::default();
        let packed = packer
            .pack(
                &[engine_box(1, [1000, 1000, 1000], 1000)],
                &[item(1, [110, 220, 330], 400)],
            )
            .unwrap();
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].reference, PackagingId::new(1));
        assert_eq!(packed[0].items[0].cuboid.position, [0, 0, 0]);
        let expected = (110.0 * 220.0 * 330.0) / 1_000_000_000.0;
        assert!((packed[0].volume_utilization - expected).abs() < 1e-12);
    }

    #[test]
    fn smallest_sufficient_box_wins() {
        let packer = HeuristicPacker::default();
        let boxes = [
            engine_box(1, [4000, 4000, 4000], 10_000),
            engine_box(2, [1200, 1200, 1200], 10_000),
            engine_box(3, [500, 500, 500], 10_000),
        ];
        let items = [item(1, [1000, 1000, 500], 300), item(2, [1000, 1000, 500], 200)];

        let packed = packer.pack(&boxes, &items).unwrap();
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].reference, PackagingId::new(2));
        assert_no_overlaps(&packed[0]);
    }

    #[test]
    fn rotation_makes_long_items_fit() {
        let boxes = [engine_box(1, [100, 100, 500], 1000)];
        let items = [item(1, [500, 100, 100], 10)];

        let rotating = HeuristicPacker::default();
        assert!(rotating.pack(&boxes, &items).is_ok());

        let fixed = HeuristicPacker::new(PackingConfig::builder().allow_item_rotation(false).build());
        assert_eq!(
            fixed.pack(&boxes, &items),
            Err(EngineError::NoBoxesAvailable(ProductId::new(1)))
        );
    }

    #[test]
    fn item_too_heavy_for_every_box_is_reported() {
        let packer = HeuristicPacker::default();
        let result = packer.pack(
            &[engine_box(1, [1000, 1000, 1000], 100)],
            &[item(7, [100, 100, 100], 500)],
        );
        assert_eq!(result, Err(EngineError::NoBoxesAvailable(ProductId::new(7))));
    }

    #[test]
    fn weight_limit_spreads_items_over_several_boxes() {
        let packer = HeuristicPacker::default();
        let boxes = [engine_box(1, [2000, 2000, 2000], 400)];
        let items = [
            item(1, [1000, 1000, 1000], 300),
            item(2, [1000, 1000, 1000], 300),
            item(3, [1000, 1000, 1000], 300),
        ];

        let packed = packer.pack(&boxes, &items).unwrap();
        assert_eq!(packed.len(), 3);
        for packed_box in &packed {
            assert_eq!(packed_box.items.len(), 1);
            assert!(packed_box.total_weight() <= 400);
        }
    }

    #[test]
    fn heavier_item_is_not_stacked_on_lighter_one() {
        let packer = HeuristicPacker::new(PackingConfig::builder().allow_item_rotation(false).build());
        let spec = engine_box(1, [1000, 1000, 3000], 10_000);
        let mut open = OpenBox::new(&spec);
        open.place(&item(1, [1000, 1000, 1000], 50), Cuboid::new([0, 0, 0], [1000, 1000, 1000]));

        let heavy = item(2, [1000, 1000, 1000], 90);
        assert!(packer.find_stable_position(&heavy, &open).is_none());

        let light = item(3, [1000, 1000, 1000], 10);
        let position = packer.find_stable_position(&light, &open).unwrap();
        assert_eq!(position.position, [0, 0, 1000]);
    }

    #[test]
    fn stacked_items_never_overlap() {
        let packer = HeuristicPacker::default();
        let boxes = [engine_box(1, [1000, 1000, 1000], 100_000)];
        let items: Vec<_> = (1..=8).map(|id| item(id, [500, 500, 500], 100)).collect();

        let packed = packer.pack(&boxes, &items).unwrap();
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].items.len(), 8);
        assert!((packed[0].volume_utilization - 1.0).abs() < 1e-12);
        assert_no_overlaps(&packed[0]);
    }

    #[test]
    fn huge_weights_are_summed_without_overflow() {
        let packer = HeuristicPacker::default();
        let heavy = u64::MAX / 2 + 1;
        let boxes = [engine_box(1, [1000, 1000, 1000], u64::MAX)];
        let items = [item(1, [100, 100, 100], heavy), item(2, [100, 100, 100], heavy)];

        let packed = packer.pack(&boxes, &items).unwrap();
        assert_eq!(packed.len(), 2);
        assert!(packed.iter().all(|b| b.total_weight() <= u128::from(u64::MAX)));
    }

    #[test]
    fn empty_input_is_rejected() {
        let packer = HeuristicPacker::default();
        assert_eq!(
            packer.pack(&[engine_box(1, [10, 10, 10], 10)], &[]),
            Err(EngineError::NothingToPack)
        );
        assert_eq!(
            packer.pack(&[], &[item(3, [1, 1, 1], 1)]),
            Err(EngineError::NoBoxesAvailable(ProductId::new(3)))
        );
    }
}
