//! Load optimization for a single truck.
//!
//! This module implements a greedy extreme-point heuristic for 3D bin packing:
//! - Every cargo item is expanded into one unit per quantity
//! - Units are sorted by volume (largest first), then by height (tallest first)
//! - Each unit goes to the first free anchor in bottom-back-left order
//! - A placed unit derives three new anchors (right, top and front of it)
//!
//! Units are never rotated and there is no backtracking: a unit without a
//! fitting anchor is reported as unplaced and the pass continues. Weight,
//! fragility and stackability travel with the items but do not influence
//! placement.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::geometry::{compare_anchors, derived_anchors, fits_at};
use crate::model::{CargoItem, Dimensions, PackError, Placement, Truck};
use crate::types::{BoundingBox, Dimensional, Vec3};

/// Cubic centimeters per cubic foot.
pub const CUBIC_CM_PER_CUBIC_FOOT: f64 = 28316.8466;

/// Upper bound on the units (quantities expanded) of one pack call.
pub const MAX_UNITS_PER_PACK: usize = 100_000;

/// Volume and count figures shown next to a load plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoadMetrics {
    /// Interior volume of the truck in cm³
    pub truck_volume: f64,
    /// Volume of all placed units in cm³
    pub used_volume: f64,
    /// Truck volume not taken by placed units in cm³
    pub remaining_volume: f64,
    pub truck_volume_cubic_feet: f64,
    pub used_volume_cubic_feet: f64,
    pub remaining_volume_cubic_feet: f64,
    /// Units requested by valid items (quantities expanded)
    pub total_units: usize,
    pub placed_count: usize,
    pub unplaced_count: usize,
}

impl LoadMetrics {
    fn new(
        truck_volume: f64,
        used_volume: f64,
        total_units: usize,
        placed_count: usize,
        unplaced_count: usize,
    ) -> Self {
        let remaining_volume = truck_volume - used_volume;
        Self {
            truck_volume,
            used_volume,
            remaining_volume,
            truck_volume_cubic_feet: truck_volume / CUBIC_CM_PER_CUBIC_FOOT,
            used_volume_cubic_feet: used_volume / CUBIC_CM_PER_CUBIC_FOOT,
            remaining_volume_cubic_feet: remaining_volume / CUBIC_CM_PER_CUBIC_FOOT,
            total_units,
            placed_count,
            unplaced_count,
        }
    }
}

/// Result of loading one truck.
///
/// A partial fit is a normal outcome: callers inspect `unplaced_items` to
/// decide on a bigger truck, another trip or a manual re-pack.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LoadResult {
    pub truck_id: String,
    /// Placements in the order they were decided
    pub placed_items: Vec<Placement>,
    /// Units (quantity 1 each) for which no anchor fit
    pub unplaced_items: Vec<CargoItem>,
    /// `100 * placed volume / truck volume`
    pub volume_utilization: f64,
    pub metrics: LoadMetrics,
}

impl LoadResult {
    /// Indicates whether every valid unit was placed.
    pub fn is_complete(&self) -> bool {
        self.unplaced_items.is_empty()
    }

    pub fn placed_count(&self) -> usize {
        self.placed_items.len()
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced_items.len()
    }
}

/// Reasons why a unit could not be placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    DimensionsExceedContainer,
    NoFreeAnchor,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::DimensionsExceedContainer => "dimensions_exceed_container",
            RejectReason::NoFreeAnchor => "no_free_anchor",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::DimensionsExceedContainer => {
                write!(f, "Item exceeds the cargo space in at least one dimension")
            }
            RejectReason::NoFreeAnchor => {
                write!(f, "No free anchor point left for this item")
            }
        }
    }
}

/// Events emitted while packing, for live visualization.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// Input is validated and expanded; placement begins.
    Started {
        truck_id: String,
        dimensions: Dimensions,
        total_units: usize,
    },
    /// An item was dropped because of invalid dimensions.
    ItemSkipped { item_id: String, reason: String },
    /// A unit was placed.
    ItemPlaced {
        uuid: String,
        item_id: String,
        position: [f64; 3],
        dimensions: Dimensions,
        volume_utilization: f64,
    },
    /// A unit could not be placed.
    ItemRejected {
        item_id: String,
        dimensions: Dimensions,
        reason_code: String,
        reason: String,
    },
    /// Packing finished.
    Finished {
        placed: usize,
        unplaced: usize,
        volume_utilization: f64,
    },
}

/// Packs cargo items into a truck.
///
/// Neither the truck nor the items are modified.
///
/// # Parameters
/// * `truck` - The truck whose cargo space is loaded
/// * `items` - Cargo items, each standing for `quantity` units
///
/// # Returns
/// `LoadResult` with placements and unplaced units,
/// `PackError::InvalidContainer` if the truck has a non-positive dimension, or
/// `PackError::TooManyUnits` if the valid items exceed `MAX_UNITS_PER_PACK`
///
/// # Examples
/// ```
/// use truckload::model::{CargoItem, Dimensions, Truck};
/// use truckload::optimizer::pack_truck;
///
/// let truck = Truck::new("t1", "Van", Dimensions::new(100.0, 100.0, 100.0), 1000.0);
/// let items = vec![
///     CargoItem::new("a", "Crate", Dimensions::new(100.0, 100.0, 60.0)).with_quantity(2),
/// ];
///
/// let result = pack_truck(&truck, &items).unwrap();
/// assert_eq!(result.placed_count(), 1);
/// assert_eq!(result.unplaced_count(), 1);
/// ```
pub fn pack_truck(truck: &Truck, items: &[CargoItem]) -> Result<LoadResult, PackError> {
    pack_truck_with_progress(truck, items, |_| {})
}

/// Packing with a live progress callback.
///
/// Calls `on_event` for every decision (suitable for SSE/WebSocket).
pub fn pack_truck_with_progress(
    truck: &Truck,
    items: &[CargoItem],
    mut on_event: impl FnMut(&PackEvent),
) -> Result<LoadResult, PackError> {
    truck.validate()?;

    let space = truck.extent();
    let truck_volume = truck.volume();

    let mut units = expand_units(items, &mut on_event)?;
    sort_units(&mut units);
    let total_units = units.len();

    on_event(&PackEvent::Started {
        truck_id: truck.id.clone(),
        dimensions: truck.dimensions,
        total_units,
    });

    let mut anchors = AnchorPool::new();
    let mut occupied: Vec<BoundingBox> = Vec::with_capacity(total_units);
    let mut placed_items: Vec<Placement> = Vec::with_capacity(total_units);
    let mut unplaced_items: Vec<CargoItem> = Vec::new();
    let mut used_volume = 0.0;

    for unit in units {
        let extent = unit.extent();

        match anchors.first_fit(extent, &space, &occupied) {
            Some(anchor) => {
                used_volume += unit.dimensions.volume();

                let placement = Placement::new(unit, anchor);
                occupied.push(BoundingBox::of(&placement));
                anchors.record_placement(anchor, extent, &space, &occupied);
                debug!(
                    item = %placement.item.id,
                    x = anchor.x,
                    y = anchor.y,
                    z = anchor.z,
                    "placed unit"
                );
                on_event(&PackEvent::ItemPlaced {
                    uuid: placement.uuid.clone(),
                    item_id: placement.item.id.clone(),
                    position: placement.position,
                    dimensions: placement.item.dimensions,
                    volume_utilization: utilization_percent(used_volume, truck_volume),
                });
                placed_items.push(placement);
            }
            None => {
                let reason = if unit.fits_in(&space, 0.0) {
                    RejectReason::NoFreeAnchor
                } else {
                    RejectReason::DimensionsExceedContainer
                };
                debug!(item = %unit.id, reason = reason.code(), "unit not placed");
                on_event(&PackEvent::ItemRejected {
                    item_id: unit.id.clone(),
                    dimensions: unit.dimensions,
                    reason_code: reason.code().to_string(),
                    reason: reason.to_string(),
                });
                unplaced_items.push(unit);
            }
        }
    }

    let volume_utilization = utilization_percent(used_volume, truck_volume);
    on_event(&PackEvent::Finished {
        placed: placed_items.len(),
        unplaced: unplaced_items.len(),
        volume_utilization,
    });

    let metrics = LoadMetrics::new(
        truck_volume,
        used_volume,
        total_units,
        placed_items.len(),
        unplaced_items.len(),
    );

    Ok(LoadResult {
        truck_id: truck.id.clone(),
        placed_items,
        unplaced_items,
        volume_utilization,
        metrics,
    })
}

/// Expands every valid item into `quantity` single units.
///
/// Items with invalid dimensions are skipped with a warning and do not count
/// towards placed or unplaced units. Fails with `PackError::TooManyUnits`
/// before allocating when the valid items exceed `MAX_UNITS_PER_PACK`.
fn expand_units(
    items: &[CargoItem],
    on_event: &mut impl FnMut(&PackEvent),
) -> Result<Vec<CargoItem>, PackError> {
    let mut valid = Vec::with_capacity(items.len());

    for item in items {
        if let Err(err) = item.validate() {
            warn!(item = %item.id, "Skipping item with invalid dimensions: {err}");
            on_event(&PackEvent::ItemSkipped {
                item_id: item.id.clone(),
                reason: err.to_string(),
            });
            continue;
        }
        valid.push(item);
    }

    let requested = valid
        .iter()
        .fold(0usize, |acc, item| acc.saturating_add(item.unit_count()));
    if requested > MAX_UNITS_PER_PACK {
        return Err(PackError::TooManyUnits {
            requested,
            limit: MAX_UNITS_PER_PACK,
        });
    }

    let mut units = Vec::with_capacity(requested);
    for item in valid {
        units.extend(std::iter::repeat_n(item.unit(), item.unit_count()));
    }

    Ok(units)
}

/// Largest volume first; equal volumes put the taller unit first.
///
/// The sort is stable, so remaining ties keep input order.
fn sort_units(units: &mut [CargoItem]) {
    units.sort_by(|a, b| {
        b.dimensions
            .volume()
            .total_cmp(&a.dimensions.volume())
            .then_with(|| b.dimensions.height.total_cmp(&a.dimensions.height))
    });
}

fn utilization_percent(used_volume: f64, truck_volume: f64) -> f64 {
    if truck_volume <= 0.0 {
        return 0.0;
    }
    100.0 * used_volume / truck_volume
}

/// Candidate anchors, kept sorted in bottom-back-left order without duplicates.
///
/// Starts at the origin; every placed box contributes its three derived
/// corners. An anchor covered by a placed box or lying on the far wall of the
/// cargo space can never pass the fit test again and is dropped.
struct AnchorPool {
    points: Vec<Vec3>,
}

impl AnchorPool {
    fn new() -> Self {
        Self {
            points: vec![Vec3::zero()],
        }
    }

    /// First anchor in bottom-back-left order where the box fits.
    fn first_fit(&self, extent: Vec3, space: &Vec3, occupied: &[BoundingBox]) -> Option<Vec3> {
        self.points
            .iter()
            .copied()
            .find(|anchor| fits_at(extent, *anchor, space, occupied))
    }

    /// Updates the pool after a box of `extent` went to `anchor`.
    ///
    /// `occupied` must already contain the new box as its last entry.
    fn record_placement(
        &mut self,
        anchor: Vec3,
        extent: Vec3,
        space: &Vec3,
        occupied: &[BoundingBox],
    ) {
        if let Some(placed) = occupied.last() {
            self.points.retain(|point| !placed.covers_anchor(point));
        }

        for candidate in derived_anchors(anchor, extent) {
            let reachable = candidate.x < space.x && candidate.y < space.y && candidate.z < space.z;
            if !reachable || occupied.iter().any(|other| other.covers_anchor(&candidate)) {
                continue;
            }

            if let Err(index) = self
                .points
                .binary_search_by(|point| compare_anchors(point, &candidate))
            {
                self.points.insert(index, candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Positioned;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn truck(length: f64, width: f64, height: f64) -> Truck {
        Truck::new("t1", "Test truck", Dimensions::new(length, width, height), 10_000.0)
    }

    fn item(id: &str, length: f64, width: f64, height: f64, quantity: i64) -> CargoItem {
        CargoItem::new(id, id.to_uppercase(), Dimensions::new(length, width, height))
            .with_quantity(quantity)
    }

    fn positions(result: &LoadResult) -> Vec<[f64; 3]> {
        result.placed_items.iter().map(|p| p.position).collect()
    }

    fn assert_valid_layout(truck: &Truck, result: &LoadResult) {
        let placed = &result.placed_items;

        for (i, a) in placed.iter().enumerate() {
            for (j, b) in placed.iter().enumerate().skip(i + 1) {
                assert!(
                    !BoundingBox::of(a).intersects(&BoundingBox::of(b)),
                    "Placements {} and {} overlap: {:?} / {:?}",
                    i,
                    j,
                    a.position,
                    b.position
                );
            }
        }

        let dims = truck.dimensions;
        for placement in &result.placed_items {
            let [x, y, z] = placement.position;
            let item_dims = placement.item.dimensions;
            assert!(x >= 0.0 && y >= 0.0 && z >= 0.0);
            assert!(x + item_dims.length <= dims.length);
            assert!(y + item_dims.height <= dims.height);
            assert!(z + item_dims.width <= dims.width);
        }
    }

    #[test]
    fn exact_fit_fills_the_truck() {
        let truck = truck(600.0, 240.0, 240.0);
        let items = vec![item("full", 600.0, 240.0, 240.0, 1)];

        let result = pack_truck(&truck, &items).unwrap();
        assert_eq!(result.placed_count(), 1);
        assert!(result.is_complete());
        assert_eq!(result.placed_items[0].position, [0.0, 0.0, 0.0]);
        assert_relative_eq!(result.volume_utilization, 100.0, epsilon = 1e-9);
        assert_eq!(result.truck_id, "t1");
    }

    #[test]
    fn second_tall_slab_does_not_fit() {
        let truck = truck(100.0, 100.0, 100.0);
        let items = vec![
            item("a", 100.0, 100.0, 60.0, 1),
            item("b", 100.0, 100.0, 60.0, 1),
        ];

        let result = pack_truck(&truck, &items).unwrap();
        assert_eq!(result.placed_count(), 1);
        assert_eq!(result.placed_items[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(result.placed_items[0].item.id, "a");
        assert_eq!(result.unplaced_count(), 1);
        assert_eq!(result.unplaced_items[0].id, "b");
        assert_relative_eq!(result.volume_utilization, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn cubes_line_up_along_the_floor() {
        let truck = truck(200.0, 200.0, 200.0);
        let items = vec![item("cube", 50.0, 50.0, 50.0, 8)];

        let result = pack_truck(&truck, &items).unwrap();
        assert_valid_layout(&truck, &result);
        assert_eq!(result.placed_count(), 8);
        assert!(result.is_complete());
        assert!(result.placed_items.iter().all(|p| p.position[1] == 0.0));
        assert_eq!(
            positions(&result),
            vec![
                [0.0, 0.0, 0.0],
                [50.0, 0.0, 0.0],
                [100.0, 0.0, 0.0],
                [150.0, 0.0, 0.0],
                [0.0, 0.0, 50.0],
                [50.0, 0.0, 50.0],
                [100.0, 0.0, 50.0],
                [150.0, 0.0, 50.0],
            ]
        );
        // 8 × 125 000 cm³ in an 8 000 000 cm³ cargo space
        assert_relative_eq!(result.volume_utilization, 12.5, epsilon = 1e-9);
    }

    #[test]
    fn cubes_form_a_perfect_grid() {
        let truck = truck(100.0, 100.0, 100.0);
        let items = vec![item("cube", 50.0, 50.0, 50.0, 9)];

        let result = pack_truck(&truck, &items).unwrap();
        assert_valid_layout(&truck, &result);
        assert_eq!(result.placed_count(), 8);
        assert_eq!(result.unplaced_count(), 1);
        assert_eq!(
            positions(&result),
            vec![
                [0.0, 0.0, 0.0],
                [50.0, 0.0, 0.0],
                [0.0, 0.0, 50.0],
                [50.0, 0.0, 50.0],
                [0.0, 50.0, 0.0],
                [50.0, 50.0, 0.0],
                [0.0, 50.0, 50.0],
                [50.0, 50.0, 50.0],
            ]
        );
        assert_relative_eq!(result.volume_utilization, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn invalid_item_is_excluded_entirely() {
        let truck = truck(100.0, 100.0, 100.0);
        let items = vec![item("flat", 0.0, 50.0, 50.0, 3)];

        let result = pack_truck(&truck, &items).unwrap();
        assert_eq!(result.placed_count(), 0);
        assert_eq!(result.unplaced_count(), 0);
        assert_eq!(result.metrics.total_units, 0);
        assert_eq!(result.volume_utilization, 0.0);
    }

    #[test]
    fn negative_truck_height_is_rejected() {
        let truck = truck(100.0, 100.0, -10.0);
        let items = vec![item("a", 10.0, 10.0, 10.0, 1)];

        let err = pack_truck(&truck, &items).unwrap_err();
        assert!(matches!(err, PackError::InvalidContainer(_)));
    }

    #[test]
    fn empty_manifest_yields_empty_result() {
        let result = pack_truck(&truck(100.0, 100.0, 100.0), &[]).unwrap();
        assert!(result.placed_items.is_empty());
        assert!(result.unplaced_items.is_empty());
        assert_eq!(result.volume_utilization, 0.0);
    }

    #[test]
    fn oversized_item_is_always_unplaced() {
        let truck = truck(100.0, 100.0, 100.0);
        let items = vec![item("long", 101.0, 10.0, 10.0, 1), item("small", 10.0, 10.0, 10.0, 1)];

        let result = pack_truck(&truck, &items).unwrap();
        assert_eq!(result.unplaced_count(), 1);
        assert_eq!(result.unplaced_items[0].id, "long");
        assert_eq!(result.placed_items[0].item.id, "small");
    }

    #[test]
    fn non_positive_quantity_counts_as_one() {
        let truck = truck(100.0, 100.0, 100.0);
        let items = vec![item("zero", 10.0, 10.0, 10.0, 0), item("neg", 10.0, 10.0, 10.0, -3)];

        let result = pack_truck(&truck, &items).unwrap();
        assert_eq!(result.placed_count(), 2);
        assert!(result.placed_items.iter().all(|p| p.item.quantity == 1));
    }

    #[test]
    fn equal_volume_places_taller_item_first() {
        let truck = truck(100.0, 100.0, 100.0);
        let items = vec![
            item("small", 10.0, 10.0, 10.0, 1),
            item("wide", 20.0, 10.0, 10.0, 1),
            item("tall", 10.0, 10.0, 20.0, 1),
        ];

        let result = pack_truck(&truck, &items).unwrap();
        let order: Vec<&str> = result
            .placed_items
            .iter()
            .map(|p| p.item.id.as_str())
            .collect();
        assert_eq!(order, vec!["tall", "wide", "small"]);
        assert_eq!(
            positions(&result),
            vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [30.0, 0.0, 0.0]]
        );
    }

    #[test]
    fn full_ties_keep_input_order() {
        let truck = truck(100.0, 100.0, 100.0);
        let items = vec![item("first", 10.0, 10.0, 10.0, 1), item("second", 10.0, 10.0, 10.0, 1)];

        let result = pack_truck(&truck, &items).unwrap();
        assert_eq!(result.placed_items[0].item.id, "first");
        assert_eq!(result.placed_items[1].item.id, "second");
    }

    #[test]
    fn stacks_when_the_floor_is_taken() {
        let truck = truck(10.0, 10.0, 10.0);
        let items = vec![
            item("cube", 5.0, 5.0, 5.0, 1),
            item("plate", 10.0, 10.0, 2.0, 1),
            item("brick", 10.0, 5.0, 5.0, 1),
        ];

        let result = pack_truck(&truck, &items).unwrap();
        assert_valid_layout(&truck, &result);
        let by_id = |id: &str| {
            result
                .placed_items
                .iter()
                .find(|p| p.item.id == id)
                .map(|p| p.position())
        };
        assert_eq!(by_id("brick"), Some(Vec3::zero()));
        assert_eq!(by_id("plate"), Some(Vec3::new(0.0, 5.0, 0.0)));
        assert_eq!(by_id("cube"), Some(Vec3::new(0.0, 0.0, 5.0)));
        assert_relative_eq!(result.volume_utilization, 57.5, epsilon = 1e-9);
    }

    #[test]
    fn metadata_is_passed_through() {
        let truck = truck(100.0, 100.0, 100.0);
        let mut fragile = item("glass", 10.0, 10.0, 10.0, 2);
        fragile.color = "#06b6d4".to_string();
        fragile.weight = Some(3.5);
        fragile.is_fragile = true;
        fragile.is_stackable = false;

        let result = pack_truck(&truck, &[fragile]).unwrap();
        assert_eq!(result.placed_count(), 2);
        for placement in &result.placed_items {
            assert_eq!(placement.item.color, "#06b6d4");
            assert_eq!(placement.item.weight, Some(3.5));
            assert!(placement.item.is_fragile);
            assert!(!placement.item.is_stackable);
            assert_eq!(placement.rotation, [0.0, 0.0, 0.0]);
        }
        assert_ne!(result.placed_items[0].uuid, result.placed_items[1].uuid);
    }

    #[test]
    fn input_is_not_mutated() {
        let truck = truck(100.0, 100.0, 100.0);
        let items = vec![item("b", 10.0, 10.0, 10.0, 3), item("a", 50.0, 50.0, 50.0, 1)];
        let truck_before = truck.clone();
        let items_before = items.clone();

        pack_truck(&truck, &items).unwrap();
        assert_eq!(truck, truck_before);
        assert_eq!(items, items_before);
    }

    #[test]
    fn metrics_report_volumes_and_counts() {
        let truck = truck(600.0, 240.0, 240.0);
        let items = vec![item("full", 600.0, 240.0, 240.0, 2)];

        let result = pack_truck(&truck, &items).unwrap();
        let metrics = &result.metrics;
        assert_relative_eq!(metrics.truck_volume, 34_560_000.0);
        assert_relative_eq!(metrics.used_volume, 34_560_000.0);
        assert_relative_eq!(metrics.remaining_volume, 0.0);
        assert_relative_eq!(
            metrics.truck_volume_cubic_feet,
            34_560_000.0 / CUBIC_CM_PER_CUBIC_FOOT
        );
        assert_eq!(metrics.total_units, 2);
        assert_eq!(metrics.placed_count, 1);
        assert_eq!(metrics.unplaced_count, 1);
    }

    #[test]
    fn progress_events_follow_the_decisions() {
        let truck = truck(100.0, 100.0, 100.0);
        let items = vec![
            item("bad", -1.0, 10.0, 10.0, 1),
            item("a", 100.0, 100.0, 60.0, 2),
        ];

        let mut events = Vec::new();
        let result = pack_truck_with_progress(&truck, &items, |evt| events.push(evt.clone())).unwrap();

        assert_eq!(events.len(), 5);
        assert!(matches!(&events[0], PackEvent::ItemSkipped { item_id, .. } if item_id == "bad"));
        assert!(matches!(&events[1], PackEvent::Started { total_units: 2, .. }));
        match &events[2] {
            PackEvent::ItemPlaced {
                uuid,
                position,
                volume_utilization,
                ..
            } => {
                assert_eq!(uuid, &result.placed_items[0].uuid);
                assert_eq!(*position, [0.0, 0.0, 0.0]);
                assert_relative_eq!(*volume_utilization, 60.0, epsilon = 1e-9);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            &events[3],
            PackEvent::ItemRejected { reason_code, .. } if reason_code == "no_free_anchor"
        ));
        assert!(matches!(
            &events[4],
            PackEvent::Finished {
                placed: 1,
                unplaced: 1,
                ..
            }
        ));
    }

    #[test]
    fn oversized_units_are_rejected_with_dimension_reason() {
        let truck = truck(100.0, 100.0, 100.0);
        let items = vec![item("tower", 10.0, 10.0, 150.0, 1)];

        let mut reason = None;
        pack_truck_with_progress(&truck, &items, |evt| {
            if let PackEvent::ItemRejected { reason_code, .. } = evt {
                reason = Some(reason_code.clone());
            }
        })
        .unwrap();
        assert_eq!(reason.as_deref(), Some("dimensions_exceed_container"));
    }

    #[test]
    fn pack_event_serializes_with_type_tag() {
        let evt = PackEvent::Finished {
            placed: 3,
            unplaced: 0,
            volume_utilization: 42.0,
        };
        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(json["type"], "Finished");
        assert_eq!(json["placed"], 3);
    }

    fn random_manifest(rng: &mut StdRng) -> (Truck, Vec<CargoItem>) {
        let truck = truck(
            rng.gen_range(50..=400) as f64,
            rng.gen_range(50..=250) as f64,
            rng.gen_range(50..=250) as f64,
        );

        let count = rng.gen_range(0..=12);
        let items = (0..count)
            .map(|i| {
                let mut length = rng.gen_range(5..=150) as f64;
                if rng.gen_bool(0.1) {
                    length = 0.0;
                }
                item(
                    &format!("item-{i}"),
                    length,
                    rng.gen_range(5..=120) as f64,
                    rng.gen_range(5..=120) as f64,
                    rng.gen_range(-1..=6),
                )
            })
            .collect();

        (truck, items)
    }

    #[test]
    fn random_manifests_respect_layout_invariants() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let (truck, items) = random_manifest(&mut rng);
            let result = pack_truck(&truck, &items).unwrap();

            assert_valid_layout(&truck, &result);

            let expected_units: usize = items
                .iter()
                .filter(|it| it.validate().is_ok())
                .map(|it| it.unit_count())
                .sum();
            assert_eq!(result.placed_count() + result.unplaced_count(), expected_units);

            let used: f64 = result
                .placed_items
                .iter()
                .map(|p| p.item.dimensions.volume())
                .sum();
            let expected_utilization = 100.0 * used / truck.dimensions.volume();
            assert!((0.0..=100.0 + 1e-9).contains(&result.volume_utilization));
            assert_relative_eq!(
                result.volume_utilization,
                expected_utilization,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let (truck, items) = random_manifest(&mut rng);
            let first = pack_truck(&truck, &items).unwrap();
            let second = pack_truck(&truck, &items).unwrap();

            assert_eq!(positions(&first), positions(&second));
            let first_ids: Vec<&str> = first.placed_items.iter().map(|p| p.item.id.as_str()).collect();
            let second_ids: Vec<&str> = second.placed_items.iter().map(|p| p.item.id.as_str()).collect();
            assert_eq!(first_ids, second_ids);
        }
    }

    #[test]
    fn huge_quantity_is_rejected_before_expansion() {
        let items = vec![item("bulk", 1.0, 1.0, 1.0, i64::MAX)];

        let err = pack_truck(&truck(10.0, 10.0, 10.0), &items).unwrap_err();
        assert!(matches!(
            err,
            PackError::TooManyUnits {
                limit: MAX_UNITS_PER_PACK,
                ..
            }
        ));
    }

    #[test]
    fn unit_cap_ignores_skipped_items() {
        let items = vec![
            item("flat", 0.0, 1.0, 1.0, i64::MAX),
            item("cube", 5.0, 5.0, 5.0, 2),
        ];

        let result = pack_truck(&truck(10.0, 10.0, 10.0), &items).unwrap();
        assert_eq!(result.placed_count(), 2);
    }

    #[test]
    fn anchor_pool_drops_covered_and_unreachable_anchors() {
        let space = Vec3::new(100.0, 50.0, 100.0);
        let extent = Vec3::new(50.0, 50.0, 50.0);
        let mut pool = AnchorPool::new();

        let mut occupied = vec![BoundingBox::from_position_and_extent(Vec3::zero(), extent)];
        pool.record_placement(Vec3::zero(), extent, &space, &occupied);
        assert_eq!(
            pool.points,
            vec![Vec3::new(50.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 50.0)]
        );

        let second = Vec3::new(50.0, 0.0, 0.0);
        occupied.push(BoundingBox::from_position_and_extent(second, extent));
        pool.record_placement(second, extent, &space, &occupied);
        assert_eq!(
            pool.points,
            vec![Vec3::new(0.0, 0.0, 50.0), Vec3::new(50.0, 0.0, 50.0)]
        );
    }

    #[test]
    fn anchor_pool_keeps_a_single_copy_of_shared_corners() {
        let space = Vec3::new(200.0, 200.0, 200.0);
        let extent = Vec3::new(50.0, 50.0, 50.0);
        let mut pool = AnchorPool::new();
        let mut occupied = Vec::new();

        for anchor in [
            Vec3::zero(),
            Vec3::new(50.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 50.0),
        ] {
            occupied.push(BoundingBox::from_position_and_extent(anchor, extent));
            pool.record_placement(anchor, extent, &space, &occupied);
        }

        let shared = Vec3::new(50.0, 0.0, 50.0);
        assert_eq!(pool.points.iter().filter(|p| **p == shared).count(), 1);
        assert!(pool.points.windows(2).all(|w| compare_anchors(&w[0], &w[1]).is_lt()));
    }

    /// Placement loop that keeps every anchor and re-sorts the pool per unit.
    fn unpruned_positions(truck: &Truck, items: &[CargoItem]) -> Vec<[f64; 3]> {
        let space = truck.extent();
        let mut units = expand_units(items, &mut |_: &PackEvent| {}).unwrap();
        sort_units(&mut units);

        let mut points = vec![Vec3::zero()];
        let mut occupied = Vec::new();
        let mut placed = Vec::new();

        for unit in units {
            let extent = unit.extent();
            points.sort_by(compare_anchors);
            if let Some(anchor) = points
                .iter()
                .copied()
                .find(|anchor| fits_at(extent, *anchor, &space, &occupied))
            {
                points.extend(derived_anchors(anchor, extent));
                occupied.push(BoundingBox::from_position_and_extent(anchor, extent));
                placed.push(anchor.to_array());
            }
        }

        placed
    }

    #[test]
    fn pruned_anchor_pool_places_like_the_full_pool() {
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..200 {
            let (truck, items) = random_manifest(&mut rng);
            let result = pack_truck(&truck, &items).unwrap();
            assert_eq!(positions(&result), unpruned_positions(&truck, &items));
        }

        let dense = truck(120.0, 90.0, 60.0);
        let items = vec![
            item("a", 30.0, 30.0, 30.0, 20),
            item("b", 20.0, 10.0, 30.0, 25),
            item("c", 10.0, 10.0, 10.0, 60),
        ];
        let result = pack_truck(&dense, &items).unwrap();
        assert_eq!(positions(&result), unpruned_positions(&dense, &items));
    }
}
