//! Geometric helpers for collision detection and candidate anchors.
//!
//! This module provides the fit test used by the packing engine and the
//! extreme-point bookkeeping around it: which anchors a placed box derives,
//! and in which order anchors are tried.

use std::cmp::Ordering;

use crate::types::{BoundingBox, Vec3};

/// Fit test for a box of `extent` flush against `anchor`.
///
/// The box must stay inside `[0, space]` on every axis and must not
/// intersect any of the `occupied` boxes.
///
/// # Parameters
/// * `extent` - Box size as (length, height, width)
/// * `anchor` - Candidate minimum corner
/// * `space` - Extent of the cargo space
/// * `occupied` - Boxes that are already placed
pub fn fits_at(extent: Vec3, anchor: Vec3, space: &Vec3, occupied: &[BoundingBox]) -> bool {
    let candidate = BoundingBox::from_position_and_extent(anchor, extent);
    if !candidate.inside_space(space) {
        return false;
    }

    !occupied.iter().any(|other| candidate.intersects(other))
}

/// Anchors derived from a box placed at `anchor` with `extent`.
///
/// Returns the corners right of (along length), on top of (along height)
/// and in front of (along width) the placed box, in that order.
pub fn derived_anchors(anchor: Vec3, extent: Vec3) -> [Vec3; 3] {
    [
        Vec3::new(anchor.x + extent.x, anchor.y, anchor.z),
        Vec3::new(anchor.x, anchor.y + extent.y, anchor.z),
        Vec3::new(anchor.x, anchor.y, anchor.z + extent.z),
    ]
}

/// Bottom-back-left order: lowest height first, then back, then left.
pub fn compare_anchors(a: &Vec3, b: &Vec3) -> Ordering {
    a.y.total_cmp(&b.y)
        .then_with(|| a.z.total_cmp(&b.z))
        .then_with(|| a.x.total_cmp(&b.x))
}
