//! Common types and traits for 3D geometry.
//!
//! All coordinates follow the truck convention used by the renderer:
//! `x` runs along the cargo length, `y` along the height and `z` along the
//! width. The origin is the bottom-back-left corner of the cargo space.

use std::ops::Add;

/// Represents a 3D vector or point in space.
///
/// Used for positions, extents, and calculations in the cargo space.
///
/// # Examples
/// ```
/// use truckload::types::Vec3;
///
/// let position = Vec3::new(1.0, 2.0, 3.0);
/// let extent = Vec3::new(10.0, 20.0, 30.0);
/// let far_corner = position + extent;
/// assert_eq!(far_corner, Vec3::new(11.0, 22.0, 33.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    ///
    /// # Parameters
    /// * `x` - X component (length axis)
    /// * `y` - Y component (height axis)
    /// * `z` - Z component (width axis)
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Converts to array format for the wire representation.
    #[inline]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Calculates the volume (product of all components).
    ///
    /// Useful for extent vectors.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    ///
    /// # Parameters
    /// * `container` - The outer vector (e.g., truck extent)
    /// * `tolerance` - Numerical tolerance for the comparison
    #[inline]
    pub fn fits_within(&self, container: &Self, tolerance: f64) -> bool {
        self.x <= container.x + tolerance
            && self.y <= container.y + tolerance
            && self.z <= container.z + tolerance
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl From<[f64; 3]> for Vec3 {
    #[inline]
    fn from(array: [f64; 3]) -> Self {
        Self::new(array[0], array[1], array[2])
    }
}

impl From<Vec3> for [f64; 3] {
    #[inline]
    fn from(vec: Vec3) -> Self {
        vec.to_array()
    }
}

/// Trait for objects with a spatial extent along the three truck axes.
pub trait Dimensional {
    /// Returns the extent as (length, height, width).
    fn extent(&self) -> Vec3;

    /// Calculates the volume.
    fn volume(&self) -> f64 {
        self.extent().volume()
    }

    /// Checks if this object fits in a space with the given extent.
    fn fits_in(&self, space: &Vec3, tolerance: f64) -> bool {
        self.extent().fits_within(space, tolerance)
    }
}

/// Trait for objects with a position inside the cargo space.
pub trait Positioned {
    /// Returns the position (minimum corner).
    fn position(&self) -> Vec3;
}

/// Represents an Axis-Aligned Bounding Box (AABB).
///
/// Used for collision detection and containment checks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner (position)
    pub min: Vec3,
    /// Maximum corner (position + extent)
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a bounding box from a position and an extent.
    #[inline]
    pub fn from_position_and_extent(position: Vec3, extent: Vec3) -> Self {
        Self {
            min: position,
            max: position + extent,
        }
    }

    /// Bounding box of anything that has both a position and an extent.
    #[inline]
    pub fn of<T: Positioned + Dimensional>(object: &T) -> Self {
        Self::from_position_and_extent(object.position(), object.extent())
    }

    /// Checks if two bounding boxes intersect.
    ///
    /// Boxes intersect only when their projections overlap on all three axes.
    /// The comparison is strict, so boxes sharing a face do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y
            || self.max.z <= other.min.z
            || other.max.z <= self.min.z)
    }

    /// Checks if this box lies completely inside the space `[0, extent]`.
    #[inline]
    pub fn inside_space(&self, extent: &Vec3) -> bool {
        self.min.x >= 0.0
            && self.min.y >= 0.0
            && self.min.z >= 0.0
            && self.max.fits_within(extent, 0.0)
    }

    /// Checks whether a box anchored at `point` would always intersect this box.
    ///
    /// True when `min <= point < max` on every axis. Any box with a positive
    /// extent placed there overlaps this one.
    #[inline]
    pub fn covers_anchor(&self, point: &Vec3) -> bool {
        self.min.x <= point.x
            && point.x < self.max.x
            && self.min.y <= point.y
            && point.y < self.max.y
            && self.min.z <= point.z
            && point.z < self.max.z
    }
}
