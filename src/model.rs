//! Data models for truck load planning.
//!
//! This module defines the data structures exchanged with the packing engine:
//! - `Truck`: The cargo space to load, with its usable interior dimensions
//! - `CargoItem`: A kind of goods with dimensions and a repeat count
//! - `Placement`: One physical unit of an item with its position in the truck
//!
//! Dimensions are centimeters. `Dimensions` maps to the geometry axes as
//! length → x, height → y, width → z.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{Dimensional, Positioned, Vec3};

/// Errors produced while validating packing input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackError {
    /// The truck is missing or has a non-positive dimension. Fatal to a pack call.
    #[error("Invalid container: {0}")]
    InvalidContainer(String),
    /// An item has a non-positive dimension. The engine skips such items.
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    /// The valid items expand to more units than one pack call accepts.
    #[error("Items expand to {requested} units, at most {limit} can be packed at once")]
    TooManyUnits { requested: usize, limit: usize },
}

/// Helper function to validate a single dimension.
fn check_dimension(value: f64, name: &str) -> Result<(), String> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(format!("{} must be positive, got: {}", name, value));
    }
    Ok(())
}

/// Interior or exterior size of a box in centimeters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "length": 120.0, "width": 80.0, "height": 100.0 }))]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub const fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// Extent in geometry axes: (length, height, width).
    #[inline]
    pub fn extent(&self) -> Vec3 {
        Vec3::new(self.length, self.height, self.width)
    }

    /// Volume in cubic centimeters.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    fn check_all(&self, owner: &str) -> Result<(), String> {
        check_dimension(self.length, &format!("{owner} length"))?;
        check_dimension(self.width, &format!("{owner} width"))?;
        check_dimension(self.height, &format!("{owner} height"))?;
        Ok(())
    }
}

/// A truck (or any transport unit) whose cargo space gets loaded.
///
/// # Fields
/// * `id` - Catalog identifier
/// * `name` - Display name
/// * `dimensions` - Usable interior cargo volume
/// * `max_weight` - Payload limit in kg, informational only
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "default-truck-1",
        "name": "Tata LPT 1613 Container",
        "dimensions": { "length": 600.0, "width": 240.0, "height": 240.0 },
        "max_weight": 16000.0
    })
)]
pub struct Truck {
    pub id: String,
    pub name: String,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub max_weight: f64,
}

impl Truck {
    /// Creates a truck without validating it; `validate` runs at pack time.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        dimensions: Dimensions,
        max_weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            dimensions,
            max_weight,
        }
    }

    /// Checks that all three interior dimensions are positive and finite.
    ///
    /// # Returns
    /// `Ok(())` for a usable cargo space, otherwise `Err(PackError::InvalidContainer)`
    pub fn validate(&self) -> Result<(), PackError> {
        self.dimensions
            .check_all("Container")
            .map_err(PackError::InvalidContainer)
    }
}

impl Dimensional for Truck {
    fn extent(&self) -> Vec3 {
        self.dimensions.extent()
    }
}

fn default_quantity() -> i64 {
    1
}

/// A kind of cargo to load, possibly repeated by `quantity`.
///
/// `color`, `weight`, `is_fragile` and `is_stackable` are carried through to
/// the result. Placement never reads them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "pallet-a",
        "name": "Euro pallet",
        "quantity": 4,
        "dimensions": { "length": 120.0, "width": 80.0, "height": 100.0 },
        "color": "#3b82f6",
        "weight": 250.0,
        "is_fragile": false,
        "is_stackable": true
    })
)]
pub struct CargoItem {
    pub id: String,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub is_fragile: bool,
    #[serde(default)]
    pub is_stackable: bool,
}

impl CargoItem {
    /// Creates an item with quantity 1 and default metadata.
    pub fn new(id: impl Into<String>, name: impl Into<String>, dimensions: Dimensions) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quantity: 1,
            dimensions,
            color: String::new(),
            weight: None,
            is_fragile: false,
            is_stackable: false,
        }
    }

    /// Sets the quantity (Builder pattern light).
    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    /// Number of physical units this entry stands for. Never below 1.
    pub fn unit_count(&self) -> usize {
        usize::try_from(self.quantity.max(1)).unwrap_or(usize::MAX)
    }

    /// A single-unit copy of this item.
    pub fn unit(&self) -> Self {
        Self {
            quantity: 1,
            ..self.clone()
        }
    }

    /// Checks that all three dimensions are positive and finite.
    pub fn validate(&self) -> Result<(), PackError> {
        self.dimensions
            .check_all(&format!("Item '{}'", self.name))
            .map_err(PackError::InvalidDimension)
    }
}

impl Dimensional for CargoItem {
    fn extent(&self) -> Vec3 {
        self.dimensions.extent()
    }
}

/// One physical unit of a `CargoItem` placed inside the truck.
///
/// # Fields
/// * `uuid` - Fresh instance identifier, unique within a result
/// * `item` - The source item with quantity collapsed to 1, serialized inline
/// * `position` - Minimum corner `[x, y, z]` (length, height, width axes)
/// * `rotation` - Always `[0, 0, 0]`; items are never rotated
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Placement {
    pub uuid: String,
    #[serde(flatten)]
    pub item: CargoItem,
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.0, 0.0]))]
    pub position: [f64; 3],
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.0, 0.0]))]
    pub rotation: [f64; 3],
}

impl Placement {
    /// Places a unit at the given position with a freshly generated instance id.
    pub fn new(item: CargoItem, position: Vec3) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            item,
            position: position.to_array(),
            rotation: [0.0, 0.0, 0.0],
        }
    }
}

impl Positioned for Placement {
    fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }
}

impl Dimensional for Placement {
    fn extent(&self) -> Vec3 {
        self.item.extent()
    }
}
