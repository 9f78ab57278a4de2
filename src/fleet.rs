//! Fleet registry: the truck types a load can be planned for.
//!
//! The built-in catalog covers common Indian transport units with their
//! approximate interior cargo dimensions. A JSON file can add trucks or
//! replace built-in ones by id.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::model::{Dimensions, Truck};

/// Id of the truck used when a request names none.
pub const DEFAULT_TRUCK_ID: &str = "default-truck-1";

/// Errors while reading a fleet override file.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("Could not read fleet file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not parse fleet file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Truck catalog in display order.
#[derive(Clone, Debug)]
pub struct FleetRegistry {
    trucks: Vec<Truck>,
}

impl FleetRegistry {
    /// The built-in catalog.
    pub fn builtin() -> Self {
        let catalog = [
            (DEFAULT_TRUCK_ID, "Tata LPT 1613 Container", 600.0, 240.0, 240.0, 16000.0),
            ("tata-1109", "Tata 1109 Cabin Chassis", 450.0, 220.0, 220.0, 11000.0),
            ("eicher-12ft", "Eicher 12 Ft Single Axle", 360.0, 180.0, 180.0, 7500.0),
            ("bharatbenz-1623r", "BharatBenz 1623R Tipper", 550.0, 230.0, 150.0, 16000.0),
            ("ashok-1616", "Ashok Leyland 1616 HD", 650.0, 240.0, 240.0, 16000.0),
            ("mahindra-blazo", "Mahindra Blazo 25 HP Tipper", 480.0, 210.0, 160.0, 25000.0),
            ("tata-407", "Tata 407 Gold SFC", 320.0, 170.0, 170.0, 4000.0),
            ("eicher-pro-2049", "Eicher Pro 2049", 580.0, 230.0, 230.0, 20000.0),
            ("ashok-leyland-dost", "Ashok Leyland Dost+", 280.0, 160.0, 160.0, 1900.0),
            ("mahindra-furio", "Mahindra Furio 17", 520.0, 220.0, 220.0, 17000.0),
            ("tata-signa-4825", "Tata Signa 4825.TK", 700.0, 250.0, 250.0, 48000.0),
        ];

        let trucks = catalog
            .into_iter()
            .map(|(id, name, length, width, height, max_weight)| {
                Truck::new(id, name, Dimensions::new(length, width, height), max_weight)
            })
            .collect();

        Self { trucks }
    }

    /// Merges `overrides` into the catalog.
    ///
    /// An override with a known id replaces that truck in place; unknown ids
    /// are appended. Trucks with invalid dimensions are skipped.
    pub fn with_overrides(mut self, overrides: Vec<Truck>) -> Self {
        for truck in overrides {
            if let Err(err) = truck.validate() {
                warn!(truck = %truck.id, "Ignoring fleet entry: {err}");
                continue;
            }

            match self.trucks.iter_mut().find(|known| known.id == truck.id) {
                Some(known) => *known = truck,
                None => self.trucks.push(truck),
            }
        }
        self
    }

    /// Built-in catalog plus the overrides from `path`, if given.
    ///
    /// A file that cannot be read or parsed is logged and ignored.
    pub fn load(path: Option<&Path>) -> Self {
        let registry = Self::builtin();
        let Some(path) = path else {
            return registry;
        };

        match read_fleet_file(path) {
            Ok(overrides) => {
                info!(
                    "🚚 Loaded {} fleet entries from {}",
                    overrides.len(),
                    path.display()
                );
                registry.with_overrides(overrides)
            }
            Err(err) => {
                warn!("⚠️ {err}. Using built-in fleet.");
                registry
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Truck> {
        self.trucks.iter().find(|truck| truck.id == id)
    }

    /// The default truck, or the first catalog entry if it was removed.
    pub fn default_truck(&self) -> Option<&Truck> {
        self.get(DEFAULT_TRUCK_ID).or_else(|| self.trucks.first())
    }

    pub fn trucks(&self) -> &[Truck] {
        &self.trucks
    }
}

/// Reads a JSON array of trucks.
pub fn read_fleet_file(path: &Path) -> Result<Vec<Truck>, FleetError> {
    let raw = fs::read_to_string(path).map_err(|source| FleetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| FleetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
