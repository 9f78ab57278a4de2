//! Truck load planning: greedy extreme-point packing of cargo items into a
//! truck's cargo space, with an HTTP API for the dashboard.

pub mod api;
pub mod config;
pub mod fleet;
pub mod geometry;
pub mod model;
pub mod optimizer;
pub mod types;
