//! Verglas Foundation
//!
//! Leaf utilities shared across the verglas engine. Nothing in this crate
//! knows about scenarios, physics, or calibration — only identifiers,
//! deterministic randomness, and deterministic statistics.

pub mod ids;
pub mod rng;
pub mod stable_hash;
pub mod stats;

pub use ids::{DeviceId, ScenarioId, SensorId};
pub use rng::RngStream;
