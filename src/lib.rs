//! Delivery cost engine.
//!
//! Picks the nearest distribution center to a supplier, counts the sectors a
//! delivery touches and prices the trip with the region's tariff, down to a
//! cost per item and per supplier box.

pub mod domain;
pub mod error;
pub mod infra;
pub mod util;

pub use domain::{CalculationRequest, CalculationResult, DeliveryCalculator};
pub use error::{CalculationError, RoutingError};
pub use infra::{SnapshotStore, StoreError};
pub use util::config::{load_config, EngineConfig};
