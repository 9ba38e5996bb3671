//! Delivery cost domain: entities, distance, containment and pricing stages.

pub mod calculator;
pub mod capacity;
pub mod containment;
pub mod entities;
pub mod geo_distance;
pub mod resolver;
pub mod sources;
pub mod tariff;

#[cfg(test)]
pub(crate) mod fixtures;

pub use calculator::{CalculationResult, CostBreakdown, DeliveryCalculator};
pub use capacity::{fit_product, price_items, BoxPricing, ProductFitting};
pub use containment::{aggregate_points, estimate_points, PointAggregate};
pub use entities::{
    CalculationRequest, Coordinate, DeliveryPoint, DeliveryScope, DiscountSchedule,
    DistanceMethod, Facility, FacilityId, PointId, ProductSpec, RegionId, RegionTariff, Sector,
    SectorId, StandardBox,
};
pub use geo_distance::haversine_km;
pub use resolver::{FacilityResolver, Resolution, RoutingClient};
pub use sources::{DataSource, FacilityDirectory, SectorStore, TariffLookup};
pub use tariff::{delivery_cost, discount_percent, trip_cost, TripCost};
