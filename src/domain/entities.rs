use geo_types::{Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::CalculationError;

pub type RegionId = i64;
pub type FacilityId = i64;
pub type SectorId = i64;
pub type PointId = i64;

/// WGS84 position in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn validate(&self) -> Result<(), CalculationError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(CalculationError::invalid_request(format!(
                "coordinate out of range: ({}, {})",
                self.latitude, self.longitude
            )))
        }
    }

    /// Planar point with x = longitude, y = latitude.
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Distribution center from which delivery trips start.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub region_id: RegionId,
    pub name: String,
    pub coordinate: Coordinate,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPoint {
    pub id: PointId,
    pub coordinate: Coordinate,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Region-scoped service area. Membership is strict interior containment.
#[derive(Clone, Debug, PartialEq)]
pub struct Sector {
    pub id: SectorId,
    pub region_id: RegionId,
    pub name: Option<String>,
    pub boundary: Polygon<f64>,
}

/// Reference packing unit, centimetres and kilograms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardBox {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub max_weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscountSchedule {
    /// Below this many points no discount applies; also the billed point floor per sector.
    pub min_points_for_discount: u32,
    pub discount_step_points: u32,
    pub initial_discount_percent: f64,
    pub discount_step_percent: f64,
}

impl DiscountSchedule {
    pub fn is_configured(&self) -> bool {
        self.initial_discount_percent > 0.0 || self.discount_step_percent > 0.0
    }
}

/// Per-region pricing parameters. Monetary values are in the region's currency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionTariff {
    pub driver_hourly_rate: f64,
    pub planned_work_hours: f64,
    pub fuel_price_per_liter: f64,
    pub fuel_consumption_per_100km: f64,
    pub depreciation_coefficient: f64,
    pub warehouse_processing_per_kg: f64,
    pub service_fee_per_kg: f64,
    pub delivery_point_cost: f64,
    pub standard_trip_weight: f64,
    pub standard_box: StandardBox,
    pub discount: DiscountSchedule,
}

impl RegionTariff {
    /// Checks every physical constraint; run when a tariff is loaded.
    pub fn validate(&self) -> Result<(), CalculationError> {
        let fields = [
            ("driver_hourly_rate", self.driver_hourly_rate),
            ("planned_work_hours", self.planned_work_hours),
            ("fuel_price_per_liter", self.fuel_price_per_liter),
            ("fuel_consumption_per_100km", self.fuel_consumption_per_100km),
            ("depreciation_coefficient", self.depreciation_coefficient),
            ("warehouse_processing_per_kg", self.warehouse_processing_per_kg),
            ("service_fee_per_kg", self.service_fee_per_kg),
            ("delivery_point_cost", self.delivery_point_cost),
            ("standard_trip_weight", self.standard_trip_weight),
            ("standard_box.length", self.standard_box.length),
            ("standard_box.width", self.standard_box.width),
            ("standard_box.height", self.standard_box.height),
            ("standard_box.max_weight", self.standard_box.max_weight),
            (
                "discount.initial_discount_percent",
                self.discount.initial_discount_percent,
            ),
            (
                "discount.discount_step_percent",
                self.discount.discount_step_percent,
            ),
        ];

        if let Some((name, value)) = fields
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(CalculationError::invalid_tariff(format!(
                "{name} must be a non-negative number, got {value}"
            )));
        }

        if self.standard_box.max_weight == 0.0 {
            return Err(CalculationError::invalid_tariff(
                "standard_box.max_weight must be greater than zero",
            ));
        }

        if self.discount.is_configured() && self.discount.discount_step_points == 0 {
            return Err(CalculationError::invalid_tariff(
                "discount.discount_step_points must be greater than zero when a discount is configured",
            ));
        }

        Ok(())
    }
}

/// Supplier product geometry, centimetres and kilograms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    #[serde(default)]
    pub items_per_box: Option<u32>,
}

impl ProductSpec {
    pub fn validate(&self) -> Result<(), CalculationError> {
        let fields = [
            ("length", self.length),
            ("width", self.width),
            ("height", self.height),
            ("weight", self.weight),
        ];
        if let Some((name, value)) = fields
            .iter()
            .find(|(_, value)| !value.is_finite() || *value <= 0.0)
        {
            return Err(CalculationError::invalid_request(format!(
                "product {name} must be greater than zero, got {value}"
            )));
        }
        if self.items_per_box == Some(0) {
            return Err(CalculationError::invalid_request(
                "product items_per_box must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Which deliveries a calculation covers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeliveryScope {
    /// Concrete delivery points, checked against the region's sectors.
    Points { point_ids: Vec<PointId> },
    /// Caller-supplied counts; sectors default to the region total.
    Estimate {
        num_points: u32,
        #[serde(default)]
        num_sectors: Option<u32>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub region_id: RegionId,
    pub supplier: Coordinate,
    pub product: ProductSpec,
    pub delivery: DeliveryScope,
}

/// How the facility distance was obtained.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistanceMethod {
    RoutingApi { provider: String },
    FallbackCoefficient,
}
