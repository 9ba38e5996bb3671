//! Shared builders for unit tests.

use std::collections::HashMap;

use geo_types::{Coord, LineString, Polygon};

use super::entities::{
    DeliveryPoint, DiscountSchedule, Facility, PointId, RegionId, RegionTariff, Sector, SectorId,
    StandardBox,
};
use super::sources::{FacilityDirectory, SectorStore, TariffLookup};

/// Tariff whose worked example prices 150 points over 3 sectors at 15.5 km to 38.29 per item.
pub fn sample_tariff() -> RegionTariff {
    RegionTariff {
        driver_hourly_rate: 450.0,
        planned_work_hours: 8.0,
        fuel_price_per_liter: 65.0,
        fuel_consumption_per_100km: 20.0,
        depreciation_coefficient: 1.3,
        warehouse_processing_per_kg: 1.5,
        service_fee_per_kg: 2.5,
        delivery_point_cost: 55.0,
        standard_trip_weight: 1000.0,
        standard_box: StandardBox {
            length: 60.0,
            width: 40.0,
            height: 40.0,
            max_weight: 30.0,
        },
        discount: DiscountSchedule {
            min_points_for_discount: 100,
            discount_step_points: 50,
            initial_discount_percent: 5.0,
            discount_step_percent: 5.0,
        },
    }
}

/// Axis-aligned square sector with its south-west corner at (lat, lon).
pub fn square_sector(
    id: SectorId,
    region_id: RegionId,
    latitude: f64,
    longitude: f64,
    size: f64,
) -> Sector {
    let ring = vec![
        Coord {
            x: longitude,
            y: latitude,
        },
        Coord {
            x: longitude + size,
            y: latitude,
        },
        Coord {
            x: longitude + size,
            y: latitude + size,
        },
        Coord {
            x: longitude,
            y: latitude + size,
        },
        Coord {
            x: longitude,
            y: latitude,
        },
    ];
    Sector {
        id,
        region_id,
        name: None,
        boundary: Polygon::new(LineString::from(ring), vec![]),
    }
}

#[derive(Default)]
pub struct TestStore {
    pub facilities: Vec<Facility>,
    pub tariffs: HashMap<RegionId, RegionTariff>,
    pub sectors: Vec<Sector>,
    pub points: Vec<DeliveryPoint>,
}

impl FacilityDirectory for TestStore {
    fn active_facilities(&self, region_id: RegionId) -> Vec<&Facility> {
        self.facilities
            .iter()
            .filter(|f| f.region_id == region_id && f.is_active)
            .collect()
    }
}

impl TariffLookup for TestStore {
    fn tariff(&self, region_id: RegionId) -> Option<&RegionTariff> {
        self.tariffs.get(&region_id)
    }
}

impl SectorStore for TestStore {
    fn delivery_points(&self, ids: &[PointId]) -> Vec<&DeliveryPoint> {
        self.points.iter().filter(|p| ids.contains(&p.id)).collect()
    }

    fn sectors(&self, region_id: RegionId) -> Vec<&Sector> {
        self.sectors
            .iter()
            .filter(|s| s.region_id == region_id)
            .collect()
    }
}
