//! Trip cost pipeline: distance, footprint and regional tariff in, total trip cost out.

use serde::Serialize;

use super::entities::{DiscountSchedule, RegionTariff};
use crate::error::CalculationError;

/// Every stage of the trip cost, unrounded.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TripCost {
    pub driver_cost: f64,
    pub company_revenue: f64,
    pub fuel_liters: f64,
    pub fuel_cost: f64,
    pub transport_cost: f64,
    pub warehouse_cost: f64,
    pub discount_percent: f64,
    pub delivery_cost: f64,
    pub total: f64,
}

/// Discount earned by `num_points`, in percent, capped at 100.
pub fn discount_percent(num_points: u32, schedule: &DiscountSchedule) -> f64 {
    if num_points < schedule.min_points_for_discount {
        return 0.0;
    }

    let steps = match schedule.discount_step_points {
        0 => 0,
        step => (num_points - schedule.min_points_for_discount) / step,
    };

    let percent =
        schedule.initial_discount_percent + f64::from(steps) * schedule.discount_step_percent;
    percent.min(100.0)
}

/// Sector-based delivery fee after the tiered discount.
///
/// Each sector is billed at least `min_points_for_discount` points.
pub fn delivery_cost(num_points: u32, num_sectors: u32, tariff: &RegionTariff) -> (f64, f64) {
    let base = f64::from(num_sectors)
        * tariff.delivery_point_cost
        * f64::from(tariff.discount.min_points_for_discount);
    let discount = discount_percent(num_points, &tariff.discount);
    if discount == 0.0 {
        (base, discount)
    } else {
        (base * (1.0 - discount / 100.0), discount)
    }
}

pub fn trip_cost(
    distance_km: f64,
    num_points: u32,
    num_sectors: u32,
    tariff: &RegionTariff,
) -> Result<TripCost, CalculationError> {
    tariff.validate()?;
    if !distance_km.is_finite() || distance_km < 0.0 {
        return Err(CalculationError::invalid_request(format!(
            "distance must be a non-negative number, got {distance_km}"
        )));
    }

    let driver_cost = tariff.planned_work_hours * tariff.driver_hourly_rate;
    let company_revenue = tariff.service_fee_per_kg * tariff.standard_trip_weight;
    // Round trip to the facility and back.
    let fuel_liters = (tariff.fuel_consumption_per_100km / 100.0) * (distance_km * 2.0);
    let fuel_cost = fuel_liters * tariff.fuel_price_per_liter;
    let transport_cost = fuel_cost * tariff.depreciation_coefficient;
    let warehouse_cost = tariff.warehouse_processing_per_kg * tariff.standard_trip_weight;
    let (delivery_cost, discount_percent) = delivery_cost(num_points, num_sectors, tariff);

    let total = driver_cost + company_revenue + transport_cost + warehouse_cost + delivery_cost;

    Ok(TripCost {
        driver_cost,
        company_revenue,
        fuel_liters,
        fuel_cost,
        transport_cost,
        warehouse_cost,
        discount_percent,
        delivery_cost,
        total,
    })
}
