//! Calculation entry points tying the resolver, aggregator and pricing stages together.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::capacity::{fit_product, price_items, BoxPricing, ProductFitting};
use super::containment::{aggregate_points, estimate_points, PointAggregate};
use super::entities::{
    CalculationRequest, Coordinate, DeliveryScope, DistanceMethod, FacilityId, PointId,
    ProductSpec, RegionId, RegionTariff,
};
use super::resolver::{FacilityResolver, RoutingClient};
use super::sources::DataSource;
use super::tariff::{trip_cost, TripCost};
use crate::error::CalculationError;
use crate::util::round_money;

/// Outcome of one calculation. Money and distance are rounded to cents here and nowhere else.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalculationResult {
    pub items_in_standard_box: u64,
    pub cost_per_item: f64,
    pub cost_per_supplier_box: Option<f64>,
    pub points_used: u32,
    pub points_ignored: Option<u32>,
    pub sectors_count: u32,
    pub distance_to_facility_km: f64,
    pub facility_id: FacilityId,
    pub facility_name: String,
    pub distance_method: DistanceMethod,
    pub breakdown: CostBreakdown,
}

/// Full-precision intermediate values, for auditing a price.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub trip: TripCost,
    pub fitting: ProductFitting,
    pub pricing: BoxPricing,
}

#[derive(Clone)]
pub struct DeliveryCalculator {
    resolver: FacilityResolver,
}

impl DeliveryCalculator {
    pub fn new(resolver: FacilityResolver) -> Self {
        Self { resolver }
    }

    pub fn with_routing(routing: Arc<dyn RoutingClient>) -> Self {
        Self::new(FacilityResolver::new(routing))
    }

    pub fn resolver(&self) -> &FacilityResolver {
        &self.resolver
    }

    pub async fn calculate<S>(
        &self,
        source: &S,
        request: &CalculationRequest,
    ) -> Result<CalculationResult, CalculationError>
    where
        S: DataSource + ?Sized,
    {
        match &request.delivery {
            DeliveryScope::Points { point_ids } => {
                self.calculate_by_points(
                    source,
                    request.region_id,
                    request.supplier,
                    &request.product,
                    point_ids,
                )
                .await
            }
            DeliveryScope::Estimate {
                num_points,
                num_sectors,
            } => {
                self.calculate_estimate(
                    source,
                    request.region_id,
                    request.supplier,
                    &request.product,
                    *num_points,
                    *num_sectors,
                )
                .await
            }
        }
    }

    /// Prices delivery to concrete points; only active points inside a sector count.
    pub async fn calculate_by_points<S>(
        &self,
        source: &S,
        region_id: RegionId,
        supplier: Coordinate,
        product: &ProductSpec,
        point_ids: &[PointId],
    ) -> Result<CalculationResult, CalculationError>
    where
        S: DataSource + ?Sized,
    {
        supplier.validate()?;
        product.validate()?;
        if point_ids.is_empty() {
            return Err(CalculationError::invalid_request(
                "at least one delivery point id is required",
            ));
        }

        let tariff = lookup_tariff(source, region_id)?;
        let aggregate = aggregate_points(source, region_id, point_ids);
        if aggregate.points_used == 0 {
            return Err(CalculationError::invalid_request(
                "none of the delivery points lies inside a sector of the region",
            ));
        }

        self.price(source, region_id, supplier, product, tariff, aggregate)
            .await
    }

    /// Prices delivery from caller-supplied counts; no containment check.
    pub async fn calculate_estimate<S>(
        &self,
        source: &S,
        region_id: RegionId,
        supplier: Coordinate,
        product: &ProductSpec,
        num_points: u32,
        num_sectors: Option<u32>,
    ) -> Result<CalculationResult, CalculationError>
    where
        S: DataSource + ?Sized,
    {
        supplier.validate()?;
        product.validate()?;
        if num_points == 0 {
            return Err(CalculationError::invalid_request(
                "num_points must be greater than zero",
            ));
        }
        if num_sectors == Some(0) {
            return Err(CalculationError::invalid_request(
                "num_sectors must be greater than zero when given",
            ));
        }

        let tariff = lookup_tariff(source, region_id)?;
        let aggregate = estimate_points(source, region_id, num_points, num_sectors);

        self.price(source, region_id, supplier, product, tariff, aggregate)
            .await
    }

    async fn price<S>(
        &self,
        source: &S,
        region_id: RegionId,
        supplier: Coordinate,
        product: &ProductSpec,
        tariff: &RegionTariff,
        aggregate: PointAggregate,
    ) -> Result<CalculationResult, CalculationError>
    where
        S: DataSource + ?Sized,
    {
        // Fitting is pure, so an oversized product fails before any routing call.
        let fitting = fit_product(&tariff.standard_box, product)?;
        let resolution = self.resolver.resolve(source, region_id, supplier).await?;

        let trip = trip_cost(
            resolution.distance_km,
            aggregate.points_used,
            aggregate.sectors_count,
            tariff,
        )?;
        let pricing = price_items(trip.total, tariff, &fitting, product.items_per_box)?;

        info!(
            region_id,
            facility = %resolution.facility.name,
            total_trip_cost = trip.total,
            cost_per_item = pricing.cost_per_item,
            "delivery cost calculated"
        );

        Ok(CalculationResult {
            items_in_standard_box: fitting.items_in_standard_box,
            cost_per_item: round_money(pricing.cost_per_item),
            cost_per_supplier_box: pricing.cost_per_supplier_box.map(round_money),
            points_used: aggregate.points_used,
            points_ignored: aggregate.points_ignored,
            sectors_count: aggregate.sectors_count,
            distance_to_facility_km: round_money(resolution.distance_km),
            facility_id: resolution.facility.id,
            facility_name: resolution.facility.name,
            distance_method: resolution.method,
            breakdown: CostBreakdown {
                trip,
                fitting,
                pricing,
            },
        })
    }
}

fn lookup_tariff<S>(source: &S, region_id: RegionId) -> Result<&RegionTariff, CalculationError>
where
    S: DataSource + ?Sized,
{
    let tariff = source
        .tariff(region_id)
        .ok_or(CalculationError::MissingTariff(region_id))?;
    tariff.validate()?;
    Ok(tariff)
}
