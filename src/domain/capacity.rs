use serde::Serialize;
use tracing::info;

use super::entities::{ProductSpec, RegionTariff, StandardBox};
use crate::error::CalculationError;

/// How many product items one standard box holds, and why.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProductFitting {
    pub items_by_dimensions: u64,
    pub items_by_weight: u64,
    pub items_in_standard_box: u64,
}

/// Trip cost spread over standard boxes and product items, unrounded.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoxPricing {
    pub standard_boxes: f64,
    pub standard_box_cost: f64,
    pub cost_per_item: f64,
    pub cost_per_supplier_box: Option<f64>,
}

/// Whole number of `part` that fit in `whole`, tolerant of binary representation error.
fn whole_fits(whole: f64, part: f64) -> u64 {
    let ratio = whole / part;
    let nearest = ratio.round();
    if (ratio - nearest).abs() < 1e-9 {
        nearest as u64
    } else {
        ratio.floor() as u64
    }
}

/// Dual constraint: axis-aligned packing by dimensions and the box weight limit.
pub fn fit_product(
    standard_box: &StandardBox,
    product: &ProductSpec,
) -> Result<ProductFitting, CalculationError> {
    product.validate()?;

    // Saturates: tiny products can exceed u64 on the dimension count alone.
    let items_by_dimensions = whole_fits(standard_box.length, product.length)
        .saturating_mul(whole_fits(standard_box.width, product.width))
        .saturating_mul(whole_fits(standard_box.height, product.height));
    let items_by_weight = whole_fits(standard_box.max_weight, product.weight);
    let items_in_standard_box = items_by_dimensions.min(items_by_weight);

    info!(
        items_by_dimensions,
        items_by_weight, items_in_standard_box, "product fitting"
    );

    if items_in_standard_box == 0 {
        return Err(CalculationError::ProductTooLarge);
    }

    Ok(ProductFitting {
        items_by_dimensions,
        items_by_weight,
        items_in_standard_box,
    })
}

pub fn price_items(
    total_trip_cost: f64,
    tariff: &RegionTariff,
    fitting: &ProductFitting,
    items_per_box: Option<u32>,
) -> Result<BoxPricing, CalculationError> {
    if tariff.standard_box.max_weight <= 0.0 {
        return Err(CalculationError::invalid_tariff(
            "standard_box.max_weight must be greater than zero",
        ));
    }
    let standard_boxes = tariff.standard_trip_weight / tariff.standard_box.max_weight;
    if standard_boxes <= 0.0 || !standard_boxes.is_finite() {
        return Err(CalculationError::invalid_tariff(
            "standard_trip_weight yields no standard boxes",
        ));
    }
    if fitting.items_in_standard_box == 0 {
        return Err(CalculationError::ProductTooLarge);
    }

    let standard_box_cost = total_trip_cost / standard_boxes;
    let cost_per_item = standard_box_cost / fitting.items_in_standard_box as f64;
    let cost_per_supplier_box = items_per_box.map(|items| cost_per_item * f64::from(items));

    Ok(BoxPricing {
        standard_boxes,
        standard_box_cost,
        cost_per_item,
        cost_per_supplier_box,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::sample_tariff;

    fn product(length: f64, width: f64, height: f64, weight: f64) -> ProductSpec {
        ProductSpec {
            length,
            width,
            height,
            weight,
            items_per_box: Some(15),
        }
    }

    #[test]
    fn test_weight_limits_before_dimensions() -> Result<(), CalculationError> {
        let tariff = sample_tariff();
        let fitting = fit_product(&tariff.standard_box, &product(20.0, 10.0, 10.0, 1.0))?;
        assert_eq!(fitting.items_by_dimensions, 48);
        assert_eq!(fitting.items_by_weight, 30);
        assert_eq!(fitting.items_in_standard_box, 30);
        Ok(())
    }

    #[test]
    fn test_fractional_weight_floors() -> Result<(), CalculationError> {
        let tariff = sample_tariff();
        let fitting = fit_product(&tariff.standard_box, &product(20.0, 10.0, 10.0, 1.6))?;
        assert_eq!(fitting.items_by_weight, 18);
        assert_eq!(fitting.items_in_standard_box, 18);
        Ok(())
    }

    #[test]
    fn test_exact_division_is_not_lost_to_rounding() -> Result<(), CalculationError> {
        let standard_box = StandardBox {
            length: 0.3,
            width: 1.0,
            height: 1.0,
            max_weight: 10.0,
        };
        let fitting = fit_product(&standard_box, &product(0.1, 1.0, 1.0, 1.0))?;
        assert_eq!(fitting.items_by_dimensions, 3);
        Ok(())
    }

    #[test]
    fn test_tiny_product_saturates_dimension_count() -> Result<(), CalculationError> {
        let tariff = sample_tariff();
        let fitting = fit_product(&tariff.standard_box, &product(1e-5, 1e-5, 1e-5, 1e-9))?;
        assert_eq!(fitting.items_by_dimensions, u64::MAX);
        assert_eq!(fitting.items_by_weight, 30_000_000_000);
        assert_eq!(fitting.items_in_standard_box, 30_000_000_000);
        Ok(())
    }

    #[test]
    fn test_product_too_large() {
        let tariff = sample_tariff();
        assert_eq!(
            fit_product(&tariff.standard_box, &product(70.0, 10.0, 10.0, 1.0)),
            Err(CalculationError::ProductTooLarge)
        );
        assert_eq!(
            fit_product(&tariff.standard_box, &product(10.0, 10.0, 10.0, 31.0)),
            Err(CalculationError::ProductTooLarge)
        );
    }

    #[test]
    fn test_price_items() -> Result<(), CalculationError> {
        let tariff = sample_tariff();
        let fitting = ProductFitting {
            items_by_dimensions: 48,
            items_by_weight: 30,
            items_in_standard_box: 30,
        };
        let pricing = price_items(3000.0, &tariff, &fitting, Some(10))?;
        assert!((pricing.standard_boxes - 1000.0 / 30.0).abs() < 1e-9);
        assert!((pricing.standard_box_cost - 90.0).abs() < 1e-9);
        assert!((pricing.cost_per_item - 3.0).abs() < 1e-9);
        assert!((pricing.cost_per_supplier_box.unwrap_or_default() - 30.0).abs() < 1e-9);

        let loose = price_items(3000.0, &tariff, &fitting, None)?;
        assert_eq!(loose.cost_per_supplier_box, None);
        Ok(())
    }

    #[test]
    fn test_zero_trip_weight_is_invalid_tariff() {
        let mut tariff = sample_tariff();
        tariff.standard_trip_weight = 0.0;
        let fitting = ProductFitting {
            items_by_dimensions: 1,
            items_by_weight: 1,
            items_in_standard_box: 1,
        };
        assert!(matches!(
            price_items(100.0, &tariff, &fitting, None),
            Err(CalculationError::InvalidTariff(_))
        ));
    }
}
