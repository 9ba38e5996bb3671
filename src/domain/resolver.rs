//! Nearest distribution center lookup.
//!
//! - Ranks the region's active facilities by straight-line distance.
//! - Asks the routing provider for road distances to the closest few, concurrently.
//! - Any lookup that fails or times out falls back to straight line × coefficient.

use std::{cmp::Ordering, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::entities::{Coordinate, DistanceMethod, Facility, RegionId};
use super::geo_distance::haversine_km;
use super::sources::FacilityDirectory;
use crate::error::{CalculationError, RoutingError};

/// How many straight-line neighbours get a road-distance lookup.
pub const CANDIDATE_LIMIT: usize = 3;
/// Empirical ratio of road to straight-line distance.
pub const DEFAULT_FALLBACK_COEFFICIENT: f64 = 1.4;
pub const DEFAULT_ROUTING_TIMEOUT: Duration = Duration::from_secs(10);

/// Road-network distance provider.
#[async_trait]
pub trait RoutingClient: Send + Sync {
    /// Provider label reported in results, e.g. `openroute_api`.
    fn name(&self) -> &str;

    async fn road_distance_km(&self, from: Coordinate, to: Coordinate)
        -> Result<f64, RoutingError>;
}

/// The chosen facility and how far the supplier is from it.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub facility: Facility,
    pub straight_line_km: f64,
    pub distance_km: f64,
    pub method: DistanceMethod,
}

#[derive(Clone)]
pub struct FacilityResolver {
    routing: Arc<dyn RoutingClient>,
    timeout: Duration,
    fallback_coefficient: f64,
}

impl FacilityResolver {
    pub fn new(routing: Arc<dyn RoutingClient>) -> Self {
        Self {
            routing,
            timeout: DEFAULT_ROUTING_TIMEOUT,
            fallback_coefficient: DEFAULT_FALLBACK_COEFFICIENT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fallback_coefficient(mut self, coefficient: f64) -> Self {
        self.fallback_coefficient = coefficient;
        self
    }

    pub fn fallback_coefficient(&self) -> f64 {
        self.fallback_coefficient
    }

    pub async fn resolve<D>(
        &self,
        directory: &D,
        region_id: RegionId,
        supplier: Coordinate,
    ) -> Result<Resolution, CalculationError>
    where
        D: FacilityDirectory + ?Sized,
    {
        let mut ranked: Vec<(&Facility, f64)> = directory
            .active_facilities(region_id)
            .into_iter()
            .filter(|facility| facility.is_active && facility.region_id == region_id)
            .map(|facility| (facility, haversine_km(supplier, facility.coordinate)))
            .collect();

        if ranked.is_empty() {
            warn!(region_id, "no active distribution centers");
            return Err(CalculationError::NoActiveFacility(region_id));
        }

        ranked.sort_by(|(a, a_km), (b, b_km)| a_km.total_cmp(b_km).then(a.id.cmp(&b.id)));
        ranked.truncate(CANDIDATE_LIMIT);

        let candidates = join_all(
            ranked
                .iter()
                .map(|&(facility, straight_km)| self.refine(supplier, facility, straight_km)),
        )
        .await;

        let best = candidates
            .into_iter()
            .min_by(compare_candidates)
            .ok_or(CalculationError::NoActiveFacility(region_id))?;

        info!(
            facility = %best.facility.name,
            distance_km = best.distance_km,
            method = ?best.method,
            "selected nearest distribution center"
        );

        Ok(best)
    }

    async fn refine(
        &self,
        supplier: Coordinate,
        facility: &Facility,
        straight_line_km: f64,
    ) -> Resolution {
        let lookup = self
            .routing
            .road_distance_km(supplier, facility.coordinate);

        let road = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(km)) if km.is_finite() && km >= 0.0 => Some(km),
            Ok(Ok(km)) => {
                warn!(facility = %facility.name, km, "routing returned an unusable distance");
                None
            }
            Ok(Err(error)) => {
                warn!(facility = %facility.name, %error, "routing lookup failed");
                None
            }
            Err(_) => {
                warn!(
                    facility = %facility.name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "routing lookup timed out"
                );
                None
            }
        };

        let (distance_km, method) = match road {
            Some(km) => {
                debug!(facility = %facility.name, km, provider = self.routing.name(), "road distance");
                (
                    km,
                    DistanceMethod::RoutingApi {
                        provider: self.routing.name().to_string(),
                    },
                )
            }
            None => {
                let km = straight_line_km * self.fallback_coefficient;
                debug!(
                    facility = %facility.name,
                    km,
                    straight_line_km,
                    "using fallback distance"
                );
                (km, DistanceMethod::FallbackCoefficient)
            }
        };

        Resolution {
            facility: facility.clone(),
            straight_line_km,
            distance_km,
            method,
        }
    }
}

fn compare_candidates(a: &Resolution, b: &Resolution) -> Ordering {
    a.distance_km
        .total_cmp(&b.distance_km)
        .then(a.straight_line_km.total_cmp(&b.straight_line_km))
        .then(a.facility.id.cmp(&b.facility.id))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::domain::fixtures::TestStore;

    const SUPPLIER: Coordinate = Coordinate {
        latitude: 43.585472,
        longitude: 39.723098,
    };

    /// Answers from a per-destination script and records every lookup.
    #[derive(Default)]
    struct ScriptedRouting {
        answers: HashMap<(u64, u64), Result<f64, String>>,
        delay: Option<Duration>,
        calls: Mutex<Vec<Coordinate>>,
    }

    fn key(coordinate: Coordinate) -> (u64, u64) {
        (coordinate.latitude.to_bits(), coordinate.longitude.to_bits())
    }

    impl ScriptedRouting {
        fn answer(mut self, to: Coordinate, answer: Result<f64, &str>) -> Self {
            self.answers
                .insert(key(to), answer.map_err(str::to_string));
            self
        }

        fn called(&self) -> Vec<Coordinate> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl RoutingClient for ScriptedRouting {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn road_distance_km(
            &self,
            _from: Coordinate,
            to: Coordinate,
        ) -> Result<f64, RoutingError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(to);
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.answers.get(&key(to)) {
                Some(Ok(km)) => Ok(*km),
                Some(Err(message)) => Err(RoutingError::Api(message.clone())),
                None => Err(RoutingError::Api("no route".into())),
            }
        }
    }

    fn facility(id: i64, latitude: f64, longitude: f64) -> Facility {
        Facility {
            id,
            region_id: 1,
            name: format!("DC {id}"),
            coordinate: Coordinate::new(latitude, longitude),
            is_active: true,
            address: None,
        }
    }

    /// Five facilities, ids ordered by straight-line distance from the supplier.
    fn five_facilities() -> TestStore {
        TestStore {
            facilities: vec![
                facility(4, 43.70, 39.90),
                facility(1, 43.60, 39.73),
                facility(5, 43.40, 40.00),
                facility(2, 43.55, 39.80),
                facility(3, 43.50, 39.70),
            ],
            ..TestStore::default()
        }
    }

    #[tokio::test]
    async fn test_only_three_nearest_are_routed() -> Result<(), CalculationError> {
        let store = five_facilities();
        let routing = Arc::new(ScriptedRouting::default());
        let resolver = FacilityResolver::new(routing.clone());

        resolver.resolve(&store, 1, SUPPLIER).await?;

        let mut called: Vec<(f64, f64)> = routing
            .called()
            .iter()
            .map(|c| (c.latitude, c.longitude))
            .collect();
        called.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert_eq!(called, vec![(43.50, 39.70), (43.55, 39.80), (43.60, 39.73)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_all_failures_pick_min_fallback() -> Result<(), CalculationError> {
        let store = five_facilities();
        let resolver = FacilityResolver::new(Arc::new(ScriptedRouting::default()));

        let resolution = resolver.resolve(&store, 1, SUPPLIER).await?;

        assert_eq!(resolution.facility.id, 1);
        assert_eq!(resolution.method, DistanceMethod::FallbackCoefficient);
        let expected = haversine_km(SUPPLIER, Coordinate::new(43.60, 39.73)) * 1.4;
        assert!((resolution.distance_km - expected).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_road_distance_can_reorder_candidates() -> Result<(), CalculationError> {
        let store = five_facilities();
        let routing = ScriptedRouting::default()
            .answer(Coordinate::new(43.60, 39.73), Ok(25.0))
            .answer(Coordinate::new(43.55, 39.80), Ok(9.0))
            .answer(Coordinate::new(43.50, 39.70), Err("quota exceeded"));
        let resolver = FacilityResolver::new(Arc::new(routing));

        let resolution = resolver.resolve(&store, 1, SUPPLIER).await?;

        assert_eq!(resolution.facility.id, 2);
        assert_eq!(resolution.distance_km, 9.0);
        assert_eq!(
            resolution.method,
            DistanceMethod::RoutingApi {
                provider: "scripted".into()
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_fallback() -> Result<(), CalculationError> {
        let store = TestStore {
            facilities: vec![facility(1, 43.60, 39.73)],
            ..TestStore::default()
        };
        let routing = ScriptedRouting {
            delay: Some(Duration::from_secs(5)),
            ..ScriptedRouting::default()
        }
        .answer(Coordinate::new(43.60, 39.73), Ok(1.0));
        let resolver =
            FacilityResolver::new(Arc::new(routing)).with_timeout(Duration::from_millis(20));

        let resolution = resolver.resolve(&store, 1, SUPPLIER).await?;

        assert_eq!(resolution.method, DistanceMethod::FallbackCoefficient);
        assert!((resolution.distance_km - resolution.straight_line_km * 1.4).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_identical_candidates_break_by_id() -> Result<(), CalculationError> {
        let store = TestStore {
            facilities: vec![facility(8, 43.60, 39.73), facility(7, 43.60, 39.73)],
            ..TestStore::default()
        };
        let resolver = FacilityResolver::new(Arc::new(ScriptedRouting::default()));

        let resolution = resolver.resolve(&store, 1, SUPPLIER).await?;
        assert_eq!(resolution.facility.id, 7);
        Ok(())
    }

    #[tokio::test]
    async fn test_equal_road_distance_prefers_shorter_straight_line() -> Result<(), CalculationError>
    {
        let store = TestStore {
            facilities: vec![facility(2, 43.55, 39.80), facility(9, 43.60, 39.73)],
            ..TestStore::default()
        };
        let routing = ScriptedRouting::default()
            .answer(Coordinate::new(43.55, 39.80), Ok(12.0))
            .answer(Coordinate::new(43.60, 39.73), Ok(12.0));
        let resolver = FacilityResolver::new(Arc::new(routing));

        let resolution = resolver.resolve(&store, 1, SUPPLIER).await?;

        assert_eq!(resolution.facility.id, 9);
        assert_eq!(resolution.distance_km, 12.0);
        assert!(resolution.straight_line_km < haversine_km(SUPPLIER, Coordinate::new(43.55, 39.80)));
        Ok(())
    }

    #[tokio::test]
    async fn test_no_active_facility() {
        let mut store = five_facilities();
        for facility in &mut store.facilities {
            facility.is_active = false;
        }
        let resolver = FacilityResolver::new(Arc::new(ScriptedRouting::default()));

        assert_eq!(
            resolver.resolve(&store, 1, SUPPLIER).await,
            Err(CalculationError::NoActiveFacility(1))
        );
        assert_eq!(
            resolver.resolve(&five_facilities(), 2, SUPPLIER).await,
            Err(CalculationError::NoActiveFacility(2))
        );
    }

    #[tokio::test]
    async fn test_negative_road_distance_is_rejected() -> Result<(), CalculationError> {
        let store = TestStore {
            facilities: vec![facility(1, 43.60, 39.73)],
            ..TestStore::default()
        };
        let routing = ScriptedRouting::default().answer(Coordinate::new(43.60, 39.73), Ok(-3.0));
        let resolver = FacilityResolver::new(Arc::new(routing));

        let resolution = resolver.resolve(&store, 1, SUPPLIER).await?;
        assert_eq!(resolution.method, DistanceMethod::FallbackCoefficient);
        Ok(())
    }
}
