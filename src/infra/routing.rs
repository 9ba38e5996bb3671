//! Thin asynchronous clients for road-routing APIs.
//!
//! - `OpenRouteServiceClient` and `YandexRouterClient` answer one distance per call.
//! - `FallbackOnly` never answers, so the resolver always uses the coefficient.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use crate::domain::calculator::DeliveryCalculator;
use crate::domain::entities::Coordinate;
use crate::domain::resolver::{FacilityResolver, RoutingClient};
use crate::error::RoutingError;
use crate::util::config::{
    EngineConfig, ProviderConfig, RoutingProvider, DEFAULT_OPENROUTE_URL, DEFAULT_YANDEX_URL,
};

const USER_AGENT: &str = "delivery-calculator/1.0.0";

/// Providers expect `lon,lat` order.
fn lon_lat(coordinate: Coordinate) -> String {
    format!("{},{}", coordinate.longitude, coordinate.latitude)
}

fn http_client() -> Result<Client, RoutingError> {
    Ok(Client::builder().user_agent(USER_AGENT).build()?)
}

async fn fetch_json<T>(http: &Client, url: Url) -> Result<T, RoutingError>
where
    T: DeserializeOwned,
{
    let response = http.get(url).send().await?.error_for_status()?;
    Ok(response.json().await?)
}

#[derive(Clone)]
pub struct OpenRouteServiceClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl OpenRouteServiceClient {
    pub fn new(api_key: Option<String>) -> Result<Self, RoutingError> {
        Self::with_base_url(DEFAULT_OPENROUTE_URL, api_key)
    }

    pub fn with_base_url(base: &str, api_key: Option<String>) -> Result<Self, RoutingError> {
        Ok(Self {
            http: http_client()?,
            base_url: Url::parse(base)?,
            api_key,
        })
    }
}

#[async_trait]
impl RoutingClient for OpenRouteServiceClient {
    fn name(&self) -> &str {
        "openroute_api"
    }

    async fn road_distance_km(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<f64, RoutingError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(RoutingError::MissingApiKey("OpenRouteService"))?;

        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("api_key", key)
            .append_pair("start", &lon_lat(from))
            .append_pair("end", &lon_lat(to));

        let response: OrsResponse = fetch_json(&self.http, url).await?;
        let km = response
            .distance_km()
            .ok_or_else(|| RoutingError::Api("unexpected OpenRouteService response".into()))?;
        debug!(km, "OpenRouteService route distance");
        Ok(km)
    }
}

#[derive(Clone)]
pub struct YandexRouterClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl YandexRouterClient {
    pub fn new(api_key: Option<String>) -> Result<Self, RoutingError> {
        Self::with_base_url(DEFAULT_YANDEX_URL, api_key)
    }

    pub fn with_base_url(base: &str, api_key: Option<String>) -> Result<Self, RoutingError> {
        Ok(Self {
            http: http_client()?,
            base_url: Url::parse(base)?,
            api_key,
        })
    }
}

#[async_trait]
impl RoutingClient for YandexRouterClient {
    fn name(&self) -> &str {
        "yandex_api"
    }

    async fn road_distance_km(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<f64, RoutingError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(RoutingError::MissingApiKey("Yandex"))?;

        let waypoints = format!("{}|{}", lon_lat(from), lon_lat(to));
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("apikey", key)
            .append_pair("waypoints", &waypoints)
            .append_pair("mode", "driving");

        let response: YandexResponse = fetch_json(&self.http, url).await?;
        let km = response
            .distance_km()
            .ok_or_else(|| RoutingError::Api("unexpected Yandex response".into()))?;
        debug!(km, "Yandex route distance");
        Ok(km)
    }
}

/// Always fails, leaving every candidate on the straight-line coefficient.
#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackOnly;

#[async_trait]
impl RoutingClient for FallbackOnly {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn road_distance_km(
        &self,
        _from: Coordinate,
        _to: Coordinate,
    ) -> Result<f64, RoutingError> {
        Err(RoutingError::Disabled)
    }
}

pub fn client_from_config(config: &EngineConfig) -> Result<Arc<dyn RoutingClient>, RoutingError> {
    fn key(provider: &ProviderConfig, label: &str) -> Option<String> {
        if provider.api_key.is_none() {
            warn!("{label} API key not configured, road distances will use the fallback");
        }
        provider.api_key.clone()
    }

    Ok(match config.routing_provider {
        RoutingProvider::OpenRoute => Arc::new(OpenRouteServiceClient::with_base_url(
            &config.openroute.api_url,
            key(&config.openroute, "OpenRouteService"),
        )?),
        RoutingProvider::Yandex => Arc::new(YandexRouterClient::with_base_url(
            &config.yandex.api_url,
            key(&config.yandex, "Yandex"),
        )?),
        RoutingProvider::Fallback => Arc::new(FallbackOnly),
    })
}

/// Calculator wired to the configured provider, timeout and coefficient.
pub fn calculator_from_config(config: &EngineConfig) -> Result<DeliveryCalculator, RoutingError> {
    let resolver = FacilityResolver::new(client_from_config(config)?)
        .with_timeout(config.routing_timeout())
        .with_fallback_coefficient(config.fallback_coefficient);
    Ok(DeliveryCalculator::new(resolver))
}

#[derive(Debug, Default, Deserialize)]
struct OrsResponse {
    #[serde(default)]
    features: Vec<OrsFeature>,
}

#[derive(Debug, Default, Deserialize)]
struct OrsFeature {
    #[serde(default)]
    properties: OrsProperties,
}

#[derive(Debug, Default, Deserialize)]
struct OrsProperties {
    #[serde(default)]
    summary: OrsSummary,
}

#[derive(Debug, Default, Deserialize)]
struct OrsSummary {
    /// Metres.
    #[serde(default)]
    distance: Option<f64>,
}

impl OrsResponse {
    fn distance_km(&self) -> Option<f64> {
        self.features
            .first()
            .and_then(|feature| feature.properties.summary.distance)
            .map(|metres| metres / 1000.0)
    }
}

#[derive(Debug, Default, Deserialize)]
struct YandexResponse {
    #[serde(default)]
    route: Option<YandexRoute>,
}

#[derive(Debug, Default, Deserialize)]
struct YandexRoute {
    /// Metres.
    #[serde(default)]
    distance: Option<f64>,
}

impl YandexResponse {
    fn distance_km(&self) -> Option<f64> {
        self.route
            .as_ref()
            .and_then(|route| route.distance)
            .map(|metres| metres / 1000.0)
    }
}
