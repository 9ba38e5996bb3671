//! Failure kinds surfaced by the calculation engine and its routing seam.

use thiserror::Error;

use crate::domain::entities::RegionId;

/// Everything that can stop a calculation.
///
/// Routing failures never show up here: the resolver recovers from them by
/// falling back to the inflated straight-line distance.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalculationError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("no active distribution center in region {0}")]
    NoActiveFacility(RegionId),
    #[error("pricing not configured for region {0}")]
    MissingTariff(RegionId),
    #[error("invalid tariff: {0}")]
    InvalidTariff(String),
    #[error("product does not fit in the standard box")]
    ProductTooLarge,
}

impl CalculationError {
    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub(crate) fn invalid_tariff(message: impl Into<String>) -> Self {
        Self::InvalidTariff(message.into())
    }
}

/// Failure of a single road-distance lookup.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0} API key not configured")]
    MissingApiKey(&'static str),
    #[error("api error: {0}")]
    Api(String),
    #[error("routing disabled, straight-line fallback only")]
    Disabled,
}
