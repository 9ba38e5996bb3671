use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;
use tracing::{info, warn};

use crate::domain::resolver::{DEFAULT_FALLBACK_COEFFICIENT, DEFAULT_ROUTING_TIMEOUT};

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "Bananay";
const APP_NAME: &str = "DeliveryCalculator";

pub const DEFAULT_OPENROUTE_URL: &str = "https://api.openrouteservice.org/v2/directions/driving-car";
pub const DEFAULT_YANDEX_URL: &str = "https://api.routing.yandex.net/v2/route";
/// Upper bound for a single routing lookup.
pub const MAX_ROUTING_TIMEOUT_SECS: f64 = 600.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingProvider {
    #[default]
    OpenRoute,
    Yandex,
    /// Skip the network and always use the straight-line coefficient.
    Fallback,
}

impl FromStr for RoutingProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openroute" => Ok(Self::OpenRoute),
            "yandex" => Ok(Self::Yandex),
            "fallback" => Ok(Self::Fallback),
            other => Err(ConfigError::Invalid(format!(
                "unknown routing provider: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub api_url: String,
}

impl ProviderConfig {
    fn with_url(api_url: &str) -> Self {
        Self {
            api_key: None,
            api_url: api_url.to_string(),
        }
    }
}

/// Routing and fallback settings for the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub routing_provider: RoutingProvider,
    pub openroute: ProviderConfig,
    pub yandex: ProviderConfig,
    pub routing_timeout_secs: f64,
    pub fallback_coefficient: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            routing_provider: RoutingProvider::default(),
            openroute: ProviderConfig::with_url(DEFAULT_OPENROUTE_URL),
            yandex: ProviderConfig::with_url(DEFAULT_YANDEX_URL),
            routing_timeout_secs: DEFAULT_ROUTING_TIMEOUT.as_secs_f64(),
            fallback_coefficient: DEFAULT_FALLBACK_COEFFICIENT,
        }
    }
}

impl EngineConfig {
    /// Lookup timeout, clamped to the accepted range for configs that skipped `validate`.
    pub fn routing_timeout(&self) -> Duration {
        if self.routing_timeout_secs.is_nan() {
            return DEFAULT_ROUTING_TIMEOUT;
        }
        Duration::try_from_secs_f64(self.routing_timeout_secs.min(MAX_ROUTING_TIMEOUT_SECS))
            .unwrap_or(DEFAULT_ROUTING_TIMEOUT)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.routing_timeout_secs > 0.0
            && self.routing_timeout_secs <= MAX_ROUTING_TIMEOUT_SECS)
        {
            return Err(ConfigError::Invalid(format!(
                "routing_timeout_secs must be in (0, {MAX_ROUTING_TIMEOUT_SECS}], got {}",
                self.routing_timeout_secs
            )));
        }
        if !self.fallback_coefficient.is_finite() || self.fallback_coefficient < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "fallback_coefficient must be at least 1.0, got {}",
                self.fallback_coefficient
            )));
        }
        Ok(())
    }

    /// Applies environment overrides, reading variables through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("ROUTING_PROVIDER") {
            self.routing_provider = raw.parse().unwrap_or_else(|error| {
                warn!(%error, "falling back to straight-line distances");
                RoutingProvider::Fallback
            });
        }
        if let Some(key) = lookup("OPENROUTESERVICE_API_KEY") {
            self.openroute.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENROUTESERVICE_API_URL") {
            self.openroute.api_url = url;
        }
        if let Some(key) = lookup("YANDEX_API_KEY") {
            self.yandex.api_key = Some(key);
        }
        if let Some(url) = lookup("YANDEX_ROUTER_API_URL") {
            self.yandex.api_url = url;
        }
        if let Some(raw) = lookup("ROUTING_TIMEOUT_SECS") {
            self.routing_timeout_secs = parse_number("ROUTING_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("DISTANCE_FALLBACK_COEFFICIENT") {
            self.fallback_coefficient = parse_number("DISTANCE_FALLBACK_COEFFICIENT", &raw)?;
        }
        Ok(())
    }
}

fn parse_number(name: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name} is not a number: {raw}")))
}

/// Default location of the config file in the platform config directory.
pub fn config_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join("config.json"))
}

/// Reads the config file (defaults if absent), then environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.map(Path::to_path_buf).or_else(config_file);

    let mut config = match path {
        Some(path) if path.exists() => {
            let data = fs::read_to_string(&path)?;
            info!(path = %path.display(), "loaded engine config");
            serde_json::from_str(&data)?
        }
        _ => EngineConfig::default(),
    };

    config.apply_env(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

pub fn save_config(config: &EngineConfig, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(config_file)
        .ok_or(ConfigError::StorageUnavailable)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(&path, json)?;
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config directory unavailable")]
    StorageUnavailable,
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}
