//! In-memory reference data loaded from a JSON snapshot.

use std::{
    collections::{BTreeSet, HashMap},
    fs, io,
    path::Path,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::geometry::{import_sectors, parse_boundary};
use crate::domain::entities::{
    DeliveryPoint, Facility, PointId, RegionId, RegionTariff, Sector, SectorId,
};
use crate::domain::sources::{FacilityDirectory, SectorStore, TariffLookup};
use crate::error::CalculationError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid geometry: {0}")]
    Geometry(String),
    #[error("region {region_id} has an invalid tariff: {source}")]
    InvalidTariff {
        region_id: RegionId,
        source: CalculationError,
    },
}

/// Snapshot file layout.
#[derive(Debug, Default, Deserialize, Serialize)]
struct Snapshot {
    #[serde(default)]
    regions: Vec<RegionRecord>,
    #[serde(default)]
    facilities: Vec<Facility>,
    #[serde(default)]
    sectors: Vec<SectorRecord>,
    #[serde(default)]
    delivery_points: Vec<DeliveryPoint>,
}

#[derive(Debug, Deserialize, Serialize)]
struct RegionRecord {
    id: RegionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tariff: Option<RegionTariff>,
}

/// A sector whose boundary is WKT text, GeoJSON text or an inline GeoJSON object.
#[derive(Debug, Deserialize, Serialize)]
struct SectorRecord {
    id: SectorId,
    region_id: RegionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    boundary: Value,
}

impl SectorRecord {
    fn into_sector(self) -> Result<Sector, StoreError> {
        let boundary = match &self.boundary {
            Value::String(text) => parse_boundary(text)?,
            other => parse_boundary(&other.to_string())?,
        };
        Ok(Sector {
            id: self.id,
            region_id: self.region_id,
            name: self.name,
            boundary,
        })
    }

    /// Boundaries are written back as inline GeoJSON objects.
    fn from_sector(sector: &Sector) -> Result<Self, StoreError> {
        let geometry = geojson::Geometry::new(geojson::Value::from(&sector.boundary));
        Ok(Self {
            id: sector.id,
            region_id: sector.region_id,
            name: sector.name.clone(),
            boundary: serde_json::to_value(&geometry)?,
        })
    }
}

/// Facilities, tariffs, sectors and delivery points held in memory.
///
/// Tariffs are validated when the store is built, so a lookup never yields a broken tariff.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    region_names: HashMap<RegionId, String>,
    facilities: Vec<Facility>,
    tariffs: HashMap<RegionId, RegionTariff>,
    sectors: Vec<Sector>,
    points: HashMap<PointId, DeliveryPoint>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path)?;
        let store = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            facilities = store.facilities.len(),
            sectors = store.sectors.len(),
            points = store.points.len(),
            "loaded snapshot"
        );
        Ok(store)
    }

    pub fn from_json_str(content: &str) -> Result<Self, StoreError> {
        let snapshot: Snapshot = serde_json::from_str(content)?;
        let mut store = Self::new();

        for region in snapshot.regions {
            if let Some(name) = region.name {
                store.region_names.insert(region.id, name);
            }
            if let Some(tariff) = region.tariff {
                store.set_tariff(region.id, tariff)?;
            }
        }
        for facility in snapshot.facilities {
            store.add_facility(facility);
        }
        for record in snapshot.sectors {
            store.add_sector(record.into_sector()?);
        }
        for point in snapshot.delivery_points {
            store.add_point(point);
        }
        Ok(store)
    }

    pub fn set_tariff(
        &mut self,
        region_id: RegionId,
        tariff: RegionTariff,
    ) -> Result<(), StoreError> {
        tariff
            .validate()
            .map_err(|source| StoreError::InvalidTariff { region_id, source })?;
        self.tariffs.insert(region_id, tariff);
        Ok(())
    }

    pub fn add_facility(&mut self, facility: Facility) {
        self.facilities.push(facility);
    }

    pub fn add_sector(&mut self, sector: Sector) {
        self.sectors.push(sector);
    }

    pub fn add_point(&mut self, point: DeliveryPoint) {
        self.points.insert(point.id, point);
    }

    /// Adds every polygon of a GeoJSON FeatureCollection as a sector of the region.
    ///
    /// New ids continue after the highest sector id already held. Returns how many were added.
    pub fn import_sectors(
        &mut self,
        region_id: RegionId,
        geojson: &str,
    ) -> Result<usize, StoreError> {
        let first_id = self.sectors.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let imported = import_sectors(geojson, region_id, first_id)?;
        let count = imported.len();
        self.sectors.extend(imported);
        Ok(count)
    }

    /// Serializes the store in the same layout `from_json_str` reads.
    pub fn to_json_string(&self) -> Result<String, StoreError> {
        let region_ids: BTreeSet<RegionId> = self
            .region_names
            .keys()
            .chain(self.tariffs.keys())
            .copied()
            .collect();
        let regions = region_ids
            .into_iter()
            .map(|id| RegionRecord {
                id,
                name: self.region_names.get(&id).cloned(),
                tariff: self.tariffs.get(&id).cloned(),
            })
            .collect();

        let mut delivery_points: Vec<DeliveryPoint> = self.points.values().cloned().collect();
        delivery_points.sort_by_key(|p| p.id);

        let snapshot = Snapshot {
            regions,
            facilities: self.facilities.clone(),
            sectors: self
                .sectors
                .iter()
                .map(SectorRecord::from_sector)
                .collect::<Result<_, _>>()?,
            delivery_points,
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        fs::write(path, self.to_json_string()?)?;
        info!(
            path = %path.display(),
            sectors = self.sectors.len(),
            "saved snapshot"
        );
        Ok(())
    }

    pub fn region_name(&self, region_id: RegionId) -> Option<&str> {
        self.region_names.get(&region_id).map(String::as_str)
    }
}

impl FacilityDirectory for SnapshotStore {
    fn active_facilities(&self, region_id: RegionId) -> Vec<&Facility> {
        self.facilities
            .iter()
            .filter(|f| f.region_id == region_id && f.is_active)
            .collect()
    }
}

impl TariffLookup for SnapshotStore {
    fn tariff(&self, region_id: RegionId) -> Option<&RegionTariff> {
        self.tariffs.get(&region_id)
    }
}

impl SectorStore for SnapshotStore {
    fn delivery_points(&self, ids: &[PointId]) -> Vec<&DeliveryPoint> {
        ids.iter().filter_map(|id| self.points.get(id)).collect()
    }

    fn sectors(&self, region_id: RegionId) -> Vec<&Sector> {
        self.sectors
            .iter()
            .filter(|s| s.region_id == region_id)
            .collect()
    }
}
