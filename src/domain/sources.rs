//! Read-only collaborators the engine consults during one calculation.
//!
//! Implementations hand out a consistent snapshot; the engine never writes back.

use super::entities::{DeliveryPoint, Facility, PointId, RegionId, RegionTariff, Sector};

pub trait FacilityDirectory {
    /// Active distribution centers of the region.
    fn active_facilities(&self, region_id: RegionId) -> Vec<&Facility>;
}

pub trait TariffLookup {
    fn tariff(&self, region_id: RegionId) -> Option<&RegionTariff>;
}

pub trait SectorStore {
    /// Points matching the ids. Unknown ids are simply absent from the result.
    fn delivery_points(&self, ids: &[PointId]) -> Vec<&DeliveryPoint>;

    fn sectors(&self, region_id: RegionId) -> Vec<&Sector>;

    fn sector_count(&self, region_id: RegionId) -> usize {
        self.sectors(region_id).len()
    }
}

/// Everything a calculation reads, bundled for convenience.
pub trait DataSource: FacilityDirectory + TariffLookup + SectorStore + Sync {}

impl<T> DataSource for T where T: FacilityDirectory + TariffLookup + SectorStore + Sync {}
