use std::collections::{BTreeSet, HashSet};

use geo::Contains;
use serde::Serialize;
use tracing::info;

use super::entities::{Coordinate, PointId, RegionId, Sector, SectorId};
use super::sources::SectorStore;

/// Delivery footprint of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PointAggregate {
    pub points_used: u32,
    /// Only known when concrete point ids were supplied.
    pub points_ignored: Option<u32>,
    pub sectors_count: u32,
}

/// Sectors whose interior holds the coordinate. Points on an edge or vertex are outside.
pub fn containing_sectors<'a>(
    coordinate: Coordinate,
    sectors: &'a [&'a Sector],
) -> impl Iterator<Item = SectorId> + 'a {
    let point = coordinate.to_point();
    sectors
        .iter()
        .filter(move |sector| sector.boundary.contains(&point))
        .map(|sector| sector.id)
}

/// Counts above `u32::MAX` are capped.
fn count_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Counts the requested points that are active and inside at least one sector of the region.
///
/// Duplicate ids count once. Unknown or inactive ids end up in `points_ignored`.
pub fn aggregate_points<S>(store: &S, region_id: RegionId, point_ids: &[PointId]) -> PointAggregate
where
    S: SectorStore + ?Sized,
{
    let requested: HashSet<PointId> = point_ids.iter().copied().collect();
    let ids: Vec<PointId> = requested.iter().copied().collect();
    let sectors = store.sectors(region_id);

    let mut used = 0_u32;
    let mut covered: BTreeSet<SectorId> = BTreeSet::new();

    for point in store.delivery_points(&ids) {
        if !point.is_active || !requested.contains(&point.id) {
            continue;
        }
        let mut inside = false;
        for sector_id in containing_sectors(point.coordinate, &sectors) {
            inside = true;
            covered.insert(sector_id);
        }
        if inside {
            used += 1;
        }
    }

    let ignored = count_u32(requested.len()).saturating_sub(used);

    info!(
        region_id,
        requested = requested.len(),
        used,
        ignored,
        sectors = covered.len(),
        "aggregated delivery points"
    );

    PointAggregate {
        points_used: used,
        points_ignored: Some(ignored),
        sectors_count: count_u32(covered.len()),
    }
}

/// Takes caller-supplied counts verbatim; sectors fall back to the region total.
pub fn estimate_points<S>(
    store: &S,
    region_id: RegionId,
    num_points: u32,
    num_sectors: Option<u32>,
) -> PointAggregate
where
    S: SectorStore + ?Sized,
{
    let sectors_count = num_sectors.unwrap_or_else(|| {
        let total = count_u32(store.sector_count(region_id));
        info!(region_id, total, "using every sector of the region");
        total
    });

    PointAggregate {
        points_used: num_points,
        points_ignored: None,
        sectors_count,
    }
}
