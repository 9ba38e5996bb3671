use std::str::FromStr;

use geo_types::{Geometry, Polygon};
use geojson::GeoJson;
use tracing::{info, warn};
use wkt::Wkt;

use super::store::StoreError;
use crate::domain::entities::{RegionId, Sector, SectorId};

fn geometry_error(error: impl ToString) -> StoreError {
    StoreError::Geometry(error.to_string())
}

/// Parses a sector boundary given as WKT or GeoJSON text.
///
/// Text starting with `{` is GeoJSON (a geometry or a single Feature); anything else is WKT.
/// A MultiPolygon with exactly one member is accepted as that polygon.
pub fn parse_boundary(s: &str) -> Result<Polygon<f64>, StoreError> {
    let text = s.trim();
    let geometry: Geometry<f64> = if text.starts_with('{') {
        let geometry = match text.parse::<GeoJson>().map_err(geometry_error)? {
            GeoJson::Geometry(geometry) => geometry,
            GeoJson::Feature(feature) => feature
                .geometry
                .ok_or_else(|| geometry_error("boundary feature has no geometry"))?,
            GeoJson::FeatureCollection(_) => {
                return Err(geometry_error(
                    "a boundary is one polygon; import collections with import_sectors",
                ))
            }
        };
        Geometry::try_from(geometry).map_err(geometry_error)?
    } else {
        Wkt::<f64>::from_str(text)
            .map_err(geometry_error)?
            .try_into()
            .map_err(|_| geometry_error("WKT text is not a supported geometry"))?
    };
    into_polygon(geometry)
}

fn into_polygon(geometry: Geometry<f64>) -> Result<Polygon<f64>, StoreError> {
    match geometry {
        Geometry::Polygon(polygon) => Ok(polygon),
        Geometry::MultiPolygon(mut multi) if multi.0.len() == 1 => Ok(multi.0.remove(0)),
        other => Err(geometry_error(format!(
            "expected a polygon boundary, got {}",
            geometry_kind(&other)
        ))),
    }
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Reads every polygon feature of a GeoJSON FeatureCollection as a sector of `region_id`.
///
/// Features without polygon geometry are skipped. Ids are assigned from `first_id` upward
/// in feature order; the `name` property becomes the sector name.
pub fn import_sectors(
    geojson: &str,
    region_id: RegionId,
    first_id: SectorId,
) -> Result<Vec<Sector>, StoreError> {
    let GeoJson::FeatureCollection(collection) =
        geojson.parse::<GeoJson>().map_err(geometry_error)?
    else {
        return Err(geometry_error("expected a FeatureCollection of sectors"));
    };

    let total = collection.features.len();
    let mut sectors = Vec::with_capacity(total);

    for (index, feature) in collection.features.into_iter().enumerate() {
        let name = feature
            .properties
            .as_ref()
            .and_then(|props| props.get("name"))
            .and_then(|value| value.as_str())
            .map(str::to_string);

        let Some(geometry) = feature.geometry else {
            warn!(feature = index + 1, "skipping feature without geometry");
            continue;
        };
        let polygon = match Geometry::try_from(geometry) {
            Ok(Geometry::Polygon(polygon)) => polygon,
            Ok(other) => {
                warn!(
                    feature = index + 1,
                    kind = geometry_kind(&other),
                    "skipping non-polygon feature"
                );
                continue;
            }
            Err(error) => {
                warn!(feature = index + 1, %error, "skipping unreadable feature");
                continue;
            }
        };

        sectors.push(Sector {
            id: first_id + sectors.len() as SectorId,
            region_id,
            name,
            boundary: polygon,
        });
    }

    info!(region_id, imported = sectors.len(), total, "imported sectors");
    Ok(sectors)
}

#[cfg(test)]
mod tests {
    use geo::Contains;
    use geo_types::point;

    use super::*;

    #[test]
    fn test_parse_wkt_polygon() -> Result<(), StoreError> {
        let polygon = parse_boundary("POLYGON((39.7 43.5, 39.8 43.5, 39.8 43.6, 39.7 43.6, 39.7 43.5))")?;
        assert_eq!(polygon.exterior().0.len(), 5);
        assert!(polygon.contains(&point! { x: 39.75, y: 43.55 }));
        Ok(())
    }

    #[test]
    fn test_parse_geojson_polygon() -> Result<(), StoreError> {
        let json = r#"{"type":"Polygon","coordinates":[[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,1.0],[0.0,0.0]]]}"#;
        let polygon = parse_boundary(json)?;
        assert!(polygon.contains(&point! { x: 0.5, y: 0.5 }));
        Ok(())
    }

    #[test]
    fn test_rejects_non_polygon_boundary() {
        assert!(matches!(
            parse_boundary("POINT(39.7 43.5)"),
            Err(StoreError::Geometry(msg)) if msg.contains("Point")
        ));
        assert!(parse_boundary("not geometry").is_err());
    }

    #[test]
    fn test_import_skips_non_polygons() -> Result<(), StoreError> {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type":"Feature","properties":{"name":"Center"},
                 "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
                {"type":"Feature","properties":{},
                 "geometry":{"type":"Point","coordinates":[0.5,0.5]}},
                {"type":"Feature","properties":null,
                 "geometry":{"type":"Polygon","coordinates":[[[1,0],[2,0],[2,1],[1,1],[1,0]]]}}
            ]
        }"#;

        let sectors = import_sectors(json, 7, 100)?;
        assert_eq!(sectors.len(), 2);
        assert_eq!(sectors[0].id, 100);
        assert_eq!(sectors[0].name.as_deref(), Some("Center"));
        assert_eq!(sectors[1].id, 101);
        assert_eq!(sectors[1].name, None);
        assert!(sectors.iter().all(|s| s.region_id == 7));
        Ok(())
    }

    #[test]
    fn test_import_requires_feature_collection() {
        let json = r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#;
        assert!(import_sectors(json, 1, 1).is_err());
    }
}
