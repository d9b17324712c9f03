//! GeoJSON reader for feature sets.
//!
//! Parsing goes through the `geojson` crate and geometries are converted
//! with its `geo-types` support. A document may be a `FeatureCollection`, a
//! single `Feature` or a bare geometry. Coordinates are taken as-is; no
//! reprojection is done, so the file must already be in the grid CRS.

use geo_types::Geometry;
use geojson::feature::Id;
use geojson::{GeoJson, Value};
use std::path::Path;

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureSet};

/// Read GeoJSON features from a file
pub fn read_feature_set<P: AsRef<Path>>(path: P) -> Result<FeatureSet> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_feature_set(&text)
}

/// Parse a GeoJSON `FeatureCollection`, `Feature` or geometry
pub fn parse_feature_set(text: &str) -> Result<FeatureSet> {
    let doc: GeoJson = text.parse().map_err(parse_error)?;

    match doc {
        GeoJson::FeatureCollection(fc) => fc.features.into_iter().map(convert_feature).collect(),
        GeoJson::Feature(feature) => std::iter::once(convert_feature(feature)).collect(),
        GeoJson::Geometry(geometry) => {
            let feature = Feature::new(convert_geometry(geometry)?);
            Ok(std::iter::once(feature).collect())
        }
    }
}

fn parse_error(e: impl std::fmt::Display) -> Error {
    Error::Other(format!("GeoJSON parse error: {}", e))
}

fn convert_feature(feature: geojson::Feature) -> Result<Feature> {
    let geometry = feature.geometry.map(convert_geometry).transpose()?;

    let properties = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| convert_value(v).map(|v| (k, v)))
        .collect();

    let id = feature.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

fn convert_geometry(geometry: geojson::Geometry) -> Result<Geometry<f64>> {
    check_positions(&geometry.value)?;
    Geometry::try_from(geometry).map_err(parse_error)
}

/// Every position needs two finite ordinates; a third (elevation) is ignored.
fn check_positions(value: &Value) -> Result<()> {
    let position = |p: &Vec<f64>| match p.as_slice() {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(()),
        _ => Err(Error::Other(format!(
            "GeoJSON position must hold two finite numbers, got {:?}",
            p
        ))),
    };

    match value {
        Value::Point(p) => position(p),
        Value::MultiPoint(ps) | Value::LineString(ps) => ps.iter().try_for_each(position),
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().try_for_each(position)
        }
        Value::MultiPolygon(polys) => polys.iter().flatten().flatten().try_for_each(position),
        Value::GeometryCollection(members) => {
            members.iter().try_for_each(|g| check_positions(&g.value))
        }
    }
}

fn convert_value(value: serde_json::Value) -> Option<AttributeValue> {
    use serde_json::Value;
    match value {
        Value::Null => Some(AttributeValue::Null),
        Value::Bool(b) => Some(AttributeValue::Bool(b)),
        Value::Number(n) => n
            .as_i64()
            .map(AttributeValue::Int)
            .or_else(|| n.as_f64().map(AttributeValue::Float)),
        Value::String(s) => Some(AttributeValue::String(s)),
        // Nested values are not needed by any consumer
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Coord;

    const RIVERS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 7,
                "properties": {"name": "Irwell", "order": 4, "flow": 1.5, "tags": ["a"]},
                "geometry": {"type": "LineString", "coordinates": [[0, 0], [100, 0, 12.5]]}
            },
            {
                "type": "Feature",
                "properties": null,
                "geometry": {"type": "MultiLineString", "coordinates": [[[0, 10], [0, 20]]]}
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn test_parse_collection() {
        let set = parse_feature_set(RIVERS).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.geometries().count(), 2);

        let first = &set.features[0];
        assert_eq!(first.id.as_deref(), Some("7"));
        assert_eq!(
            first.get_property("name"),
            Some(&AttributeValue::String("Irwell".into()))
        );
        assert_eq!(first.get_property("order"), Some(&AttributeValue::Int(4)));
        assert_eq!(first.get_property("flow"), Some(&AttributeValue::Float(1.5)));
        assert!(first.get_property("tags").is_none());

        match &first.geometry {
            Some(Geometry::LineString(ls)) => assert_eq!(ls.0[1], Coord { x: 100.0, y: 0.0 }),
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_geometry_collection_feature() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"name": "Croal"},
                "geometry": {
                    "type": "GeometryCollection",
                    "geometries": [
                        {"type": "LineString", "coordinates": [[0, 0], [50, 0]]},
                        {"type": "Point", "coordinates": [70, 5]}
                    ]
                }
            }]
        }"#;
        let set = parse_feature_set(text).unwrap();
        assert_eq!(set.len(), 1);

        match &set.features[0].geometry {
            Some(Geometry::GeometryCollection(gc)) => {
                assert_eq!(gc.0.len(), 2);
                assert!(matches!(gc.0[0], Geometry::LineString(_)));
            }
            other => panic!("unexpected geometry {:?}", other),
        }
        let b = set.features[0].bounds().unwrap();
        assert_eq!((b.min_x, b.max_x, b.max_y), (0.0, 70.0, 5.0));
    }

    #[test]
    fn test_single_feature() {
        let text = r#"{"type": "Feature", "id": "a1", "properties": {},
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}"#;
        let set = parse_feature_set(text).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.features[0].id.as_deref(), Some("a1"));
    }

    #[test]
    fn test_bare_geometry() {
        let text = r#"{"type": "LineString", "coordinates": [[0, 0], [1, 1]]}"#;
        let set = parse_feature_set(text).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.features[0].properties.is_empty());
    }

    #[test]
    fn test_bad_position() {
        let text = r#"{"type": "Feature", "properties": {},
            "geometry": {"type": "Point", "coordinates": [1.0]}}"#;
        assert!(parse_feature_set(text).is_err());

        let nested = r#"{"type": "GeometryCollection", "geometries": [
            {"type": "LineString", "coordinates": [[0, 0], [1]]}]}"#;
        assert!(parse_feature_set(nested).is_err());
    }

    #[test]
    fn test_not_geojson() {
        assert!(parse_feature_set("{\"type\": \"Topology\"}").is_err());
    }
}
