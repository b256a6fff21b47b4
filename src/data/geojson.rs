//! Shape collection ⇄ GeoJSON.
//!
//! Export mirrors what Leaflet's `toGeoJSON()` produces for a feature group:
//! a `FeatureCollection` with one feature per shape. Circles have no GeoJSON
//! geometry of their own and travel as a `Point` with a `radius` property in
//! metres; rectangles become closed polygons.

use crate::{
    core::{
        constants::{EXPORT_FILE_NAME, GEOJSON_MIME},
        geo::{LatLng, LatLngBounds},
    },
    layers::vector::{shapes_bounds, DrawnShape, ShapeGeometry},
    MapError, Result,
};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use std::path::{Path, PathBuf};

/// Property carrying a circle's radius (metres) on a `Point` feature
pub const RADIUS_PROPERTY: &str = "radius";

/// A serialized file ready to hand to the user
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime: String,
    pub contents: String,
}

impl ExportFile {
    /// Writes the file into `dir`, returning the full path
    pub fn write_into(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        std::fs::write(&path, self.contents.as_bytes())?;
        log::info!("exported {} bytes to {}", self.contents.len(), path.display());
        Ok(path)
    }
}

fn position(p: &LatLng) -> Vec<f64> {
    vec![p.lng, p.lat]
}

fn closed_ring(ring: &[LatLng]) -> Vec<Vec<f64>> {
    let mut coords: Vec<Vec<f64>> = ring.iter().map(position).collect();
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            coords.push(position(first));
        }
    }
    coords
}

fn shape_to_feature(shape: &DrawnShape) -> Feature {
    let mut properties = shape.properties.clone();
    let value = match &shape.geometry {
        ShapeGeometry::Marker(p) => Value::Point(position(p)),
        ShapeGeometry::Polyline(points) => Value::LineString(points.iter().map(position).collect()),
        ShapeGeometry::Polygon(rings) => {
            Value::Polygon(rings.iter().map(|ring| closed_ring(ring)).collect())
        }
        ShapeGeometry::Rectangle(bounds) => {
            Value::Polygon(vec![closed_ring(&ShapeGeometry::rectangle_ring(bounds))])
        }
        ShapeGeometry::Circle { center, radius } => {
            properties.insert(RADIUS_PROPERTY.to_string(), serde_json::json!(radius));
            Value::Point(position(center))
        }
    };

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// One feature per shape, in collection order
pub fn to_feature_collection<'a, I>(shapes: I) -> FeatureCollection
where
    I: IntoIterator<Item = &'a DrawnShape>,
{
    FeatureCollection {
        bbox: None,
        features: shapes.into_iter().map(shape_to_feature).collect(),
        foreign_members: None,
    }
}

/// Pretty-printed `drawn.geojson` for the given shapes
pub fn export_shapes<'a, I>(shapes: I) -> Result<ExportFile>
where
    I: IntoIterator<Item = &'a DrawnShape>,
{
    let collection = to_feature_collection(shapes);
    let contents = serde_json::to_string_pretty(&collection)?;
    Ok(ExportFile {
        file_name: EXPORT_FILE_NAME.to_string(),
        mime: GEOJSON_MIME.to_string(),
        contents,
    })
}

fn lat_lng(position: &[f64]) -> Result<LatLng> {
    match position {
        [lng, lat, ..] => {
            let p = LatLng::new(*lat, *lng);
            if p.is_valid() {
                Ok(p)
            } else {
                Err(MapError::InvalidCoordinates(format!("{:?}", position)))
            }
        }
        _ => Err(MapError::InvalidCoordinates(format!(
            "position needs two values, got {:?}",
            position
        ))),
    }
}

fn line(positions: &[Vec<f64>]) -> Result<Vec<LatLng>> {
    positions.iter().map(|p| lat_lng(p)).collect()
}

/// Ring without its closing vertex
fn open_ring(positions: &[Vec<f64>]) -> Result<Vec<LatLng>> {
    let mut ring = line(positions)?;
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    Ok(ring)
}

fn radius_of(properties: &JsonObject) -> Option<f64> {
    properties
        .get(RADIUS_PROPERTY)
        .and_then(|v| v.as_f64())
        .filter(|r| r.is_finite() && *r > 0.0)
}

fn push(out: &mut Vec<DrawnShape>, geometry: ShapeGeometry, properties: JsonObject) {
    out.push(DrawnShape::new(String::new(), geometry).with_properties(properties));
}

fn push_geometry(
    value: &Value,
    properties: &JsonObject,
    out: &mut Vec<DrawnShape>,
) -> Result<()> {
    match value {
        Value::Point(p) => {
            let center = lat_lng(p)?;
            match radius_of(properties) {
                Some(radius) => {
                    let mut properties = properties.clone();
                    properties.remove(RADIUS_PROPERTY);
                    push(out, ShapeGeometry::Circle { center, radius }, properties);
                }
                None => push(out, ShapeGeometry::Marker(center), properties.clone()),
            }
        }
        Value::MultiPoint(points) => {
            for p in points {
                push(out, ShapeGeometry::Marker(lat_lng(p)?), properties.clone());
            }
        }
        Value::LineString(positions) => {
            push(out, ShapeGeometry::Polyline(line(positions)?), properties.clone());
        }
        Value::MultiLineString(lines) => {
            for positions in lines {
                push(out, ShapeGeometry::Polyline(line(positions)?), properties.clone());
            }
        }
        Value::Polygon(rings) => {
            let rings = rings
                .iter()
                .map(|r| open_ring(r))
                .collect::<Result<Vec<_>>>()?;
            push(out, ShapeGeometry::Polygon(rings), properties.clone());
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                let rings = rings
                    .iter()
                    .map(|r| open_ring(r))
                    .collect::<Result<Vec<_>>>()?;
                push(out, ShapeGeometry::Polygon(rings), properties.clone());
            }
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                push_geometry(&geometry.value, properties, out)?;
            }
        }
    }
    Ok(())
}

fn push_feature(feature: &Feature, out: &mut Vec<DrawnShape>) -> Result<()> {
    let Some(geometry) = &feature.geometry else {
        log::debug!("skipping feature without geometry");
        return Ok(());
    };
    let properties = feature.properties.clone().unwrap_or_default();
    push_geometry(&geometry.value, &properties, out)
}

fn push_geojson(geojson: &GeoJson, out: &mut Vec<DrawnShape>) -> Result<()> {
    match geojson {
        GeoJson::Geometry(geometry) => push_geometry(&geometry.value, &JsonObject::new(), out),
        GeoJson::Feature(feature) => push_feature(feature, out),
        GeoJson::FeatureCollection(collection) => {
            for feature in &collection.features {
                push_feature(feature, out)?;
            }
            Ok(())
        }
    }
}

/// Parses GeoJSON text into shapes with empty ids.
///
/// Accepts a single GeoJSON object or a top-level array of them, as
/// `L.geoJSON` does. A leading byte-order mark is skipped. Any malformed
/// document or coordinate fails the whole parse, so callers never see a
/// partial result.
pub fn parse_shapes(text: &str) -> Result<Vec<DrawnShape>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let value: serde_json::Value = serde_json::from_str(text)?;
    let mut shapes = Vec::new();
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                push_geojson(&GeoJson::from_json_value(item)?, &mut shapes)?;
            }
        }
        other => push_geojson(&GeoJson::from_json_value(other)?, &mut shapes)?,
    }
    Ok(shapes)
}

/// Parses file contents as UTF-8, replacing invalid sequences rather than
/// rejecting the file
pub fn parse_shapes_bytes(bytes: &[u8]) -> Result<Vec<DrawnShape>> {
    let text = String::from_utf8_lossy(bytes);
    if let std::borrow::Cow::Owned(_) = text {
        log::debug!("import contains invalid UTF-8; decoded lossily");
    }
    parse_shapes(&text)
}

/// Bounds of a batch of imported shapes
pub fn import_bounds(shapes: &[DrawnShape]) -> Option<LatLngBounds> {
    shapes_bounds(shapes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::vector::ShapeKind;

    fn value_of(file: &ExportFile) -> serde_json::Value {
        serde_json::from_str(&file.contents).unwrap()
    }

    #[test]
    fn test_empty_export() {
        let file = export_shapes(std::iter::empty::<&DrawnShape>()).unwrap();
        assert_eq!(file.file_name, "drawn.geojson");
        assert_eq!(file.mime, "application/geo+json");
        assert_eq!(
            value_of(&file),
            serde_json::json!({"type": "FeatureCollection", "features": []})
        );
        assert!(file.contents.contains("\n  \""));
    }

    #[test]
    fn test_circle_travels_as_point_with_radius() {
        let circle = DrawnShape::new(
            "c".into(),
            ShapeGeometry::Circle {
                center: LatLng::new(34.87, 138.27),
                radius: 250.0,
            },
        );
        let file = export_shapes([&circle]).unwrap();
        let json = value_of(&file);
        let feature = &json["features"][0];
        assert_eq!(feature["geometry"]["type"], "Point");
        assert_eq!(feature["geometry"]["coordinates"][0], 138.27);
        assert_eq!(feature["properties"]["radius"], 250.0);

        let shapes = parse_shapes(&file.contents).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].geometry, circle.geometry);
        assert!(shapes[0].properties.is_empty());
    }

    #[test]
    fn test_rectangle_exports_closed_polygon() {
        let rect = DrawnShape::new(
            "r".into(),
            ShapeGeometry::Rectangle(LatLngBounds::from_coords(1.0, 2.0, 3.0, 4.0)),
        );
        let json = value_of(&export_shapes([&rect]).unwrap());
        let ring = json["features"][0]["geometry"]["coordinates"][0]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(ring[0], serde_json::json!([2.0, 1.0]));
    }

    #[test]
    fn test_import_flattens_and_keeps_properties() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"name": "pts"},
                 "geometry": {"type": "MultiPoint", "coordinates": [[138.0, 34.0], [139.0, 35.0]]}},
                {"type": "Feature", "properties": null, "geometry": null},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "GeometryCollection", "geometries": [
                    {"type": "LineString", "coordinates": [[0, 0], [1, 1]]},
                    {"type": "Polygon", "coordinates": [[[0, 0], [0, 1], [1, 1], [0, 0]]]}
                 ]}}
            ]
        }"#;
        let shapes = parse_shapes(text).unwrap();
        assert_eq!(shapes.len(), 4);
        assert_eq!(shapes[0].properties["name"], "pts");
        assert_eq!(shapes[1].geometry, ShapeGeometry::Marker(LatLng::new(35.0, 139.0)));
        match &shapes[3].geometry {
            ShapeGeometry::Polygon(rings) => assert_eq!(rings[0].len(), 3),
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_bare_geometry_import() {
        let shapes = parse_shapes(r#"{"type": "Point", "coordinates": [138.2667, 34.8679]}"#).unwrap();
        assert_eq!(
            shapes[0].geometry,
            ShapeGeometry::Marker(LatLng::new(34.8679, 138.2667))
        );
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        assert!(parse_shapes("not json").is_err());
        assert!(parse_shapes(r#"{"type": "Point", "coordinates": [500.0, 0.0]}"#).is_err());
        assert!(parse_shapes(r#"{"foo": 1}"#).is_err());
        assert!(parse_shapes(r#"[{"type": "Point", "coordinates": [138.0, 34.0]}, 7]"#).is_err());
    }

    #[test]
    fn test_leading_bom_is_skipped() {
        let shapes =
            parse_shapes("\u{feff}{\"type\": \"Point\", \"coordinates\": [138.2667, 34.8679]}").unwrap();
        assert_eq!(
            shapes,
            vec![DrawnShape::new(
                String::new(),
                ShapeGeometry::Marker(LatLng::new(34.8679, 138.2667))
            )]
        );
    }

    #[test]
    fn test_invalid_utf8_decodes_lossily() {
        let mut bytes = br#"{"type": "Feature", "properties": {"name": "x"#.to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(br#""}, "geometry": {"type": "Point", "coordinates": [138.0, 34.0]}}"#);

        let shapes = parse_shapes_bytes(&bytes).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].properties.get("name"), Some(&serde_json::json!("x\u{fffd}")));
    }

    #[test]
    fn test_top_level_array_is_flattened() {
        let text = r#"[
            {"type": "Feature", "properties": {"name": "a"},
             "geometry": {"type": "Point", "coordinates": [138.0, 34.0]}},
            {"type": "LineString", "coordinates": [[138.0, 34.0], [138.1, 34.1]]},
            {"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": null,
                 "geometry": {"type": "Point", "coordinates": [138.2, 34.2]}}
            ]}
        ]"#;
        let shapes = parse_shapes(text).unwrap();
        let kinds: Vec<_> = shapes.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![ShapeKind::Marker, ShapeKind::Polyline, ShapeKind::Marker]);
        assert_eq!(shapes[0].properties.get("name"), Some(&serde_json::json!("a")));
    }

    #[test]
    fn test_write_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = export_shapes(std::iter::empty::<&DrawnShape>()).unwrap();
        let path = file.write_into(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "drawn.geojson");
        assert_eq!(std::fs::read_to_string(path).unwrap(), file.contents);
    }
}
