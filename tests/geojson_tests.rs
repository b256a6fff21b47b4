mod common;

use common::*;
use mapsketch::{
    constants::{EXPORT_FILE_NAME, GEOJSON_MIME},
    Command, DrawEvent, DrawnShape, LatLng, LatLngBounds, Notice, Outcome, SessionController,
    ShapeGeometry,
};
use serde_json::json;

/// Exporting and re-importing the drawn collection through real files
mod geojson_tests {
    use super::*;

    fn sample_shapes() -> Vec<ShapeGeometry> {
        let bounds = LatLngBounds::from_coords(34.86, 138.25, 34.88, 138.28);
        vec![
            ShapeGeometry::Marker(LatLng::new(34.8679, 138.2667)),
            ShapeGeometry::Polyline(vec![
                LatLng::new(34.86, 138.25),
                LatLng::new(34.87, 138.26),
                LatLng::new(34.875, 138.27),
            ]),
            ShapeGeometry::Polygon(vec![vec![
                LatLng::new(34.86, 138.25),
                LatLng::new(34.88, 138.25),
                LatLng::new(34.87, 138.28),
            ]]),
            ShapeGeometry::Rectangle(bounds),
            ShapeGeometry::Circle {
                center: LatLng::new(34.8679, 138.2667),
                radius: 250.0,
            },
        ]
    }

    fn draw_all(session: &mut SessionController, geometries: &[ShapeGeometry]) {
        for geometry in geometries {
            session
                .dispatch(Command::Draw(DrawEvent::Created(DrawnShape::new(
                    String::new(),
                    geometry.clone(),
                ))))
                .unwrap();
        }
    }

    fn export(session: &mut SessionController) -> mapsketch::ExportFile {
        match session.dispatch(Command::ExportShapes).unwrap() {
            Outcome::Exported(file) => file,
            other => panic!("expected an export, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_empty_export() {
        let mut session = controller_with(fujieda_geocoder());
        let file = export(&mut session);

        assert_eq!(file.file_name, EXPORT_FILE_NAME);
        assert_eq!(file.mime, GEOJSON_MIME);
        let value: serde_json::Value = serde_json::from_str(&file.contents).unwrap();
        assert_eq!(value, json!({"type": "FeatureCollection", "features": []}));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_export_import_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let geometries = sample_shapes();

        let mut source = controller_with(fujieda_geocoder());
        draw_all(&mut source, &geometries);
        let path = export(&mut source).write_into(dir.path()).unwrap();
        assert!(path.ends_with("drawn.geojson"));

        let mut target = controller_with(fujieda_geocoder());
        let outcome = target.dispatch(Command::ImportShapes(Some(path))).unwrap();
        assert!(matches!(outcome, Outcome::Pending(_)));
        assert!(target.wait_idle(IDLE_TIMEOUT));

        let imported: Vec<ShapeGeometry> = target
            .state()
            .shapes()
            .iter()
            .map(|shape| shape.geometry.clone())
            .collect();

        // rectangles come back as plain polygons
        let mut expected = geometries.clone();
        if let ShapeGeometry::Rectangle(bounds) = &geometries[3] {
            expected[3] = ShapeGeometry::Polygon(vec![ShapeGeometry::rectangle_ring(bounds)]);
        }
        assert_eq!(imported, expected);
        assert!(target
            .state()
            .shapes()
            .iter()
            .all(|shape| shape.properties.is_empty()));
        assert!(target.take_notices().is_empty());

        // the view now frames what was imported
        let center = target.state().map.center();
        assert!((center.lat - 34.87).abs() < 0.01);
        assert!((center.lng - 138.265).abs() < 0.01);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_import_appends_and_keeps_properties() {
        let dir = tempfile::tempdir().unwrap();
        let text = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": "藤枝駅", "lines": 1},
                    "geometry": {"type": "Point", "coordinates": [138.2519, 34.8573]}
                },
                {
                    "type": "Feature",
                    "properties": null,
                    "geometry": null
                }
            ]
        })
        .to_string();
        let path = write_file(dir.path(), "stations.geojson", text.as_bytes());

        let mut session = controller_with(fujieda_geocoder());
        draw_all(&mut session, &sample_shapes()[..1]);
        session.dispatch(Command::ImportShapes(Some(path))).unwrap();
        assert!(session.wait_idle(IDLE_TIMEOUT));

        let shapes = session.state().shapes();
        assert_eq!(shapes.len(), 2);
        assert_ne!(shapes[0].id, shapes[1].id);
        assert_eq!(
            shapes[1].geometry,
            ShapeGeometry::Marker(LatLng::new(34.8573, 138.2519))
        );
        assert_eq!(shapes[1].properties.get("name"), Some(&json!("藤枝駅")));
        assert_eq!(shapes[1].properties.get("lines"), Some(&json!(1)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_invalid_import_raises_one_notice() {
        let dir = tempfile::tempdir().unwrap();
        let broken = write_file(dir.path(), "broken.geojson", b"{\"type\": \"FeatureCollection\",");
        let mut session = controller_with(fujieda_geocoder());
        draw_all(&mut session, &sample_shapes()[..2]);
        let before = session.state().shapes().to_vec();
        let view = session.state().map.viewport.clone();

        session.dispatch(Command::ImportShapes(Some(broken))).unwrap();
        assert!(session.wait_idle(IDLE_TIMEOUT));

        assert_eq!(session.state().shapes(), before.as_slice());
        assert_eq!(session.state().map.viewport, view);
        assert_eq!(session.take_notices(), vec![Notice::ImportFailed]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_out_of_range_coordinates_reject_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let text = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {"type": "Point", "coordinates": [138.0, 34.0]}
                },
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {"type": "Point", "coordinates": [138.0, 134.0]}
                }
            ]
        })
        .to_string();
        let path = write_file(dir.path(), "bad.geojson", text.as_bytes());

        let mut session = controller_with(fujieda_geocoder());
        session.dispatch(Command::ImportShapes(Some(path))).unwrap();
        assert!(session.wait_idle(IDLE_TIMEOUT));

        assert!(session.state().shapes().is_empty());
        assert_eq!(session.take_notices(), vec![Notice::ImportFailed]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_missing_file_and_cancelled_picker() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = controller_with(fujieda_geocoder());

        assert_eq!(
            session.dispatch(Command::ImportShapes(None)).unwrap(),
            Outcome::Ignored
        );
        session
            .dispatch(Command::ImportShapes(Some(dir.path().join("nope.geojson"))))
            .unwrap();
        assert!(session.wait_idle(IDLE_TIMEOUT));

        assert!(session.state().shapes().is_empty());
        assert_eq!(session.take_notices(), vec![Notice::ImportFailed]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overlapping_imports_both_apply() {
        let dir = tempfile::tempdir().unwrap();
        let point = |lng: f64, lat: f64| {
            json!({"type": "Point", "coordinates": [lng, lat]}).to_string()
        };
        let a = write_file(dir.path(), "a.geojson", point(138.0, 34.0).as_bytes());
        let b = write_file(dir.path(), "b.geojson", point(138.5, 34.5).as_bytes());

        let mut session = controller_with(fujieda_geocoder());
        session.dispatch(Command::ImportShapes(Some(a))).unwrap();
        session.dispatch(Command::ImportShapes(Some(b))).unwrap();
        assert!(session.wait_idle(IDLE_TIMEOUT));

        assert_eq!(session.state().shapes().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_import_with_byte_order_mark() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = "\u{feff}".as_bytes().to_vec();
        bytes.extend_from_slice(
            json!({"type": "Point", "coordinates": [138.2667, 34.8679]})
                .to_string()
                .as_bytes(),
        );
        let path = write_file(dir.path(), "bom.geojson", &bytes);

        let mut session = controller_with(fujieda_geocoder());
        session.dispatch(Command::ImportShapes(Some(path))).unwrap();
        assert!(session.wait_idle(IDLE_TIMEOUT));

        let shapes = session.state().shapes();
        assert_eq!(shapes.len(), 1);
        assert_eq!(
            shapes[0].geometry,
            ShapeGeometry::Marker(LatLng::new(34.8679, 138.2667))
        );
        assert!(session.take_notices().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_import_top_level_feature_array() {
        let dir = tempfile::tempdir().unwrap();
        let text = json!([
            {
                "type": "Feature",
                "properties": {"name": "藤枝市役所"},
                "geometry": {"type": "Point", "coordinates": [138.2667, 34.8679]}
            },
            {"type": "LineString", "coordinates": [[138.25, 34.86], [138.26, 34.87]]}
        ])
        .to_string();
        let path = write_file(dir.path(), "array.geojson", text.as_bytes());

        let mut session = controller_with(fujieda_geocoder());
        session.dispatch(Command::ImportShapes(Some(path))).unwrap();
        assert!(session.wait_idle(IDLE_TIMEOUT));

        let shapes = session.state().shapes();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].properties.get("name"), Some(&json!("藤枝市役所")));
        assert!(matches!(shapes[1].geometry, ShapeGeometry::Polyline(_)));
        assert!(session.take_notices().is_empty());
    }
}
