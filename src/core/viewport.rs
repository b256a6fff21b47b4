use crate::core::constants::TILE_SIZE;
use crate::core::geo::{LatLng, LatLngBounds, Point, TileCoord, MAX_LATITUDE};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

const EARTH_RADIUS: f64 = 6378137.0;

/// Manages the current view of the map: center, zoom, and screen dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the viewport in pixels
    pub size: Point,
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        Self {
            center: center.clamped(),
            zoom: zoom.clamp(0.0, 19.0),
            size,
            min_zoom: 0.0,
            max_zoom: 19.0,
        }
    }

    /// Sets the center of the viewport, clamped to the projectable world
    pub fn set_center(&mut self, center: LatLng) {
        self.center = LatLng::new(
            center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            center.lng.clamp(-180.0, 180.0),
        );
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Sets center and zoom in one step
    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.set_center(center);
        self.set_zoom(zoom);
    }

    /// Sets the viewport size
    pub fn set_size(&mut self, size: Point) {
        self.size = size;
    }

    /// Sets the zoom limits
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    /// Gets the scale factor for the current zoom level
    pub fn scale(&self) -> f64 {
        2_f64.powf(self.zoom)
    }

    /// Projects a LatLng to world pixel coordinates (EPSG:3857) at the given zoom level
    pub fn project(&self, lat_lng: &LatLng, zoom: Option<f64>) -> Point {
        let z = zoom.unwrap_or(self.zoom);
        let scale = TILE_SIZE as f64 * 2_f64.powf(z);
        let lat = LatLng::clamp_lat(lat_lng.lat);

        let x = lat_lng.lng.to_radians() * EARTH_RADIUS;
        let y = ((std::f64::consts::PI / 4.0 + lat.to_radians() / 2.0).tan().ln()) * EARTH_RADIUS;

        let half = std::f64::consts::PI * EARTH_RADIUS;
        let pixel_x = (x + half) / (2.0 * half) * scale;
        let pixel_y = (-y + half) / (2.0 * half) * scale;

        Point::new(pixel_x, pixel_y)
    }

    /// Unprojects world pixel coordinates back to LatLng at the given zoom level
    pub fn unproject(&self, pixel: &Point, zoom: Option<f64>) -> LatLng {
        let z = zoom.unwrap_or(self.zoom);
        let scale = TILE_SIZE as f64 * 2_f64.powf(z);
        let half = std::f64::consts::PI * EARTH_RADIUS;

        let x = (pixel.x / scale) * (2.0 * half) - half;
        let y = half - (pixel.y / scale) * (2.0 * half);

        let lng = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - std::f64::consts::PI / 2.0).to_degrees();

        LatLng::new(lat, lng)
    }

    /// Converts a geographical coordinate to screen pixel coordinates (container relative)
    pub fn lat_lng_to_pixel(&self, lat_lng: &LatLng) -> Point {
        let origin = self.project(&self.center, None);
        self.project(lat_lng, None)
            .subtract(&origin)
            .add(&self.size.multiply(0.5))
    }

    /// Converts screen pixel coordinates back to geographical coordinates
    pub fn pixel_to_lat_lng(&self, pixel: &Point) -> LatLng {
        let origin = self.project(&self.center, None);
        let world = pixel.subtract(&self.size.multiply(0.5)).add(&origin);
        self.unproject(&world, None)
    }

    /// Pans the viewport by the given pixel offset
    pub fn pan(&mut self, delta: Point) {
        let center_px = self.project(&self.center, None);
        let new_center = self.unproject(&center_px.add(&delta), None);
        self.set_center(new_center);
    }

    /// Gets the current viewport bounds in geographical coordinates
    pub fn bounds(&self) -> LatLngBounds {
        let nw = self.pixel_to_lat_lng(&Point::new(0.0, 0.0));
        let se = self.pixel_to_lat_lng(&Point::new(self.size.x, self.size.y));

        LatLngBounds::new(LatLng::new(se.lat, nw.lng), LatLng::new(nw.lat, se.lng))
    }

    /// Highest integer zoom at which `bounds` fits inside the padded viewport
    pub fn bounds_zoom(&self, bounds: &LatLngBounds, padding: f64) -> Result<f64> {
        if !bounds.is_valid() {
            return Err(MapError::InvalidBounds(format!("{:?}", bounds)));
        }

        let available = Point::new(self.size.x - 2.0 * padding, self.size.y - 2.0 * padding);
        if available.x <= 0.0 || available.y <= 0.0 {
            return Err(MapError::InvalidBounds(format!(
                "viewport {}x{} leaves no room for {}px padding",
                self.size.x, self.size.y, padding
            )));
        }

        let mut best_zoom = self.min_zoom;
        for test_zoom in (self.min_zoom.ceil() as i32)..=(self.max_zoom.floor() as i32) {
            let zoom = test_zoom as f64;
            let nw = self.project(&bounds.north_west(), Some(zoom));
            let se = self.project(&bounds.south_east(), Some(zoom));

            let bounds_width = (se.x - nw.x).abs();
            let bounds_height = (se.y - nw.y).abs();

            if bounds_width <= available.x && bounds_height <= available.y {
                best_zoom = zoom;
            } else {
                break;
            }
        }

        Ok(best_zoom)
    }

    /// Fits the viewport to contain the given bounds with `padding` pixels on every side
    pub fn fit_bounds(&mut self, bounds: &LatLngBounds, padding: f64) -> Result<()> {
        let zoom = self.bounds_zoom(bounds, padding)?;

        let nw = self.project(&bounds.north_west(), Some(zoom));
        let se = self.project(&bounds.south_east(), Some(zoom));
        let center = self.unproject(&nw.add(&se).multiply(0.5), Some(zoom));

        log::debug!(
            "fit_bounds -> center ({:.5}, {:.5}) zoom {}",
            center.lat,
            center.lng,
            zoom
        );
        self.set_view(center, zoom);
        Ok(())
    }

    /// Gets the resolution in meters per pixel at the current zoom level
    pub fn resolution(&self) -> f64 {
        let earth_circumference = 40_075_016.0;
        earth_circumference * self.center.lat.to_radians().cos() / (TILE_SIZE as f64 * self.scale())
    }

    /// Tile under the view center at the nearest integer zoom
    pub fn center_tile(&self) -> TileCoord {
        let z = self.zoom.round().clamp(0.0, 30.0) as u8;
        let pixel = self.project(&self.center, Some(z as f64));
        let last = ((1u64 << z) - 1) as f64;
        let index = |v: f64| (v / TILE_SIZE as f64).floor().clamp(0.0, last) as u32;
        TileCoord::new(index(pixel.x), index(pixel.y), z)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::new(0.0, 0.0), 0.0, Point::new(800.0, 600.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_creation() {
        let viewport = Viewport::new(
            LatLng::new(34.8679, 138.2667),
            13.0,
            Point::new(800.0, 600.0),
        );

        assert_eq!(viewport.zoom, 13.0);
        assert_eq!(viewport.center.lat, 34.8679);
        assert_eq!(viewport.size.x, 800.0);
    }

    #[test]
    fn test_coordinate_conversion() {
        let viewport = Viewport::new(LatLng::new(0.0, 0.0), 1.0, Point::new(512.0, 512.0));

        let center_lat_lng = viewport.pixel_to_lat_lng(&Point::new(256.0, 256.0));
        assert!(center_lat_lng.lat.abs() < 0.01);
        assert!(center_lat_lng.lng.abs() < 0.01);

        let target = LatLng::new(34.8679, 138.2667);
        let back = viewport.pixel_to_lat_lng(&viewport.lat_lng_to_pixel(&target));
        assert!((back.lat - target.lat).abs() < 1e-9);
        assert!((back.lng - target.lng).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_limits() {
        let mut viewport = Viewport::default();
        viewport.set_zoom_limits(2.0, 15.0);

        viewport.set_zoom(1.0);
        assert_eq!(viewport.zoom, 2.0);

        viewport.set_zoom(20.0);
        assert_eq!(viewport.zoom, 15.0);
    }

    #[test]
    fn test_fit_bounds_contains_target() {
        let mut viewport = Viewport::new(LatLng::new(0.0, 0.0), 2.0, Point::new(800.0, 600.0));
        let bounds = LatLngBounds::from_coords(34.8479, 138.2467, 34.8879, 138.2867);

        viewport.fit_bounds(&bounds, 50.0).unwrap();

        assert_eq!(viewport.zoom, 13.0);
        assert!(bounds.contains(&viewport.center));
        let visible = viewport.bounds();
        assert!(visible.contains(&bounds.south_west));
        assert!(visible.contains(&bounds.north_east));
    }

    #[test]
    fn test_fit_single_point_uses_max_zoom() {
        let mut viewport = Viewport::default();
        viewport.set_zoom_limits(0.0, 18.0);
        let p = LatLng::new(35.0, 139.0);

        viewport.fit_bounds(&LatLngBounds::new(p, p), 40.0).unwrap();
        assert_eq!(viewport.zoom, 18.0);
    }

    #[test]
    fn test_fit_invalid_bounds_fails_without_moving() {
        let mut viewport = Viewport::new(LatLng::new(10.0, 10.0), 5.0, Point::new(800.0, 600.0));
        let bad = LatLngBounds::from_coords(f64::NAN, 0.0, 1.0, 1.0);

        assert!(viewport.fit_bounds(&bad, 50.0).is_err());
        assert_eq!(viewport.center, LatLng::new(10.0, 10.0));
        assert_eq!(viewport.zoom, 5.0);
    }

    #[test]
    fn test_center_tile() {
        let viewport = Viewport::new(LatLng::new(34.8679, 138.2667), 13.2, Point::new(800.0, 600.0));
        assert_eq!(viewport.center_tile(), TileCoord::new(7242, 3248, 13));

        let world = Viewport::new(LatLng::new(0.0, 0.0), 0.0, Point::new(256.0, 256.0));
        assert_eq!(world.center_tile(), TileCoord::new(0, 0, 0));
    }

    #[test]
    fn test_pan() {
        let mut viewport = Viewport::new(LatLng::new(0.0, 0.0), 1.0, Point::new(512.0, 512.0));

        let original_center = viewport.center;
        viewport.pan(Point::new(10.0, 10.0));

        assert_ne!(viewport.center, original_center);
    }
}
