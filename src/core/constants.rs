//! Core constants for the map session.
//! Keeping them in a single place makes it easier to tweak session-wide magic numbers.

use super::geo::LatLng;

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Fujieda City Hall, the default view center.
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 34.8679,
    lng: 138.2667,
};

/// Zoom level the session opens at.
pub const DEFAULT_ZOOM: f64 = 13.0;

/// Half width / half height (degrees) of the quad a fresh image overlay gets.
pub const OVERLAY_HALF_EXTENT: f64 = 0.02;

/// Padding (px) used when reframing the view around an image overlay.
pub const OVERLAY_FIT_PADDING: f64 = 50.0;

/// Padding (px) used when reframing the view around imported shapes.
pub const IMPORT_FIT_PADDING: f64 = 40.0;

/// Zoom level applied when a search result is shown.
pub const SEARCH_RESULT_ZOOM: f64 = 16.0;

/// File name of the exported shape collection.
pub const EXPORT_FILE_NAME: &str = "drawn.geojson";

/// MIME type of the exported shape collection.
pub const GEOJSON_MIME: &str = "application/geo+json";

/// Public Nominatim search endpoint.
pub const NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
