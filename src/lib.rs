//! # mapsketch
//!
//! A Rust-native map session controller inspired by Leaflet page scripts.
//!
//! The crate owns the state of an interactive map session: the active base
//! tile layer, at most one distortable image overlay, a collection of drawn
//! vector shapes and the markers dropped by address searches. Front-ends
//! drive it through typed [`session::Command`]s and render what it exposes.

pub mod core;
pub mod data;
pub mod geocoding;
pub mod input;
pub mod layers;
pub mod plugins;
pub mod prelude;
pub mod runtime;
pub mod session;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::SessionConfig,
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::Map,
    viewport::Viewport,
};

pub use layers::{
    base::LayerTrait,
    image::DistortableImage,
    marker::Marker,
    tile::{BaseLayerKind, TileLayer},
    vector::{DrawnShape, ShapeGeometry, ShapeStyle},
};

pub use input::events::{InputEvent, MapEvent};

pub use plugins::draw::{DrawEvent, DrawPlugin, DrawTool};

pub use data::geojson::ExportFile;

pub use geocoding::{Geocoder, NominatimGeocoder, SearchResult};

pub use session::{Command, Notice, Outcome, SessionController, SessionState};

/// Installs `env_logger`, honouring `RUST_LOG` and defaulting to `info` for this crate.
/// Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("mapsketch=info"),
    )
    .try_init();
}

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Error type alias for convenience
pub type Error = MapError;
