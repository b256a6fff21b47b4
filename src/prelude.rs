//! Prelude module for common mapsketch types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use mapsketch::prelude::*;`

pub use crate::core::{
    config::{Locale, SessionConfig},
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::Map,
    viewport::Viewport,
};

pub use crate::layers::{
    base::LayerTrait,
    image::{DistortableImage, ImageSource},
    manager::LayerManager,
    marker::Marker,
    tile::{BaseLayerKind, TileLayer, TileSource},
    vector::{DrawnShape, FeatureGroup, ShapeGeometry, ShapeKind, ShapeStyle},
};

pub use crate::plugins::draw::{DrawEvent, DrawPlugin, DrawTool};

pub use crate::input::{
    events::{InputEvent, KeyCode, KeyModifiers, MapEvent, MouseButton},
    handler::EventManager,
};

pub use crate::data::geojson::ExportFile;

pub use crate::geocoding::{Geocoder, NominatimGeocoder, SearchResult};

pub use crate::runtime::{AsyncHandle, AsyncSpawner};

pub use crate::session::{Command, Notice, Outcome, SessionController, SessionState, Ticket};

pub use crate::{Error as MapError, Result};

pub use std::{
    collections::VecDeque,
    pin::Pin,
    sync::Arc,
    time::Duration,
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};

pub use futures::Future;
