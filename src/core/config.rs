//! Configuration system for the map session
//!
//! This module provides a sectioned configuration that front-ends can build in
//! code, start from a preset, or load from a JSON document. Every section has
//! defaults matching the stock Fujieda page.

use crate::core::constants::{
    DEFAULT_CENTER, DEFAULT_ZOOM, IMPORT_FIT_PADDING, NOMINATIM_ENDPOINT, OVERLAY_FIT_PADDING,
    OVERLAY_HALF_EXTENT, SEARCH_RESULT_ZOOM,
};
use crate::core::geo::{LatLng, Point};
use crate::layers::tile::BaseLayerKind;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Language used for user-visible notices and geocoder results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ja,
    En,
}

impl Locale {
    /// Value sent in the `Accept-Language` header
    pub fn language_tag(&self) -> &'static str {
        match self {
            Locale::Ja => "ja",
            Locale::En => "en",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub center: LatLng,
    pub zoom: f64,
    pub size: Point,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            size: Point::new(1200.0, 800.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Half width / height in degrees of a fresh overlay quad
    pub half_extent: f64,
    pub fit_padding: f64,
    /// Opacity slider position at startup
    pub initial_opacity: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            half_extent: OVERLAY_HALF_EXTENT,
            fit_padding: OVERLAY_FIT_PADDING,
            initial_opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub fit_padding: f64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            fit_padding: IMPORT_FIT_PADDING,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub accept_language: String,
    pub result_zoom: f64,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: NOMINATIM_ENDPOINT.to_string(),
            accept_language: Locale::Ja.language_tag().to_string(),
            result_zoom: SEARCH_RESULT_ZOOM,
            timeout_ms: 10_000,
            user_agent: concat!("mapsketch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Full session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    pub view: ViewConfig,
    pub overlay: OverlayConfig,
    pub import: ImportConfig,
    pub search: SearchConfig,
    pub locale: Locale,
    pub initial_base: BaseLayerKind,
}

impl SessionConfig {
    /// Parses a (possibly partial) JSON document; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.view.center.is_valid() {
            return Err(MapError::Config(format!(
                "view.center out of range: {:?}",
                self.view.center
            )));
        }
        if self.view.size.x <= 0.0 || self.view.size.y <= 0.0 {
            return Err(MapError::Config("view.size must be positive".into()));
        }
        if !(self.overlay.half_extent > 0.0 && self.overlay.half_extent.is_finite()) {
            return Err(MapError::Config(
                "overlay.half_extent must be a positive number".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.overlay.initial_opacity) {
            return Err(MapError::Config(
                "overlay.initial_opacity must be within [0, 1]".into(),
            ));
        }
        if self.overlay.fit_padding < 0.0 || self.import.fit_padding < 0.0 {
            return Err(MapError::Config("fit padding cannot be negative".into()));
        }
        if self.search.endpoint.trim().is_empty() {
            return Err(MapError::Config("search.endpoint is empty".into()));
        }
        Ok(())
    }

    /// Same defaults with notices and geocoder results in English
    pub fn english() -> Self {
        let mut config = Self::default();
        config.locale = Locale::En;
        config.search.accept_language = Locale::En.language_tag().to_string();
        config
    }
}
