use crate::{
    core::geo::TileCoord,
    layers::base::{LayerProperties, LayerTrait},
};
use serde::{Deserialize, Serialize};

/// The fixed catalogue of base maps a session can switch between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BaseLayerKind {
    /// OpenStreetMap standard tiles
    #[default]
    Standard,
    /// GSI (国土地理院) standard topographic tiles
    Topographic,
    /// GSI seamless aerial photographs
    AerialPhoto,
}

impl BaseLayerKind {
    pub const ALL: [BaseLayerKind; 3] = [
        BaseLayerKind::Standard,
        BaseLayerKind::Topographic,
        BaseLayerKind::AerialPhoto,
    ];

    /// Layer id used when the layer is attached to the map
    pub fn layer_id(&self) -> &'static str {
        match self {
            BaseLayerKind::Standard => "base-standard",
            BaseLayerKind::Topographic => "base-topographic",
            BaseLayerKind::AerialPhoto => "base-aerial-photo",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BaseLayerKind::Standard => "OpenStreetMap",
            BaseLayerKind::Topographic => "地理院 標準地図",
            BaseLayerKind::AerialPhoto => "地理院 航空写真",
        }
    }

    pub fn options(&self) -> TileLayerOptions {
        match self {
            BaseLayerKind::Standard => TileLayerOptions {
                url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
                subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
                attribution: "© OpenStreetMap contributors".to_string(),
                max_zoom: 19,
                ..Default::default()
            },
            BaseLayerKind::Topographic => TileLayerOptions {
                url_template: "https://cyberjapandata.gsi.go.jp/xyz/std/{z}/{x}/{y}.png"
                    .to_string(),
                attribution: "地図: © 国土地理院".to_string(),
                max_zoom: 18,
                ..Default::default()
            },
            BaseLayerKind::AerialPhoto => TileLayerOptions {
                url_template: "https://cyberjapandata.gsi.go.jp/xyz/seamlessphoto/{z}/{x}/{y}.jpg"
                    .to_string(),
                attribution: "航空写真: © 国土地理院".to_string(),
                max_zoom: 18,
                ..Default::default()
            },
        }
    }
}

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Configuration for a tile layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayerOptions {
    /// URL template for tiles (e.g., "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png")
    pub url_template: String,
    /// Available subdomains for load balancing
    pub subdomains: Vec<String>,
    /// Attribution text
    pub attribution: String,
    /// Tile size in pixels
    pub tile_size: u32,
    /// Maximum zoom level for this tile source
    pub max_zoom: u8,
    /// Minimum zoom level for this tile source
    pub min_zoom: u8,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self {
            url_template: String::new(),
            subdomains: Vec::new(),
            attribution: String::new(),
            tile_size: crate::core::constants::TILE_SIZE,
            max_zoom: 18,
            min_zoom: 0,
        }
    }
}

/// A base map layer. Immutable once built: switching base maps swaps whole layers.
pub struct TileLayer {
    properties: LayerProperties,
    kind: Option<BaseLayerKind>,
    options: TileLayerOptions,
}

impl TileLayer {
    /// Create a tile layer with custom options
    pub fn with_options(id: String, name: String, options: TileLayerOptions) -> Self {
        let properties = LayerProperties::new(id, name, crate::layers::base::LayerType::Tile);
        Self {
            properties,
            kind: None,
            options,
        }
    }

    /// Create one of the catalogue base layers
    pub fn preset(kind: BaseLayerKind) -> Self {
        let mut layer = Self::with_options(
            kind.layer_id().to_string(),
            kind.label().to_string(),
            kind.options(),
        );
        layer.kind = Some(kind);
        layer
    }

    pub fn kind(&self) -> Option<BaseLayerKind> {
        self.kind
    }

    pub fn max_zoom(&self) -> u8 {
        self.options.max_zoom
    }

    pub fn min_zoom(&self) -> u8 {
        self.options.min_zoom
    }

    pub fn attribution(&self) -> &str {
        &self.options.attribution
    }

    pub fn url_template(&self) -> &str {
        &self.options.url_template
    }

    pub fn tile_url(&self, z: u8, x: u32, y: u32) -> String {
        self.url(TileCoord::new(x, y, z))
    }
}

impl TileSource for TileLayer {
    fn url(&self, coord: TileCoord) -> String {
        let mut url = self
            .options
            .url_template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string());

        if !self.options.subdomains.is_empty() {
            let idx = ((coord.x + coord.y) % self.options.subdomains.len() as u32) as usize;
            url = url.replace("{s}", &self.options.subdomains[idx]);
        }
        url
    }
}

impl LayerTrait for TileLayer {
    crate::impl_layer_trait!(TileLayer, properties);

    fn options(&self) -> serde_json::Value {
        serde_json::json!({
            "url": self.options.url_template,
            "maxZoom": self.options.max_zoom,
            "minZoom": self.options.min_zoom,
            "attribution": self.options.attribution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_max_zoom() {
        assert_eq!(TileLayer::preset(BaseLayerKind::Standard).max_zoom(), 19);
        assert_eq!(TileLayer::preset(BaseLayerKind::Topographic).max_zoom(), 18);
        assert_eq!(TileLayer::preset(BaseLayerKind::AerialPhoto).max_zoom(), 18);
    }

    #[test]
    fn test_url_expansion() {
        let osm = TileLayer::preset(BaseLayerKind::Standard);
        assert_eq!(
            osm.url(TileCoord::new(7242, 3245, 13)),
            "https://c.tile.openstreetmap.org/13/7242/3245.png"
        );

        let photo = TileLayer::preset(BaseLayerKind::AerialPhoto);
        assert_eq!(
            photo.url(TileCoord::new(1, 2, 3)),
            "https://cyberjapandata.gsi.go.jp/xyz/seamlessphoto/3/1/2.jpg"
        );
    }

    #[test]
    fn test_attribution_and_ids_are_distinct() {
        let ids: std::collections::HashSet<_> =
            BaseLayerKind::ALL.iter().map(|k| k.layer_id()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(
            TileLayer::preset(BaseLayerKind::Topographic).attribution(),
            "地図: © 国土地理院"
        );
    }
}
