use crate::{
    core::geo::{LatLng, LatLngBounds},
    layers::base::{LayerProperties, LayerTrait, LayerType},
};
use serde::{Deserialize, Serialize};

/// Layer id of the group every drawn or imported shape lives in
pub const DRAWN_ITEMS_ID: &str = "drawn-items";

/// RGBA color of a shape stroke or fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Path style, Leaflet defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub stroke_color: SerializableColor,
    pub stroke_width: f32,
    pub stroke_opacity: f32,
    pub filled: bool,
    pub fill_color: SerializableColor,
    pub fill_opacity: f32,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::rgb(0x33, 0x88, 0xff),
            stroke_width: 3.0,
            stroke_opacity: 1.0,
            filled: true,
            fill_color: SerializableColor::rgb(0x33, 0x88, 0xff),
            fill_opacity: 0.2,
        }
    }
}

impl ShapeStyle {
    /// Polylines are never filled
    pub fn for_line() -> Self {
        Self {
            filled: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Marker,
    Polyline,
    Polygon,
    Rectangle,
    Circle,
}

/// Geometry of one drawn shape, in geographic coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeGeometry {
    Marker(LatLng),
    Polyline(Vec<LatLng>),
    /// Outer ring followed by holes; rings are stored open (no repeated first vertex)
    Polygon(Vec<Vec<LatLng>>),
    Rectangle(LatLngBounds),
    /// Radius in metres
    Circle { center: LatLng, radius: f64 },
}

impl ShapeGeometry {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeGeometry::Marker(_) => ShapeKind::Marker,
            ShapeGeometry::Polyline(_) => ShapeKind::Polyline,
            ShapeGeometry::Polygon(_) => ShapeKind::Polygon,
            ShapeGeometry::Rectangle(_) => ShapeKind::Rectangle,
            ShapeGeometry::Circle { .. } => ShapeKind::Circle,
        }
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        match self {
            ShapeGeometry::Marker(p) => Some(LatLngBounds::new(*p, *p)),
            ShapeGeometry::Polyline(points) => LatLngBounds::from_points(points),
            ShapeGeometry::Polygon(rings) => {
                LatLngBounds::from_points(rings.first().into_iter().flatten())
            }
            ShapeGeometry::Rectangle(bounds) => Some(bounds.clone()),
            ShapeGeometry::Circle { center, radius } => Some(center.to_bounds(*radius)),
        }
    }

    /// Open ring of a rectangle: SW, NW, NE, SE
    pub fn rectangle_ring(bounds: &LatLngBounds) -> Vec<LatLng> {
        vec![
            bounds.south_west,
            bounds.north_west(),
            bounds.north_east,
            bounds.south_east(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnShape {
    pub id: String,
    pub geometry: ShapeGeometry,
    pub style: ShapeStyle,
    /// Free-form GeoJSON properties carried through import/export
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl DrawnShape {
    pub fn new(id: String, geometry: ShapeGeometry) -> Self {
        let style = match geometry.kind() {
            ShapeKind::Polyline => ShapeStyle::for_line(),
            _ => ShapeStyle::default(),
        };
        Self {
            id,
            geometry,
            style,
            properties: serde_json::Map::new(),
        }
    }

    pub fn with_properties(mut self, properties: serde_json::Map<String, serde_json::Value>) -> Self {
        self.properties = properties;
        self
    }

    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        self.geometry.bounds()
    }
}

/// Ordered, editable collection of shapes attached to the map as one layer
pub struct FeatureGroup {
    properties: LayerProperties,
    shapes: Vec<DrawnShape>,
    next_id: u64,
}

impl FeatureGroup {
    pub fn new(id: String) -> Self {
        let properties = LayerProperties::new(id, "Drawn items".to_string(), LayerType::Vector);
        Self {
            properties,
            shapes: Vec::new(),
            next_id: 1,
        }
    }

    /// Fresh shape id unique within this group
    pub fn next_shape_id(&mut self) -> String {
        let id = format!("shape-{}", self.next_id);
        self.next_id += 1;
        id
    }

    /// Appends a shape, re-keying it if its id is empty or already taken
    pub fn add_shape(&mut self, mut shape: DrawnShape) -> String {
        if shape.id.is_empty() || self.get(&shape.id).is_some() {
            shape.id = self.next_shape_id();
        }
        let id = shape.id.clone();
        self.shapes.push(shape);
        id
    }

    pub fn get(&self, id: &str) -> Option<&DrawnShape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut DrawnShape> {
        self.shapes.iter_mut().find(|s| s.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<DrawnShape> {
        let index = self.shapes.iter().position(|s| s.id == id)?;
        Some(self.shapes.remove(index))
    }

    pub fn shapes(&self) -> &[DrawnShape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// Union of the bounds of every shape; `None` when nothing has extent
pub fn shapes_bounds<'a, I>(shapes: I) -> Option<LatLngBounds>
where
    I: IntoIterator<Item = &'a DrawnShape>,
{
    shapes
        .into_iter()
        .filter_map(|s| s.bounds())
        .reduce(|acc, b| acc.union(&b))
}

impl LayerTrait for FeatureGroup {
    crate::impl_layer_trait!(FeatureGroup, properties);

    fn bounds(&self) -> Option<LatLngBounds> {
        shapes_bounds(&self.shapes)
    }

    fn options(&self) -> serde_json::Value {
        serde_json::json!({ "count": self.shapes.len() })
    }
}
