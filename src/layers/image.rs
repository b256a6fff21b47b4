use crate::{
    core::geo::{LatLng, LatLngBounds},
    layers::base::{LayerProperties, LayerTrait, LayerType},
    MapError, Result,
};
use image::ImageFormat;
use std::io::Cursor;
use std::sync::Arc;

/// Encoded image bytes as read from disk, plus what could be sniffed from them
#[derive(Debug, Clone)]
pub struct ImageSource {
    bytes: Arc<Vec<u8>>,
    format: Option<ImageFormat>,
    dimensions: Option<(u32, u32)>,
    file_name: Option<String>,
}

impl ImageSource {
    /// Wraps raw bytes. Unrecognised data is kept as-is; decoding is the renderer's job.
    pub fn from_bytes(bytes: Vec<u8>, file_name: Option<String>) -> Self {
        let format = image::guess_format(&bytes).ok();
        let dimensions = image::io::Reader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok());

        if format.is_none() {
            log::warn!(
                "unrecognised image data ({} bytes) in {:?}",
                bytes.len(),
                file_name
            );
        }

        Self {
            bytes: Arc::new(bytes),
            format,
            dimensions,
            file_name,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the encoded bytes
    pub fn shared_bytes(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.bytes)
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Pixel size, when the header could be read
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn mime_type(&self) -> &'static str {
        match self.format {
            Some(ImageFormat::Png) => "image/png",
            Some(ImageFormat::Jpeg) => "image/jpeg",
            Some(ImageFormat::Gif) => "image/gif",
            Some(ImageFormat::WebP) => "image/webp",
            Some(ImageFormat::Bmp) => "image/bmp",
            _ => "application/octet-stream",
        }
    }
}

/// An image overlay whose four corners can be moved independently.
///
/// Corners are stored top-left, top-right, bottom-right, bottom-left.
pub struct DistortableImage {
    properties: LayerProperties,
    source: ImageSource,
    corners: [LatLng; 4],
    editing: bool,
    selected: bool,
}

impl DistortableImage {
    pub fn new(id: String, source: ImageSource, corners: [LatLng; 4], opacity: f64) -> Self {
        let mut properties = LayerProperties::new(id, "Image Overlay".to_string(), LayerType::Image);
        properties.opacity = opacity.clamp(0.0, 1.0) as f32;
        Self {
            properties,
            source,
            corners: corners.map(|c| c.clamped()),
            editing: true,
            selected: true,
        }
    }

    /// Axis-aligned quad of `half_extent` degrees around `center`, clamped to the projectable range
    pub fn default_corners(center: LatLng, half_extent: f64) -> [LatLng; 4] {
        [
            center.offset(half_extent, -half_extent),
            center.offset(half_extent, half_extent),
            center.offset(-half_extent, half_extent),
            center.offset(-half_extent, -half_extent),
        ]
        .map(|c| c.clamped())
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    pub fn corners(&self) -> &[LatLng; 4] {
        &self.corners
    }

    /// Moves one corner; `index` follows the TL, TR, BR, BL order
    pub fn set_corner(&mut self, index: usize, position: LatLng) -> Result<()> {
        if !position.is_valid() {
            return Err(MapError::InvalidCoordinates(format!("{:?}", position)));
        }
        let corner = self.corners.get_mut(index).ok_or_else(|| {
            MapError::Layer(format!("corner index {} out of range (0..4)", index))
        })?;
        *corner = position.clamped();
        Ok(())
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn enable_editing(&mut self) {
        self.editing = true;
    }

    pub fn disable_editing(&mut self) {
        self.editing = false;
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl LayerTrait for DistortableImage {
    crate::impl_layer_trait!(DistortableImage, properties);

    fn bounds(&self) -> Option<LatLngBounds> {
        LatLngBounds::from_points(self.corners.iter())
    }

    fn options(&self) -> serde_json::Value {
        serde_json::json!({
            "mime": self.source.mime_type(),
            "corners": self.corners.iter().map(|c| [c.lat, c.lng]).collect::<Vec<_>>(),
            "opacity": self.properties.opacity,
            "editable": self.editing,
            "selected": self.selected,
        })
    }
}
