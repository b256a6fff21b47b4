use crate::{
    core::geo::{LatLng, LatLngBounds},
    layers::base::{LayerProperties, LayerTrait, LayerType},
};

/// A point marker with an optional popup bound to it
pub struct Marker {
    properties: LayerProperties,
    position: LatLng,
    popup_text: Option<String>,
    popup_open: bool,
}

impl Marker {
    pub fn new(id: String, position: LatLng) -> Self {
        let properties = LayerProperties::new(id, "Marker".to_string(), LayerType::Marker);
        Self {
            properties,
            position,
            popup_text: None,
            popup_open: false,
        }
    }

    pub fn with_popup(mut self, text: String) -> Self {
        self.popup_text = Some(text);
        self
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn popup_text(&self) -> Option<&str> {
        self.popup_text.as_deref()
    }

    pub fn is_popup_open(&self) -> bool {
        self.popup_open
    }

    /// Opens the bound popup; markers without one stay closed
    pub fn open_popup(&mut self) {
        self.popup_open = self.popup_text.is_some();
    }

    pub fn close_popup(&mut self) {
        self.popup_open = false;
    }
}

impl LayerTrait for Marker {
    crate::impl_layer_trait!(Marker, properties);

    fn options(&self) -> serde_json::Value {
        serde_json::json!({
            "position": {
                "lat": self.position.lat,
                "lng": self.position.lng
            },
            "popup": self.popup_text,
            "popupOpen": self.popup_open,
        })
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        Some(LatLngBounds::new(self.position, self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popup_requires_text() {
        let mut bare = Marker::new("a".into(), LatLng::new(0.0, 0.0));
        bare.open_popup();
        assert!(!bare.is_popup_open());

        let mut marker =
            Marker::new("b".into(), LatLng::new(1.0, 2.0)).with_popup("Fujieda".into());
        marker.open_popup();
        assert!(marker.is_popup_open());
        assert_eq!(marker.popup_text(), Some("Fujieda"));
        marker.close_popup();
        assert!(!marker.is_popup_open());
    }
}
