use crate::{
    core::{config::SessionConfig, geo::LatLng, map::Map},
    input::MapEvent,
    layers::{
        base::LayerTrait,
        image::DistortableImage,
        marker::Marker,
        tile::TileLayer,
        vector::{DrawnShape, FeatureGroup, DRAWN_ITEMS_ID},
    },
    session::command::{Notice, RequestKind, Ticket},
    Result,
};

/// Latest issued generation per request kind
#[derive(Debug, Default)]
pub struct Generations {
    overlay: u64,
    import: u64,
    search: u64,
}

impl Generations {
    fn counter(&mut self, kind: RequestKind) -> &mut u64 {
        match kind {
            RequestKind::OverlayLoad => &mut self.overlay,
            RequestKind::Import => &mut self.import,
            RequestKind::Search => &mut self.search,
        }
    }

    pub fn issue(&mut self, kind: RequestKind) -> Ticket {
        let counter = self.counter(kind);
        *counter += 1;
        Ticket {
            kind,
            generation: *counter,
        }
    }

    /// Invalidates every outstanding ticket of `kind`
    pub fn supersede(&mut self, kind: RequestKind) {
        *self.counter(kind) += 1;
    }

    /// Imports never go stale; other kinds must hold the newest ticket
    pub fn is_current(&self, ticket: Ticket) -> bool {
        match ticket.kind {
            RequestKind::Import => true,
            RequestKind::OverlayLoad => ticket.generation == self.overlay,
            RequestKind::Search => ticket.generation == self.search,
        }
    }
}

/// Everything one map session owns
pub struct SessionState {
    pub map: Map,
    config: SessionConfig,
    opacity: f64,
    overlay_id: Option<String>,
    overlays_created: u64,
    search_markers: Vec<String>,
    open_popup: Option<String>,
    notices: Vec<Notice>,
    pub(crate) generations: Generations,
}

impl SessionState {
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let mut map = Map::from_config(&config.view);
        map.set_base_layer(TileLayer::preset(config.initial_base))?;
        map.add_layer(Box::new(FeatureGroup::new(DRAWN_ITEMS_ID.to_string())))?;
        // startup noise is not interesting to listeners
        map.process_events();

        Ok(Self {
            map,
            opacity: config.overlay.initial_opacity,
            config,
            overlay_id: None,
            overlays_created: 0,
            search_markers: Vec::new(),
            open_popup: None,
            notices: Vec::new(),
            generations: Generations::default(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current opacity slider value
    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Slider label, two decimals
    pub fn opacity_label(&self) -> String {
        format!("{:.2}", self.opacity)
    }

    pub(crate) fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
        let value = self.opacity as f32;
        if let Some(overlay) = self.overlay_mut() {
            overlay.set_opacity(value);
        }
    }

    pub fn overlay(&self) -> Option<&DistortableImage> {
        let id = self.overlay_id.as_deref()?;
        self.map.layer::<DistortableImage>(id)
    }

    pub fn overlay_mut(&mut self) -> Option<&mut DistortableImage> {
        let id = self.overlay_id.clone()?;
        self.map.layer_mut::<DistortableImage>(&id)
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay().is_some()
    }

    pub(crate) fn next_overlay_id(&mut self) -> String {
        self.overlays_created += 1;
        format!("image-overlay-{}", self.overlays_created)
    }

    /// Detaches any current overlay, then attaches `overlay`
    pub(crate) fn replace_overlay(&mut self, overlay: DistortableImage) -> Result<()> {
        self.remove_overlay();
        let id = overlay.id().to_string();
        self.map.add_layer(Box::new(overlay))?;
        self.overlay_id = Some(id);
        Ok(())
    }

    /// Returns whether an overlay was present
    pub(crate) fn remove_overlay(&mut self) -> bool {
        match self.overlay_id.take() {
            Some(id) => self.map.remove_layer(&id).is_some(),
            None => false,
        }
    }

    /// The drawn and imported shapes, in insertion order
    pub fn shapes(&self) -> &[DrawnShape] {
        self.map
            .layer::<FeatureGroup>(DRAWN_ITEMS_ID)
            .map(|group| group.shapes())
            .unwrap_or(&[])
    }

    pub(crate) fn shape_group_mut(&mut self) -> Option<&mut FeatureGroup> {
        self.map.layer_mut::<FeatureGroup>(DRAWN_ITEMS_ID)
    }

    /// Search result markers, oldest first
    pub fn search_markers(&self) -> Vec<&Marker> {
        self.search_markers
            .iter()
            .filter_map(|id| self.map.layer::<Marker>(id))
            .collect()
    }

    /// The marker whose popup is open, if any
    pub fn open_popup(&self) -> Option<&Marker> {
        let id = self.open_popup.as_deref()?;
        self.map.layer::<Marker>(id)
    }

    /// Adds a marker for a search hit and opens its popup
    pub(crate) fn add_search_marker(&mut self, position: LatLng, label: String) -> Result<String> {
        let id = format!("search-marker-{}", self.search_markers.len() + 1);
        let marker = Marker::new(id.clone(), position).with_popup(label);
        self.map.add_layer(Box::new(marker))?;
        self.search_markers.push(id.clone());
        self.open_popup_on(&id);
        Ok(id)
    }

    /// Opens the popup on `id`, closing whichever popup was open
    pub fn open_popup_on(&mut self, id: &str) {
        if let Some(previous) = self.open_popup.take() {
            if let Some(marker) = self.map.layer_mut::<Marker>(&previous) {
                marker.close_popup();
                self.map.emit(MapEvent::PopupClose { layer_id: previous });
            }
        }
        if let Some(marker) = self.map.layer_mut::<Marker>(id) {
            marker.open_popup();
            if marker.is_popup_open() {
                self.open_popup = Some(id.to_string());
                self.map.emit(MapEvent::PopupOpen {
                    layer_id: id.to_string(),
                });
            }
        }
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        log::info!("notice: {}", notice.message(self.config.locale));
        self.notices.push(notice);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::tile::BaseLayerKind;

    #[test]
    fn test_generations() {
        let mut generations = Generations::default();
        let first = generations.issue(RequestKind::Search);
        let second = generations.issue(RequestKind::Search);
        assert!(!generations.is_current(first));
        assert!(generations.is_current(second));

        let load = generations.issue(RequestKind::OverlayLoad);
        generations.supersede(RequestKind::OverlayLoad);
        assert!(!generations.is_current(load));

        let import = generations.issue(RequestKind::Import);
        generations.issue(RequestKind::Import);
        assert!(generations.is_current(import));
    }

    #[test]
    fn test_new_session_layout() {
        let state = SessionState::new(SessionConfig::default()).unwrap();
        assert_eq!(state.map.base_layer_kind(), Some(BaseLayerKind::Standard));
        assert!(state.shapes().is_empty());
        assert!(!state.has_overlay());
        assert_eq!(state.opacity_label(), "1.00");
        assert_eq!(state.map.pending_events(), 0);
    }

    #[test]
    fn test_popups_are_exclusive() {
        let mut state = SessionState::new(SessionConfig::default()).unwrap();
        let a = state
            .add_search_marker(LatLng::new(34.0, 138.0), "A".into())
            .unwrap();
        let b = state
            .add_search_marker(LatLng::new(35.0, 139.0), "B".into())
            .unwrap();

        assert_eq!(state.search_markers().len(), 2);
        assert_eq!(state.open_popup().and_then(|m| m.popup_text()), Some("B"));
        assert!(!state.map.layer::<Marker>(&a).unwrap().is_popup_open());

        state.open_popup_on(&a);
        assert!(!state.map.layer::<Marker>(&b).unwrap().is_popup_open());
        assert_eq!(state.open_popup().and_then(|m| m.popup_text()), Some("A"));
    }
}
