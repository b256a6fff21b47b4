use crate::{
    core::{
        config::ViewConfig,
        geo::{LatLng, LatLngBounds, Point},
        viewport::Viewport,
    },
    input::{EventManager, MapEvent},
    layers::{
        base::{LayerTrait, LayerType},
        manager::LayerManager,
        tile::{BaseLayerKind, TileLayer},
    },
    MapError, Result,
};

/// The map surface: a viewport, the attached layers and the event queue.
///
/// Exactly one tile layer occupies the base slot once [`Map::set_base_layer`]
/// has been called; every other layer is an overlay.
pub struct Map {
    pub viewport: Viewport,
    layer_manager: LayerManager,
    event_manager: EventManager,
    base_layer: Option<String>,
}

impl Map {
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        Self {
            viewport: Viewport::new(center, zoom, size),
            layer_manager: LayerManager::new(),
            event_manager: EventManager::new(),
            base_layer: None,
        }
    }

    pub fn from_config(config: &ViewConfig) -> Self {
        Self::new(config.center, config.zoom, config.size)
    }

    pub fn center(&self) -> LatLng {
        self.viewport.center
    }

    pub fn zoom(&self) -> f64 {
        self.viewport.zoom
    }

    /// Swaps the base layer: the current one is detached before `layer` is attached.
    /// The zoom range follows the new layer and the current zoom is clamped into it.
    pub fn set_base_layer(&mut self, layer: TileLayer) -> Result<Option<Box<dyn LayerTrait>>> {
        let previous = match self.base_layer.take() {
            Some(old_id) => {
                let removed = self.layer_manager.remove_layer(&old_id);
                if removed.is_some() {
                    self.event_manager.emit(MapEvent::LayerRemove { layer_id: old_id });
                }
                removed
            }
            None => None,
        };

        let layer_id = layer.id().to_string();
        let (min_zoom, max_zoom) = (layer.min_zoom() as f64, layer.max_zoom() as f64);
        self.layer_manager.add_layer(Box::new(layer))?;
        self.base_layer = Some(layer_id.clone());
        self.event_manager.emit(MapEvent::LayerAdd {
            layer_id: layer_id.clone(),
        });

        let old_zoom = self.viewport.zoom;
        self.viewport.set_zoom_limits(min_zoom, max_zoom);
        if self.viewport.zoom != old_zoom {
            self.emit_view_changed();
        }

        log::debug!("base layer -> {}", layer_id);
        self.event_manager
            .emit(MapEvent::BaseLayerChange { layer_id });
        Ok(previous)
    }

    /// The attached base layer, if any
    pub fn base_layer(&self) -> Option<&TileLayer> {
        let id = self.base_layer.as_deref()?;
        self.layer::<TileLayer>(id)
    }

    pub fn base_layer_kind(&self) -> Option<BaseLayerKind> {
        self.base_layer().and_then(|layer| layer.kind())
    }

    /// Number of tile layers attached (1 once a base layer is set)
    pub fn tile_layer_count(&self) -> usize {
        self.layer_manager.ids_of_type(LayerType::Tile).len()
    }

    /// Attaches a non-base layer. Image layers are reported as overlays.
    pub fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        if layer.layer_type() == LayerType::Tile {
            return Err(MapError::Layer(format!(
                "tile layer {} must go through set_base_layer",
                layer.id()
            )));
        }
        let layer_id = layer.id().to_string();
        let is_overlay = layer.layer_type() == LayerType::Image;
        self.layer_manager.add_layer(layer)?;
        self.event_manager.emit(if is_overlay {
            MapEvent::OverlayAdd { layer_id }
        } else {
            MapEvent::LayerAdd { layer_id }
        });
        Ok(())
    }

    pub fn remove_layer(&mut self, layer_id: &str) -> Option<Box<dyn LayerTrait>> {
        if self.base_layer.as_deref() == Some(layer_id) {
            self.base_layer = None;
        }
        let layer = self.layer_manager.remove_layer(layer_id)?;
        let layer_id = layer_id.to_string();
        self.event_manager.emit(if layer.layer_type() == LayerType::Image {
            MapEvent::OverlayRemove { layer_id }
        } else {
            MapEvent::LayerRemove { layer_id }
        });
        Some(layer)
    }

    pub fn has_layer(&self, layer_id: &str) -> bool {
        self.layer_manager.contains(layer_id)
    }

    pub fn get_layer(&self, layer_id: &str) -> Option<&dyn LayerTrait> {
        self.layer_manager.get_layer(layer_id)
    }

    /// Typed access to an attached layer
    pub fn layer<T: 'static>(&self, layer_id: &str) -> Option<&T> {
        self.layer_manager
            .get_layer(layer_id)?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn layer_mut<T: 'static>(&mut self, layer_id: &str) -> Option<&mut T> {
        self.layer_manager
            .get_layer_mut(layer_id)?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Attached layers in render order
    pub fn layers(&self) -> Vec<&dyn LayerTrait> {
        self.layer_manager.layers()
    }

    pub fn layer_ids_of_type(&self, layer_type: LayerType) -> Vec<String> {
        self.layer_manager.ids_of_type(layer_type)
    }

    pub fn set_view(&mut self, center: LatLng, zoom: f64) -> Result<()> {
        if !center.is_valid() || !zoom.is_finite() {
            return Err(MapError::InvalidCoordinates(format!(
                "{:?} @ {}",
                center, zoom
            )));
        }
        let (old_center, old_zoom) = (self.viewport.center, self.viewport.zoom);
        self.viewport.set_view(center, zoom);
        if self.viewport.center != old_center || self.viewport.zoom != old_zoom {
            self.emit_view_changed();
        }
        Ok(())
    }

    /// Reframes the view around `bounds`; the view is untouched on error
    pub fn fit_bounds(&mut self, bounds: &LatLngBounds, padding: f64) -> Result<()> {
        let (old_center, old_zoom) = (self.viewport.center, self.viewport.zoom);
        self.viewport.fit_bounds(bounds, padding)?;
        if self.viewport.center != old_center || self.viewport.zoom != old_zoom {
            self.emit_view_changed();
        }
        Ok(())
    }

    pub fn set_size(&mut self, size: Point) {
        self.viewport.set_size(size);
    }

    /// Register a listener for events of `event_type` (e.g. "baselayerchange")
    pub fn on<F>(&mut self, event_type: &str, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.event_manager.on(event_type, callback);
    }

    pub(crate) fn emit(&mut self, event: MapEvent) {
        self.event_manager.emit(event);
    }

    /// Drains queued events, notifying listeners
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        self.event_manager.process_events()
    }

    pub fn pending_events(&self) -> usize {
        self.event_manager.pending_events()
    }

    fn emit_view_changed(&mut self) {
        self.event_manager.emit(MapEvent::ViewChanged {
            center: self.viewport.center,
            zoom: self.viewport.zoom,
        });
    }
}
