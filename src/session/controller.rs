use crate::{
    core::{
        config::SessionConfig,
        geo::{LatLng, LatLngBounds},
    },
    data::geojson::{export_shapes, import_bounds, parse_shapes_bytes},
    geocoding::{Geocoder, SearchResult},
    input::InputEvent,
    layers::{
        base::LayerTrait,
        image::{DistortableImage, ImageSource},
        tile::TileLayer,
    },
    plugins::draw::{DrawEvent, DrawPlugin},
    prelude::Arc,
    runtime::{self, AsyncHandle, AsyncSpawner},
    session::{
        command::{Command, Notice, Outcome, RequestKind, Ticket},
        state::SessionState,
    },
    MapError, Result,
};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Result of a background request, applied on the owning thread by `pump`
#[derive(Debug)]
pub enum Completion {
    OverlayRead {
        ticket: Ticket,
        path: PathBuf,
        result: std::io::Result<Vec<u8>>,
    },
    ShapesRead {
        ticket: Ticket,
        path: PathBuf,
        result: std::io::Result<Vec<u8>>,
    },
    SearchDone {
        ticket: Ticket,
        query: String,
        result: Result<Vec<SearchResult>>,
    },
}

impl Completion {
    pub fn ticket(&self) -> Ticket {
        match self {
            Completion::OverlayRead { ticket, .. }
            | Completion::ShapesRead { ticket, .. }
            | Completion::SearchDone { ticket, .. } => *ticket,
        }
    }
}

/// Owns a session and runs commands against it.
///
/// All state lives on the thread that owns the controller. File reads and
/// geocoder lookups run on the spawner and report back over a channel;
/// call [`SessionController::pump`] once per frame to apply them.
pub struct SessionController {
    state: SessionState,
    draw: DrawPlugin,
    spawner: Arc<dyn AsyncSpawner>,
    geocoder: Arc<dyn Geocoder>,
    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,
    tasks: Vec<Box<dyn AsyncHandle>>,
    in_flight: usize,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        spawner: Arc<dyn AsyncSpawner>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Result<Self> {
        let (completion_tx, completion_rx) = unbounded();
        Ok(Self {
            state: SessionState::new(config)?,
            draw: DrawPlugin::new(),
            spawner,
            geocoder,
            completion_tx,
            completion_rx,
            tasks: Vec::new(),
            in_flight: 0,
        })
    }

    /// Session on a tokio runtime with the configured Nominatim endpoint
    #[cfg(feature = "tokio-runtime")]
    pub fn with_tokio(config: SessionConfig, handle: tokio::runtime::Handle) -> Result<Self> {
        let geocoder = crate::geocoding::NominatimGeocoder::new(&config.search)?;
        Self::new(
            config,
            Arc::new(runtime::TokioSpawner::new(handle)),
            Arc::new(geocoder),
        )
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn draw_plugin(&self) -> &DrawPlugin {
        &self.draw
    }

    pub fn draw_plugin_mut(&mut self) -> &mut DrawPlugin {
        &mut self.draw
    }

    /// Background requests whose completion has not been applied yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.state.take_notices()
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        log::debug!("dispatch {:?}", command);
        match command {
            Command::SwitchBase(kind) => {
                self.state.map.set_base_layer(TileLayer::preset(kind))?;
                log::info!("base layer: {}", kind.label());
                Ok(Outcome::Done)
            }
            Command::SetImage(None) | Command::ImportShapes(None) => Ok(Outcome::Ignored),
            Command::SetImage(Some(path)) => {
                let ticket = self.state.generations.issue(RequestKind::OverlayLoad);
                self.spawn_read(path, ticket, |ticket, path, result| {
                    Completion::OverlayRead {
                        ticket,
                        path,
                        result,
                    }
                });
                Ok(Outcome::Pending(ticket))
            }
            Command::SetOpacity(value) => {
                if !value.is_finite() {
                    return Ok(Outcome::Ignored);
                }
                self.state.set_opacity(value);
                Ok(Outcome::Done)
            }
            Command::FitOverlay => {
                let Some(bounds) = self.state.overlay().and_then(|o| o.bounds()) else {
                    return Ok(Outcome::Ignored);
                };
                let padding = self.state.config().overlay.fit_padding;
                self.fit_quietly(Some(bounds), padding);
                Ok(Outcome::Done)
            }
            Command::ToggleHandles => match self.state.overlay_mut() {
                Some(overlay) => {
                    if overlay.is_editing() {
                        overlay.disable_editing();
                    } else {
                        overlay.enable_editing();
                    }
                    Ok(Outcome::Done)
                }
                None => Ok(Outcome::Ignored),
            },
            Command::RemoveOverlay => {
                self.state.generations.supersede(RequestKind::OverlayLoad);
                if self.state.remove_overlay() {
                    log::info!("overlay removed");
                    Ok(Outcome::Done)
                } else {
                    Ok(Outcome::Ignored)
                }
            }
            Command::MoveOverlayCorner { index, position } => match self.state.overlay_mut() {
                Some(overlay) if overlay.is_editing() => {
                    overlay.set_corner(index, position)?;
                    Ok(Outcome::Done)
                }
                _ => Ok(Outcome::Ignored),
            },
            Command::Draw(event) => self.apply_draw_event(event),
            Command::ExportShapes => {
                let file = export_shapes(self.state.shapes())?;
                log::info!("exported {} shapes", self.state.shapes().len());
                Ok(Outcome::Exported(file))
            }
            Command::ImportShapes(Some(path)) => {
                let ticket = self.state.generations.issue(RequestKind::Import);
                self.spawn_read(path, ticket, |ticket, path, result| {
                    Completion::ShapesRead {
                        ticket,
                        path,
                        result,
                    }
                });
                Ok(Outcome::Pending(ticket))
            }
            Command::Search(query) => {
                let query = query.trim().to_string();
                if query.is_empty() {
                    return Ok(Outcome::Ignored);
                }
                let ticket = self.state.generations.issue(RequestKind::Search);
                let geocoder = Arc::clone(&self.geocoder);
                let tx = self.completion_tx.clone();
                self.track(runtime::spawn(self.spawner.as_ref(), async move {
                    let result = geocoder.search(&query).await;
                    let _ = tx.send(Completion::SearchDone {
                        ticket,
                        query,
                        result,
                    });
                }));
                Ok(Outcome::Pending(ticket))
            }
        }
    }

    /// Routes pointer/key input through the draw tool
    pub fn handle_input(&mut self, input: &InputEvent) -> Result<Outcome> {
        match self.draw.handle_input(input, &self.state.map.viewport) {
            Some(event) => self.dispatch(Command::Draw(event)),
            None => Ok(Outcome::Ignored),
        }
    }

    /// Applies every completion that has arrived; returns how many were taken
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.receive(completion);
            applied += 1;
        }
        self.tasks.retain(|task| !task.is_finished());
        applied
    }

    /// Blocks until no request is in flight or `timeout` passes.
    /// Returns `true` when the session went idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if self.in_flight == 0 {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completion_rx.recv_timeout(remaining) {
                Ok(completion) => self.receive(completion),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false
                }
            }
        }
    }

    fn track(&mut self, handle: Box<dyn AsyncHandle>) {
        self.in_flight += 1;
        self.tasks.push(handle);
    }

    fn spawn_read<F>(&mut self, path: PathBuf, ticket: Ticket, wrap: F)
    where
        F: FnOnce(Ticket, PathBuf, std::io::Result<Vec<u8>>) -> Completion + Send + 'static,
    {
        let tx = self.completion_tx.clone();
        self.track(runtime::spawn(self.spawner.as_ref(), async move {
            let result = runtime::read_file(&path).await;
            let _ = tx.send(wrap(ticket, path, result));
        }));
    }

    fn receive(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let ticket = completion.ticket();
        if !self.state.generations.is_current(ticket) {
            log::debug!("discarding superseded {:?}", ticket);
            return;
        }
        match completion {
            Completion::OverlayRead { path, result, .. } => self.finish_overlay_load(path, result),
            Completion::ShapesRead { path, result, .. } => self.finish_import(path, result),
            Completion::SearchDone { query, result, .. } => self.finish_search(&query, result),
        }
    }

    fn finish_overlay_load(&mut self, path: PathBuf, result: std::io::Result<Vec<u8>>) {
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("could not read image {}: {}", path.display(), err);
                return;
            }
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let source = ImageSource::from_bytes(bytes, file_name);
        let overlay_config = self.state.config().overlay.clone();
        let corners =
            DistortableImage::default_corners(self.state.map.center(), overlay_config.half_extent);
        let id = self.state.next_overlay_id();
        let overlay = DistortableImage::new(id, source, corners, self.state.opacity());
        let bounds = overlay.bounds();

        if let Err(err) = self.state.replace_overlay(overlay) {
            log::warn!("could not attach overlay: {}", err);
            return;
        }
        log::info!("overlay loaded from {}", path.display());
        self.fit_quietly(bounds, overlay_config.fit_padding);
    }

    fn finish_import(&mut self, path: PathBuf, result: std::io::Result<Vec<u8>>) {
        let parsed = result
            .map_err(MapError::from)
            .and_then(|bytes| parse_shapes_bytes(&bytes));

        let shapes = match parsed {
            Ok(shapes) => shapes,
            Err(err) => {
                log::warn!("import of {} failed: {}", path.display(), err);
                self.state.push_notice(Notice::ImportFailed);
                return;
            }
        };

        let bounds = import_bounds(&shapes);
        let count = shapes.len();
        match self.state.shape_group_mut() {
            Some(group) => {
                for shape in shapes {
                    group.add_shape(shape);
                }
            }
            None => {
                log::warn!("shape collection missing; import dropped");
                return;
            }
        }
        log::info!("imported {} shapes from {}", count, path.display());
        let padding = self.state.config().import.fit_padding;
        self.fit_quietly(bounds, padding);
    }

    fn finish_search(&mut self, query: &str, result: Result<Vec<SearchResult>>) {
        let hit = match result {
            Ok(results) => match results.into_iter().next() {
                Some(hit) => hit,
                None => {
                    log::info!("no results for {:?}", query);
                    self.state.push_notice(Notice::SearchNotFound);
                    return;
                }
            },
            Err(err) => {
                log::warn!("search for {:?} failed: {}", query, err);
                self.state.push_notice(Notice::SearchFailed);
                return;
            }
        };

        if let Err(err) = self.show_search_hit(&hit) {
            log::warn!("search hit {:?} unusable: {}", hit, err);
            self.state.push_notice(Notice::SearchFailed);
        }
    }

    fn show_search_hit(&mut self, hit: &SearchResult) -> Result<()> {
        let position: LatLng = hit.lat_lng();
        let zoom = self.state.config().search.result_zoom;
        self.state.map.set_view(position, zoom)?;
        self.state
            .add_search_marker(position, hit.display_name.clone())?;
        Ok(())
    }

    fn apply_draw_event(&mut self, event: DrawEvent) -> Result<Outcome> {
        let group = self
            .state
            .shape_group_mut()
            .ok_or_else(|| MapError::Layer("shape collection missing".into()))?;
        match event {
            DrawEvent::Created(shape) => {
                let id = group.add_shape(shape);
                log::debug!("shape {} created", id);
            }
            DrawEvent::Edited(shapes) => {
                for edited in shapes {
                    match group.get_mut(&edited.id) {
                        Some(shape) => shape.geometry = edited.geometry,
                        None => log::debug!("edited shape {} not in collection", edited.id),
                    }
                }
            }
            DrawEvent::Deleted(ids) => {
                for id in ids {
                    if group.remove(&id).is_none() {
                        log::debug!("deleted shape {} not in collection", id);
                    }
                }
            }
        }
        Ok(Outcome::Done)
    }

    /// Fits the view, swallowing bounds errors
    fn fit_quietly(&mut self, bounds: Option<LatLngBounds>, padding: f64) {
        let result = match bounds {
            Some(bounds) => self.state.map.fit_bounds(&bounds, padding),
            None => Err(MapError::InvalidBounds("nothing to fit".into())),
        };
        if let Err(err) = result {
            log::debug!("fit skipped: {}", err);
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        for task in &self.tasks {
            if !task.is_finished() {
                task.cancel();
            }
        }
    }
}
