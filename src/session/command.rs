use crate::{
    core::{config::Locale, geo::LatLng},
    data::geojson::ExportFile,
    layers::tile::BaseLayerKind,
    plugins::draw::DrawEvent,
};
use std::path::PathBuf;

/// Everything a front-end can ask the session to do
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the attached base layer
    SwitchBase(BaseLayerKind),
    /// Load an image file as the overlay; `None` when the picker was dismissed
    SetImage(Option<PathBuf>),
    /// Opacity slider value, clamped to [0, 1]
    SetOpacity(f64),
    FitOverlay,
    ToggleHandles,
    RemoveOverlay,
    /// A corner drag reported by the overlay editor; index in TL, TR, BR, BL order
    MoveOverlayCorner { index: usize, position: LatLng },
    Draw(DrawEvent),
    ExportShapes,
    /// Import a GeoJSON file; `None` when the picker was dismissed
    ImportShapes(Option<PathBuf>),
    Search(String),
}

/// Kinds of background request the session tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    OverlayLoad,
    Import,
    Search,
}

/// Identifies one background request. Only the newest overlay load and the
/// newest search may change state when they complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub kind: RequestKind,
    pub generation: u64,
}

/// Immediate result of dispatching a command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// State changed synchronously
    Done,
    /// Nothing to do (missing input, no overlay, blank query)
    Ignored,
    /// Work continues in the background; completions arrive through `pump`
    Pending(Ticket),
    Exported(ExportFile),
}

/// User-visible failure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    ImportFailed,
    SearchNotFound,
    SearchFailed,
}

impl Notice {
    pub fn message(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Notice::ImportFailed, Locale::Ja) => "GeoJSONの読み込みに失敗しました",
            (Notice::ImportFailed, Locale::En) => "Failed to load GeoJSON",
            (Notice::SearchNotFound, Locale::Ja) => "見つかりませんでした",
            (Notice::SearchNotFound, Locale::En) => "No results found",
            (Notice::SearchFailed, Locale::Ja) => "検索に失敗しました",
            (Notice::SearchFailed, Locale::En) => "Search failed",
        }
    }
}
