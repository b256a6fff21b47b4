#![allow(dead_code)]

use async_trait::async_trait;
use mapsketch::{
    runtime::TokioSpawner, Geocoder, MapError, SearchResult, SessionConfig, SessionController,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// 1x1 RGBA PNG
pub const PNG_1X1: [u8; 67] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Geocoder with canned answers that counts how often it is asked.
/// Unknown queries find nothing; "boom" fails like a dead network.
#[derive(Default)]
pub struct FakeGeocoder {
    pub requests: AtomicUsize,
    answers: HashMap<String, SearchResult>,
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, query: &str, display_name: &str, lat: f64, lon: f64) -> Self {
        self.answers.insert(
            query.to_string(),
            SearchResult {
                display_name: display_name.to_string(),
                lat,
                lon,
            },
        );
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn search(&self, query: &str) -> mapsketch::Result<Vec<SearchResult>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if query == "boom" {
            return Err(MapError::Geocoding("connection reset".into()));
        }
        Ok(self.answers.get(query).cloned().into_iter().collect())
    }
}

pub fn fujieda_geocoder() -> Arc<FakeGeocoder> {
    Arc::new(
        FakeGeocoder::new()
            .answer("藤枝市役所", "Fujieda City Hall", 34.8679, 138.2667)
            .answer("静岡駅", "Shizuoka Station", 34.9719, 138.3890),
    )
}

/// Controller on the current tokio runtime with the given geocoder
pub fn controller_with(geocoder: Arc<FakeGeocoder>) -> SessionController {
    let spawner = TokioSpawner::current().expect("tests run inside a tokio runtime");
    SessionController::new(SessionConfig::default(), Arc::new(spawner), geocoder)
        .expect("default config is valid")
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write test fixture");
    path
}
