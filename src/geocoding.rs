//! Address search against a Nominatim-compatible geocoding service.

use crate::{core::config::SearchConfig, core::geo::LatLng, MapError, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT_LANGUAGE;
use serde::Deserialize;
use std::time::Duration;

/// One geocoded place
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub display_name: String,
    pub lat: f64,
    pub lon: f64,
}

impl SearchResult {
    pub fn lat_lng(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }
}

/// Resolves free text to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best matches first; an empty list means nothing was found
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

/// Nominatim returns coordinates as strings; some mirrors send numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Text(String),
    Number(f64),
}

impl Coordinate {
    fn value(&self, field: &str) -> Result<f64> {
        let value = match self {
            Coordinate::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                MapError::Geocoding(format!("{} is not a number: {:?}", field, text))
            })?,
            Coordinate::Number(n) => *n,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(MapError::Geocoding(format!("{} is not finite", field)))
        }
    }
}

#[derive(Deserialize)]
struct Place {
    lat: Coordinate,
    lon: Coordinate,
    #[serde(default)]
    display_name: String,
}

/// Parses a Nominatim `format=json` response body
pub fn parse_response(body: &str) -> Result<Vec<SearchResult>> {
    let places: Vec<Place> = serde_json::from_str(body)?;
    places
        .into_iter()
        .map(|place| {
            let result = SearchResult {
                lat: place.lat.value("lat")?,
                lon: place.lon.value("lon")?,
                display_name: place.display_name,
            };
            if !result.lat_lng().is_valid() {
                return Err(MapError::Geocoding(format!(
                    "coordinate out of range: {}, {}",
                    result.lat, result.lon
                )));
            }
            Ok(result)
        })
        .collect()
}

pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
    accept_language: String,
}

impl NominatimGeocoder {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            accept_language: config.accept_language.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        log::debug!("nominatim search {:?}", query);
        let body = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("addressdetails", "1"),
                ("limit", "1"),
            ])
            .header(ACCEPT_LANGUAGE, self.accept_language.as_str())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_response(&body)
    }
}
