//! Google Maps Geocoding API backend

use super::error::GeocodeError;
use super::lookup::ReverseGeocoder;
use crate::config::schema::GeocoderConfig;
use crate::error::{GeocacheError, GeocacheResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Public Google reverse-geocoding endpoint
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reverse geocoder that calls the Google Geocoding HTTP API
#[derive(Clone)]
pub struct GoogleGeocoder {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            agent: build_agent(DEFAULT_REQUEST_TIMEOUT),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Build from configuration; the API key must be present
    pub fn from_config(config: &GeocoderConfig) -> GeocacheResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(GeocacheError::MissingApiKey)?;

        Ok(Self::new(api_key)
            .with_base_url(&config.base_url)
            .with_timeout(Duration::from_secs(config.request_timeout_secs)))
    }

    /// Point at a different endpoint (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overall HTTP timeout per request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    fn fetch(&self, lat: f64, lng: f64) -> Result<String, GeocodeError> {
        let mut response = self
            .agent
            .get(&self.base_url)
            .query("latlng", format!("{},{}", lat, lng))
            .query("key", &self.api_key)
            .call()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Network(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        parse_response(lat, lng, &body)
    }
}

#[async_trait]
impl ReverseGeocoder for GoogleGeocoder {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<String, GeocodeError> {
        debug!("Requesting reverse geocode for {},{}", lat, lng);

        // ureq is blocking
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.fetch(lat, lng))
            .await
            .map_err(|e| GeocodeError::Network(format!("lookup task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

/// Interpret a Geocoding API response body
pub(crate) fn parse_response(lat: f64, lng: f64, body: &str) -> Result<String, GeocodeError> {
    let data: GeocodeResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::Provider {
            status: "INVALID_RESPONSE".to_string(),
            message: Some(e.to_string()),
        })?;

    match data.status.as_str() {
        "OK" => data
            .results
            .into_iter()
            .next()
            .map(|r| r.formatted_address)
            .ok_or(GeocodeError::NotFound { lat, lng }),
        "ZERO_RESULTS" => Err(GeocodeError::NotFound { lat, lng }),
        _ => Err(GeocodeError::Provider {
            status: data.status,
            message: data.error_message,
        }),
    }
}
