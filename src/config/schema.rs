//! Configuration schema for geocache
//!
//! Configuration is stored at `~/.config/geocache/config.toml`

use crate::geocode::google::DEFAULT_BASE_URL;
use crate::geocode::{CachePolicy, DEFAULT_PRECISION, MAX_PRECISION};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the Google Maps API key
pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

/// Environment variable overriding the cache file location
pub const CACHE_PATH_ENV: &str = "GEOCACHE_CACHE_PATH";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Reverse geocoding provider settings
    pub geocoder: GeocoderConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

impl Config {
    /// Apply environment variable overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = env_value(API_KEY_ENV) {
            self.geocoder.api_key = Some(key);
        }
        if let Some(path) = env_value(CACHE_PATH_ENV) {
            self.cache.path = Some(PathBuf::from(path));
        }
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                self.general.log_format
            ));
        }
        if self.geocoder.provider != "google" {
            return Err(format!(
                "geocoder.provider \"{}\" is not supported (supported: google)",
                self.geocoder.provider
            ));
        }
        if self.cache.precision > MAX_PRECISION {
            return Err(format!(
                "cache.precision must be at most {}, got {}",
                MAX_PRECISION, self.cache.precision
            ));
        }
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Reverse geocoding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Provider name (only "google" is supported)
    pub provider: String,

    /// API key (GOOGLE_MAPS_API_KEY takes precedence)
    pub api_key: Option<String>,

    /// Geocoding endpoint
    pub base_url: String,

    /// HTTP timeout per request in seconds
    pub request_timeout_secs: u64,

    /// Give up on a lookup after N seconds, failing every waiter (0 = disabled)
    pub lookup_timeout_secs: u64,
}

impl GeocoderConfig {
    pub fn lookup_timeout(&self) -> Option<Duration> {
        (self.lookup_timeout_secs > 0).then(|| Duration::from_secs(self.lookup_timeout_secs))
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 10,
            lookup_timeout_secs: 15,
        }
    }
}

/// Geocode cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache file location (default: data dir)
    pub path: Option<PathBuf>,

    /// Decimal places coordinates are rounded to before caching
    pub precision: u32,

    /// Treat entries older than N days as missing (0 = never)
    pub max_age_days: u32,

    /// Evict the oldest entries beyond N (0 = unbounded)
    pub max_entries: usize,

    /// Upper bound on the shutdown flush in seconds
    pub flush_timeout_secs: u64,
}

impl CacheConfig {
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            max_age: (self.max_age_days > 0)
                .then(|| chrono::Duration::days(i64::from(self.max_age_days))),
            max_entries: (self.max_entries > 0).then_some(self.max_entries),
        }
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            precision: DEFAULT_PRECISION,
            max_age_days: 0,
            max_entries: 0,
            flush_timeout_secs: 5,
        }
    }
}
