//! Error types for geocache
//!
//! Application-level code uses `GeocacheResult<T>` as its return type.
//! Lookup failures that are shared between coalesced callers use
//! [`GeocodeError`](crate::geocode::GeocodeError) instead, which is `Clone`.

use crate::geocode::{ErrorKind, GeocodeError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for geocache operations
pub type GeocacheResult<T> = Result<T, GeocacheError>;

/// All errors that can occur in geocache
#[derive(Error, Debug)]
pub enum GeocacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No geocoding API key configured")]
    MissingApiKey,

    // Geocoding errors
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    // Persistence errors
    #[error("Cache persistence failed while {context}: {reason}")]
    Persistence { context: String, reason: String },

    #[error("Unsupported cache format version {found} (expected {expected})")]
    CacheVersion { found: u32, expected: u32 },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl GeocacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a persistence error with context
    pub fn persistence(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Persistence {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Geocode(e) => e.is_retryable(),
            Self::Persistence { .. } => true,
            _ => false,
        }
    }

    /// Classification shared with lookup failures, if the error has one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Geocode(e) => Some(e.kind()),
            Self::Persistence { .. } | Self::CacheVersion { .. } => Some(ErrorKind::Persistence),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingApiKey => {
                Some("Set GOOGLE_MAPS_API_KEY or run: geocache config set geocoder.api_key <KEY>")
            }
            Self::ConfigInvalid { .. } => Some("Run: geocache config init --force"),
            Self::CacheVersion { .. } => Some("Run: geocache cache clear --yes"),
            Self::Geocode(GeocodeError::InvalidCoordinate { .. }) => {
                Some("Latitude must be within [-90, 90] and longitude within [-180, 180]")
            }
            Self::Geocode(GeocodeError::Timeout(_)) => {
                Some("Increase geocoder.lookup_timeout_secs or retry later")
            }
            e if e.is_retryable() => Some("The failure may be transient; run the command again"),
            _ => None,
        }
    }
}
