//! Lookup error taxonomy

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single reverse-geocoding resolution.
///
/// Cloneable so that one outcome can be delivered to every caller
/// coalesced onto the same in-flight lookup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("Invalid coordinate: {reason}")]
    InvalidCoordinate { reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Geocoding failed: {status}")]
    Provider {
        status: String,
        message: Option<String>,
    },

    #[error("No address found for {lat}, {lng}")]
    NotFound { lat: f64, lng: f64 },

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Flat classification of errors, suitable for display state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidCoordinate,
    Network,
    Provider,
    NotFound,
    Timeout,
    Persistence,
}

impl GeocodeError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidCoordinate {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCoordinate { .. } => ErrorKind::InvalidCoordinate,
            Self::Network(_) => ErrorKind::Network,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Transient failures that are worth retrying by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}
