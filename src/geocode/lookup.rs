//! Reverse geocoding provider abstraction
//!
//! The service only needs `lat, lng -> address`. Providers implement this
//! trait; tests plug in counting fakes.

use super::error::GeocodeError;
use async_trait::async_trait;
use std::sync::Arc;

/// A provider that converts coordinates into a human-readable address
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Resolve a coordinate pair to a formatted address.
    ///
    /// Fails with `Network`, `Provider` or `NotFound`.
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<String, GeocodeError>;

    /// Provider name for display and logging
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: ReverseGeocoder + ?Sized> ReverseGeocoder for Arc<T> {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<String, GeocodeError> {
        (**self).reverse_geocode(lat, lng).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
