//! Reverse geocoding with caching and request coalescing
//!
//! `GeocodingService::resolve` validates the coordinate, answers from the
//! [`GeocodeCache`] when it can, and otherwise funnels the lookup through
//! the [`RequestCoalescer`] so that concurrent callers for the same
//! location share a single provider call.
//!
//! # Cache keys
//!
//! Coordinates are rounded to a fixed number of decimal places
//! ([`DEFAULT_PRECISION`] = 5, about one metre). Inputs that differ only
//! beyond that precision resolve to the same cache entry.
//!
//! # Persistence
//!
//! The cache is loaded once at startup and flushed once at shutdown via a
//! [`BlobStore`](crate::store::BlobStore). Both are best-effort: failures
//! are logged and never abort the application. A flush triggered while the
//! process is being torn down may not complete.

pub mod cache;
pub mod coalesce;
pub mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod google;
pub mod key;
pub mod lookup;
pub mod service;

pub use cache::{CacheEntry, CachePolicy, GeocodeCache};
pub use coalesce::RequestCoalescer;
pub use error::{ErrorKind, GeocodeError};
pub use google::GoogleGeocoder;
pub use key::{CoordinateKey, DEFAULT_PRECISION, MAX_PRECISION};
pub use lookup::ReverseGeocoder;
pub use service::{GeocodingService, LookupState};
