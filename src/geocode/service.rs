//! Public reverse-geocoding entry point
//!
//! Composes the cache, the coalescer and a provider, and exposes the
//! loading/error state that UI layers render.

use super::cache::GeocodeCache;
use super::coalesce::RequestCoalescer;
use super::error::GeocodeError;
use super::key::CoordinateKey;
use super::lookup::ReverseGeocoder;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Observable state of the service.
///
/// `loading` is true while at least one lookup is outstanding. `error`
/// holds the failure of the most recent lookup and is cleared when the
/// next lookup starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupState {
    pub loading: bool,
    pub error: Option<GeocodeError>,
}

/// Cached, coalesced reverse geocoding
pub struct GeocodingService {
    cache: Arc<GeocodeCache>,
    coalescer: RequestCoalescer,
    geocoder: Arc<dyn ReverseGeocoder>,
    state: watch::Sender<LookupState>,
    active: AtomicUsize,
}

impl GeocodingService {
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>, cache: Arc<GeocodeCache>) -> Self {
        Self {
            cache,
            coalescer: RequestCoalescer::new(),
            geocoder,
            state: watch::Sender::new(LookupState::default()),
            active: AtomicUsize::new(0),
        }
    }

    /// Fail lookups that take longer than `timeout`
    pub fn with_lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.coalescer = RequestCoalescer::with_timeout(timeout);
        self
    }

    /// Resolve a coordinate pair to an address.
    ///
    /// Coordinates are validated before anything else happens, so an
    /// invalid pair never reaches the cache or the provider. Successful
    /// lookups are written through to the cache; failures are not cached.
    pub fn resolve(
        &self,
        lat: impl Into<Option<f64>>,
        lng: impl Into<Option<f64>>,
    ) -> impl Future<Output = Result<String, GeocodeError>> + Send + '_ {
        let key = CoordinateKey::with_precision(lat, lng, self.cache.precision());
        async move { self.resolve_key(key?).await }
    }

    /// Resolve an already validated key
    pub async fn resolve_key(&self, key: CoordinateKey) -> Result<String, GeocodeError> {
        if let Some(address) = self.cache.get(&key) {
            debug!("Cache hit for {}", key);
            return Ok(address);
        }
        debug!("Cache miss for {}", key);

        let _loading = LoadingGuard::acquire(self);

        let cache = Arc::clone(&self.cache);
        let geocoder = Arc::clone(&self.geocoder);
        let result = self
            .coalescer
            .resolve(key, move |key| async move {
                let address = geocoder.reverse_geocode(key.lat(), key.lng()).await?;
                // Written before the in-flight entry is released, so no
                // caller can observe neither a cached nor a pending result
                cache.put(key, address.clone());
                Ok(address)
            })
            .await;

        if let Err(ref e) = result {
            warn!("Reverse geocoding {} failed: {}", key, e);
            self.state.send_modify(|s| s.error = Some(e.clone()));
        }
        result
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn last_error(&self) -> Option<GeocodeError> {
        self.state.borrow().error.clone()
    }

    /// Watch loading/error transitions
    pub fn subscribe(&self) -> watch::Receiver<LookupState> {
        self.state.subscribe()
    }

    pub fn cache(&self) -> &Arc<GeocodeCache> {
        &self.cache
    }

    pub fn coalescer(&self) -> &RequestCoalescer {
        &self.coalescer
    }

    pub fn provider(&self) -> &'static str {
        self.geocoder.name()
    }
}

/// Holds `loading` true for as long as any lookup is outstanding.
///
/// Counter updates happen inside `send_modify`, which serializes them
/// with the state change.
struct LoadingGuard<'a> {
    service: &'a GeocodingService,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(service: &'a GeocodingService) -> Self {
        service.state.send_modify(|s| {
            service.active.fetch_add(1, Ordering::SeqCst);
            s.loading = true;
            s.error = None;
        });
        Self { service }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let service = self.service;
        service.state.send_modify(|s| {
            if service.active.fetch_sub(1, Ordering::SeqCst) == 1 {
                s.loading = false;
            }
        });
    }
}
