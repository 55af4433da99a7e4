//! Application lifecycle: load the cache at startup, flush it at shutdown
//!
//! Shutdown persistence is best-effort. If the host kills the process
//! right after signalling shutdown, the flush may not complete and the
//! entries resolved since the last flush are lost; they are fetched again
//! on demand.

use crate::config::{Config, ConfigManager};
use crate::error::GeocacheResult;
use crate::geocode::{GeocodeCache, GeocodingService, GoogleGeocoder, ReverseGeocoder};
use crate::store::{BlobStore, FileBlobStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// A geocoding service wired to its persistent store
pub struct App {
    service: Arc<GeocodingService>,
    store: Arc<dyn BlobStore>,
    flush_timeout: Duration,
}

impl App {
    pub fn new(service: Arc<GeocodingService>, store: Arc<dyn BlobStore>) -> Self {
        Self {
            service,
            store,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }

    /// Build the production wiring: Google provider and file-backed cache
    pub fn from_config(config: &Config) -> GeocacheResult<Self> {
        let geocoder: Arc<dyn ReverseGeocoder> =
            Arc::new(GoogleGeocoder::from_config(&config.geocoder)?);
        let cache = Arc::new(GeocodeCache::new(
            config.cache.precision,
            config.cache.policy(),
        ));
        let service = GeocodingService::new(geocoder, cache)
            .with_lookup_timeout(config.geocoder.lookup_timeout());
        let store = FileBlobStore::new(ConfigManager::cache_path(config));

        Ok(Self::new(Arc::new(service), Arc::new(store))
            .with_flush_timeout(config.cache.flush_timeout()))
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// Load the persisted cache. Never fatal; returns entries loaded.
    pub async fn initialize(&self) -> usize {
        self.service.cache().load(self.store.as_ref()).await
    }

    /// Persist the cache, giving up after the flush timeout.
    pub async fn shutdown_flush(&self) -> bool {
        let flush = self.service.cache().flush(self.store.as_ref());
        match tokio::time::timeout(self.flush_timeout, flush).await {
            Ok(saved) => saved,
            Err(_) => {
                warn!(
                    "Geocode cache flush did not finish within {:?}",
                    self.flush_timeout
                );
                false
            }
        }
    }

    pub fn service(&self) -> &Arc<GeocodingService> {
        &self.service
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }
}

/// Wait for Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received interrupt, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeocacheError;
    use crate::geocode::fake::FakeGeocoder;
    use crate::geocode::CachePolicy;
    use crate::store::MemoryBlobStore;
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl BlobStore for BrokenStore {
        async fn load(&self) -> GeocacheResult<Option<Vec<u8>>> {
            Err(GeocacheError::persistence("reading", "disk on fire"))
        }

        async fn save(&self, _blob: &[u8]) -> GeocacheResult<()> {
            Err(GeocacheError::persistence("writing", "disk on fire"))
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    struct StalledStore;

    #[async_trait]
    impl BlobStore for StalledStore {
        async fn load(&self) -> GeocacheResult<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn save(&self, _blob: &[u8]) -> GeocacheResult<()> {
            std::future::pending().await
        }

        fn describe(&self) -> String {
            "stalled".to_string()
        }
    }

    fn app(fake: &Arc<FakeGeocoder>, store: Arc<dyn BlobStore>) -> App {
        let geocoder: Arc<dyn ReverseGeocoder> = Arc::clone(fake) as Arc<dyn ReverseGeocoder>;
        let cache = Arc::new(GeocodeCache::new(5, CachePolicy::unbounded()));
        App::new(Arc::new(GeocodingService::new(geocoder, cache)), store)
    }

    #[tokio::test]
    async fn cache_survives_restart() {
        let store = Arc::new(MemoryBlobStore::new());
        let fake = Arc::new(FakeGeocoder::new());

        let first = app(&fake, store.clone());
        assert_eq!(first.initialize().await, 0);
        let address = first.service().resolve(52.5200, 13.4050).await.unwrap();
        assert!(first.shutdown_flush().await);

        let second = app(&fake, store);
        assert_eq!(second.initialize().await, 1);
        assert_eq!(
            second.service().resolve(52.5200, 13.4050).await.unwrap(),
            address
        );
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn persistence_failures_are_not_fatal() {
        let fake = Arc::new(FakeGeocoder::new());
        let app = app(&fake, Arc::new(BrokenStore));

        assert_eq!(app.initialize().await, 0);
        app.service().resolve(1.0, 1.0).await.unwrap();
        assert!(!app.shutdown_flush().await);
        assert_eq!(app.service().cache().len(), 1);
    }

    #[tokio::test]
    async fn flush_is_bounded_by_timeout() {
        let fake = Arc::new(FakeGeocoder::new());
        let app =
            app(&fake, Arc::new(StalledStore)).with_flush_timeout(Duration::from_millis(20));

        assert!(!app.shutdown_flush().await);
    }

    #[test]
    fn from_config_requires_api_key() {
        let mut config = Config::default();
        config.geocoder.api_key = None;
        assert!(matches!(
            App::from_config(&config),
            Err(GeocacheError::MissingApiKey)
        ));
    }
}
