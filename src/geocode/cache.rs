//! In-memory geocode cache with blob persistence

use super::key::{CoordinateKey, DEFAULT_PRECISION};
use crate::error::{GeocacheError, GeocacheResult};
use crate::store::BlobStore;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Version of the persisted blob layout
pub const FORMAT_VERSION: u32 = 1;

/// A resolved address for one coordinate key
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CoordinateKey,
    pub address: String,
    pub resolved_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_stale(&self, max_age: Option<Duration>, now: DateTime<Utc>) -> bool {
        max_age.is_some_and(|age| now - self.resolved_at > age)
    }
}

/// Bounds applied to the cache. Unbounded unless configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Entries older than this are treated as absent by `get`
    pub max_age: Option<Duration>,

    /// Oldest entries are evicted by `put` once this many are held
    pub max_entries: Option<usize>,
}

impl CachePolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedCache {
    version: u32,
    precision: u32,
    entries: Vec<PersistedEntry>,
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    lat: f64,
    lng: f64,
    address: String,
    resolved_at: DateTime<Utc>,
}

/// Process-wide mapping from coordinate key to resolved address.
///
/// Keys passed in must be built at [`GeocodeCache::precision`]. Persisted
/// entries are re-keyed on restore, so changing the precision keeps the
/// cache usable.
#[derive(Debug)]
pub struct GeocodeCache {
    entries: RwLock<HashMap<CoordinateKey, CacheEntry>>,
    precision: u32,
    policy: CachePolicy,
}

impl GeocodeCache {
    pub fn new(precision: u32, policy: CachePolicy) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            precision,
            policy,
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Look up the address for `key`; stale entries read as absent
    pub fn get(&self, key: &CoordinateKey) -> Option<String> {
        self.get_entry(key).map(|entry| entry.address)
    }

    pub fn get_entry(&self, key: &CoordinateKey) -> Option<CacheEntry> {
        let entries = self.read();
        let entry = entries.get(key)?;
        if entry.is_stale(self.policy.max_age, Utc::now()) {
            debug!("Cache entry for {} is stale", key);
            return None;
        }
        Some(entry.clone())
    }

    /// Insert or overwrite the address for `key`, stamped with the current time
    pub fn put(&self, key: CoordinateKey, address: impl Into<String>) {
        self.insert(CacheEntry {
            key,
            address: address.into(),
            resolved_at: Utc::now(),
        });
    }

    /// Insert `entry`, evicting the oldest entries beyond `max_entries`.
    /// Returns false when the entry itself was the oldest and got evicted.
    fn insert(&self, entry: CacheEntry) -> bool {
        let mut entries = self.write();
        let key = entry.key;
        entries.insert(key, entry);

        if let Some(max) = self.policy.max_entries {
            while entries.len() > max {
                // Ties go against the older residents, never the entry just put
                let oldest = entries
                    .values()
                    .min_by_key(|e| (e.resolved_at, e.key == key))
                    .map(|e| e.key);
                let Some(oldest) = oldest else { break };
                entries.remove(&oldest);
                debug!("Evicted cache entry {}", oldest);
            }
        }
        entries.contains_key(&key)
    }

    pub fn remove(&self, key: &CoordinateKey) -> Option<CacheEntry> {
        self.write().remove(key)
    }

    /// Drop every entry, returning how many were held
    pub fn clear(&self) -> usize {
        let mut entries = self.write();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of all entries, newest first
    pub fn entries(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self.read().values().cloned().collect();
        entries.sort_by(|a, b| b.resolved_at.cmp(&a.resolved_at));
        entries
    }

    /// Serialize the current entries. Does not modify the cache.
    pub fn persist(&self) -> GeocacheResult<Vec<u8>> {
        let doc = PersistedCache {
            version: FORMAT_VERSION,
            precision: self.precision,
            entries: self
                .entries()
                .into_iter()
                .map(|e| PersistedEntry {
                    lat: e.key.lat(),
                    lng: e.key.lng(),
                    address: e.address,
                    resolved_at: e.resolved_at,
                })
                .collect(),
        };
        Ok(serde_json::to_vec_pretty(&doc)?)
    }

    /// Merge entries from a persisted blob, returning how many are now held.
    ///
    /// Entries already held in memory win when they are newer. Stale and
    /// out-of-range entries are skipped.
    pub fn restore(&self, blob: &[u8]) -> GeocacheResult<usize> {
        let doc: PersistedCache = serde_json::from_slice(blob)?;
        if doc.version != FORMAT_VERSION {
            return Err(GeocacheError::CacheVersion {
                found: doc.version,
                expected: FORMAT_VERSION,
            });
        }
        if doc.precision != self.precision {
            info!(
                "Re-keying persisted cache from precision {} to {}",
                doc.precision, self.precision
            );
        }

        let now = Utc::now();
        let mut restored = HashSet::new();
        for persisted in doc.entries {
            let key =
                match CoordinateKey::with_precision(persisted.lat, persisted.lng, self.precision) {
                    Ok(key) => key,
                    Err(e) => {
                        warn!("Skipping persisted cache entry: {}", e);
                        continue;
                    }
                };
            let entry = CacheEntry {
                key,
                address: persisted.address,
                resolved_at: persisted.resolved_at,
            };
            if entry.is_stale(self.policy.max_age, now) {
                continue;
            }
            if self
                .read()
                .get(&key)
                .is_some_and(|held| held.resolved_at >= entry.resolved_at)
            {
                continue;
            }
            if self.insert(entry) {
                restored.insert(key);
            }
        }

        // Later inserts may have evicted earlier ones
        let entries = self.read();
        Ok(restored.iter().filter(|key| entries.contains_key(key)).count())
    }

    /// Load persisted entries from `store`.
    ///
    /// Never fails: a missing or malformed blob leaves the cache as it was
    /// and is reported as a warning, since a cold cache is a valid state.
    pub async fn load(&self, store: &dyn BlobStore) -> usize {
        let blob = match store.load().await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!("No persisted geocode cache in {}", store.describe());
                return 0;
            }
            Err(e) => {
                warn!(kind = ?e.kind(), "Failed to read geocode cache, starting cold: {}", e);
                return 0;
            }
        };

        match self.restore(&blob) {
            Ok(count) => {
                info!("Loaded {} geocode cache entries from {}", count, store.describe());
                count
            }
            Err(e) => {
                warn!(
                    kind = ?e.kind(),
                    "Ignoring malformed geocode cache in {}: {}",
                    store.describe(),
                    e
                );
                0
            }
        }
    }

    /// Persist the cache to `store`, best-effort. Returns whether it was saved.
    pub async fn flush(&self, store: &dyn BlobStore) -> bool {
        let result = match self.persist() {
            Ok(blob) => store.save(&blob).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("Persisted {} geocode cache entries to {}", self.len(), store.describe());
                true
            }
            Err(e) => {
                warn!(kind = ?e.kind(), "Failed to persist geocode cache: {}", e);
                false
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<CoordinateKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CoordinateKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for GeocodeCache {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION, CachePolicy::unbounded())
    }
}
