//! Request coalescing for concurrent lookups
//!
//! At most one lookup is in flight per coordinate key. Callers arriving
//! while a lookup is running attach to it and receive the same outcome.
//!
//! # Lifecycle of an in-flight request
//!
//! | Event | Registry |
//! |-------|----------|
//! | First caller for a key | entry created, lookup dispatched |
//! | Further callers | waiter count incremented |
//! | Lookup settles (ok, error or timeout) | entry removed before waiters are woken |
//! | Every waiter dropped before settling | entry removed, lookup abandoned |

use super::error::GeocodeError;
use super::key::CoordinateKey;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

type SharedLookup = Shared<BoxFuture<'static, Result<String, GeocodeError>>>;

type Registry = Arc<Mutex<HashMap<CoordinateKey, InFlightRequest>>>;

struct InFlightRequest {
    /// Distinguishes successive requests for the same key
    id: u64,
    handle: SharedLookup,
    waiters: usize,
}

/// Deduplicates concurrent lookups for the same key
pub struct RequestCoalescer {
    inflight: Registry,
    next_id: AtomicU64,
    timeout: Option<Duration>,
}

impl RequestCoalescer {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Fail every waiter of a lookup that has not settled within `timeout`
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            timeout,
        }
    }

    /// Number of keys with a lookup currently in flight
    pub fn in_flight(&self) -> usize {
        lock(&self.inflight).len()
    }

    /// Callers currently attached to the lookup for `key`
    pub fn waiters(&self, key: &CoordinateKey) -> usize {
        lock(&self.inflight).get(key).map_or(0, |r| r.waiters)
    }

    /// Resolve `key`, invoking `lookup` only if no lookup for it is in flight.
    ///
    /// Every caller attached to the same lookup receives an identical
    /// result. Failures are not remembered: once a lookup settles, the next
    /// call for the key dispatches a new one.
    pub async fn resolve<F, Fut>(
        &self,
        key: CoordinateKey,
        lookup: F,
    ) -> Result<String, GeocodeError>
    where
        F: FnOnce(CoordinateKey) -> Fut,
        Fut: Future<Output = Result<String, GeocodeError>> + Send + 'static,
    {
        let (handle, _waiter) = {
            let mut inflight = lock(&self.inflight);
            let (id, handle) = match inflight.entry(key) {
                Entry::Occupied(mut occupied) => {
                    let request = occupied.get_mut();
                    request.waiters += 1;
                    debug!(
                        "Joining in-flight lookup for {} ({} waiters)",
                        key, request.waiters
                    );
                    (request.id, request.handle.clone())
                }
                Entry::Vacant(vacant) => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let handle = self.dispatch(key, id, lookup(key));
                    vacant.insert(InFlightRequest {
                        id,
                        handle: handle.clone(),
                        waiters: 1,
                    });
                    debug!("Dispatched lookup for {}", key);
                    (id, handle)
                }
            };
            let waiter = Waiter {
                registry: Arc::clone(&self.inflight),
                key,
                id,
            };
            (handle, waiter)
        };

        handle.await
    }

    fn dispatch<Fut>(&self, key: CoordinateKey, id: u64, lookup: Fut) -> SharedLookup
    where
        Fut: Future<Output = Result<String, GeocodeError>> + Send + 'static,
    {
        let registry = Arc::clone(&self.inflight);
        let timeout = self.timeout;

        async move {
            let outcome = match timeout {
                Some(limit) => tokio::time::timeout(limit, lookup)
                    .await
                    .unwrap_or(Err(GeocodeError::Timeout(limit))),
                None => lookup.await,
            };

            let mut inflight = lock(&registry);
            if inflight.get(&key).is_some_and(|r| r.id == id) {
                inflight.remove(&key);
            }
            outcome
        }
        .boxed()
        .shared()
    }
}

impl Default for RequestCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases one waiter reference when a caller finishes or is cancelled
struct Waiter {
    registry: Registry,
    key: CoordinateKey,
    id: u64,
}

impl Drop for Waiter {
    fn drop(&mut self) {
        let mut inflight = lock(&self.registry);
        if let Entry::Occupied(mut occupied) = inflight.entry(self.key) {
            if occupied.get().id != self.id {
                return;
            }
            let request = occupied.get_mut();
            request.waiters = request.waiters.saturating_sub(1);
            if request.waiters == 0 {
                occupied.remove();
                debug!("Abandoned lookup for {} (no waiters left)", self.key);
            }
        }
    }
}

fn lock(
    registry: &Mutex<HashMap<CoordinateKey, InFlightRequest>>,
) -> MutexGuard<'_, HashMap<CoordinateKey, InFlightRequest>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
