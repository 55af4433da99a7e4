//! Scriptable geocoder for tests

use super::error::GeocodeError;
use super::lookup::ReverseGeocoder;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

/// Counts calls, optionally holds each call until released, and replies
/// with a fixed outcome (or a formatted address when none is set).
#[derive(Default)]
pub(crate) struct FakeGeocoder {
    calls: AtomicUsize,
    gated: AtomicBool,
    gate: Notify,
    outcome: Mutex<Option<Result<String, GeocodeError>>>,
}

impl FakeGeocoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(error: GeocodeError) -> Self {
        let fake = Self::new();
        fake.set_outcome(Err(error));
        fake
    }

    /// Hold every call until [`FakeGeocoder::release`]
    pub(crate) fn gated() -> Self {
        let fake = Self::new();
        fake.gated.store(true, Ordering::SeqCst);
        fake
    }

    pub(crate) fn set_outcome(&self, outcome: Result<String, GeocodeError>) {
        *self.outcome.lock().unwrap() = Some(outcome);
    }

    pub(crate) fn release(&self) {
        self.gate.notify_one();
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl ReverseGeocoder for FakeGeocoder {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<String, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.gated.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        let outcome = self.outcome.lock().unwrap().clone();
        outcome.unwrap_or_else(|| Ok(format!("Address near {:.5},{:.5}", lat, lng)))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
