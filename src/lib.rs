//! geocache - cached, coalesced reverse geocoding
//!
//! Resolves latitude/longitude pairs to human-readable addresses. Results
//! are kept in a precision-keyed cache that survives restarts, and
//! concurrent requests for the same location share one provider call.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod geocode;
pub mod store;
pub mod ui;

pub use error::{GeocacheError, GeocacheResult};
