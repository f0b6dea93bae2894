// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: repository backends and the session store.

pub mod firestore;
pub mod memory;
pub mod repository;
pub mod session_store;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;
pub use repository::TelemetryRepository;
pub use session_store::{RecordedReading, SessionStore};

/// Collection names as constants.
pub mod collections {
    pub const RUNNERS: &str = "runners";
    pub const SESSIONS: &str = "sessions";
    pub const READINGS: &str = "readings";
    /// Sequential ID counters (keyed by collection name)
    pub const COUNTERS: &str = "counters";
}
