// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Telemetry reading models.

use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};

/// A persisted telemetry sample. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Reading ID, allocated in insertion order
    pub id: u64,
    /// Owning session
    pub session_id: u64,
    /// Degrees, [-90, 90]
    pub latitude: f64,
    /// Degrees, [-180, 180]
    pub longitude: f64,
    /// Percent, [0, 100]
    pub battery: f64,
    /// Celsius, [-40, 60]
    pub temperature: f64,
    /// When the reading was accepted
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Position as a `geo` point (x = longitude, y = latitude).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// An unvalidated reading as submitted by a client or assembled from sensors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateReading {
    pub session_id: u64,
    pub lat: f64,
    pub lon: f64,
    pub battery: f64,
    pub temperature: f64,
}
