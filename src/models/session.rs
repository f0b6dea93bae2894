// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracking session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked activity belonging to a runner.
///
/// `total_distance` is only ever written by the ingestion path and never
/// decreases. It is kept at full precision; rounding happens at the API edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (also used as document ID)
    pub id: u64,
    /// Owning runner
    pub runner_id: u64,
    /// Accumulated great-circle distance in meters
    #[serde(default)]
    pub total_distance: f64,
    /// When tracking started
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// Start a fresh session with no distance accrued.
    pub fn new(id: u64, runner_id: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            runner_id,
            total_distance: 0.0,
            started_at,
        }
    }
}
