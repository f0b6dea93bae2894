// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device-triggered sensor polling.
//!
//! A poll authenticates the device, fans out to the three sensors
//! concurrently and ingests the combined reading only if all three answered.

use crate::error::{AppError, Result};
use crate::models::CandidateReading;
use crate::services::ingest::{IngestOutcome, TelemetryIngestor};
use crate::services::sensors::SensorGateway;
use subtle::ConstantTimeEq;

/// Polls sensors on behalf of an authenticated device.
#[derive(Clone)]
pub struct PollOrchestrator {
    gateway: SensorGateway,
    ingestor: TelemetryIngestor,
    device_secret: String,
}

impl PollOrchestrator {
    pub fn new(gateway: SensorGateway, ingestor: TelemetryIngestor, device_secret: String) -> Self {
        Self {
            gateway,
            ingestor,
            device_secret,
        }
    }

    /// Exact, constant-time comparison against the configured secret. An
    /// empty secret authorizes nothing.
    fn is_authorized(&self, token: Option<&str>) -> bool {
        !self.device_secret.is_empty()
            && token.is_some_and(|t| bool::from(t.as_bytes().ct_eq(self.device_secret.as_bytes())))
    }

    /// Poll all sensors for `session_id` and ingest the result.
    ///
    /// No sensor is contacted unless `auth_token` matches. The first sensor
    /// to fail aborts the poll and nothing is stored.
    pub async fn poll(&self, session_id: u64, auth_token: Option<&str>) -> Result<IngestOutcome> {
        if !self.is_authorized(auth_token) {
            tracing::warn!(session_id, "Rejected poll with invalid device key");
            return Err(AppError::Unauthorized);
        }

        let (fix, battery, temperature) = tokio::try_join!(
            self.gateway.fetch_gps(),
            self.gateway.fetch_battery(),
            self.gateway.fetch_temperature(),
        )
        .inspect_err(|e| {
            tracing::warn!(session_id, sensor = %e.0, "Poll aborted, sensor unavailable");
        })?;

        tracing::debug!(
            session_id,
            lat = fix.lat,
            lon = fix.lon,
            battery,
            temperature,
            "Sensors polled"
        );

        self.ingestor
            .ingest(CandidateReading {
                session_id,
                lat: fix.lat,
                lon: fix.lon,
                battery,
                temperature,
            })
            .await
    }
}
