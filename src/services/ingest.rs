// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Telemetry ingestion.
//!
//! Handles the core workflow:
//! 1. Validate the candidate reading
//! 2. Resolve the session
//! 3. Atomically store the reading and accrue distance
//! 4. Publish the reading for live consumers (best-effort)

use crate::db::{RecordedReading, SessionStore};
use crate::error::Result;
use crate::models::CandidateReading;
use crate::services::publisher::{session_topic, PublishError, Publisher, TelemetryMessage};
use crate::services::validation::validate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Round to 2 decimal places for reporting.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Result of an accepted reading, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct IngestOutcome {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub measurement_id: u64,
    /// Rounded to 2 decimals
    pub distance_added_m: f64,
    /// Rounded to 2 decimals
    pub total_distance_m: f64,
}

impl From<&RecordedReading> for IngestOutcome {
    fn from(recorded: &RecordedReading) -> Self {
        Self {
            measurement_id: recorded.reading.id,
            distance_added_m: round2(recorded.distance_added),
            total_distance_m: round2(recorded.total_distance),
        }
    }
}

/// Validates, stores and republishes readings.
#[derive(Clone)]
pub struct TelemetryIngestor {
    store: SessionStore,
    publisher: Arc<dyn Publisher>,
    publish_timeout: Duration,
}

impl TelemetryIngestor {
    pub fn new(store: SessionStore, publisher: Arc<dyn Publisher>, publish_timeout: Duration) -> Self {
        Self {
            store,
            publisher,
            publish_timeout,
        }
    }

    /// Ingest one candidate reading.
    ///
    /// Fails with a validation error before touching storage, or with
    /// `SessionNotFound` if the session does not exist. Publishing happens in
    /// the background; its failures are logged and never fail the call.
    pub async fn ingest(&self, candidate: CandidateReading) -> Result<IngestOutcome> {
        let reading = validate(&candidate).inspect_err(|e| {
            tracing::info!(
                session_id = candidate.session_id,
                field = %e.field,
                "Rejected reading"
            );
        })?;

        let session = self.store.get_session(reading.session_id()).await?;
        let recorded = self.store.record_reading(&reading).await?;

        tracing::info!(
            session_id = session.id,
            runner_id = session.runner_id,
            reading_id = recorded.reading.id,
            distance_added_m = recorded.distance_added,
            total_distance_m = recorded.total_distance,
            "Reading accepted"
        );

        let outcome = IngestOutcome::from(&recorded);
        self.spawn_publish(&recorded);
        Ok(outcome)
    }

    /// Hand the reading to the publisher on a background task.
    ///
    /// The request never waits on the broker; a slow or hung publisher is
    /// cut off by `publish_timeout` inside the task.
    fn spawn_publish(&self, recorded: &RecordedReading) {
        let topic = session_topic(recorded.reading.session_id);
        let message = TelemetryMessage {
            lat: recorded.reading.latitude,
            lon: recorded.reading.longitude,
            battery: recorded.reading.battery,
            temperature: recorded.reading.temperature,
            total_distance: round2(recorded.total_distance),
        };
        let reading_id = recorded.reading.id;
        let publisher = self.publisher.clone();
        let publish_timeout = self.publish_timeout;

        tokio::spawn(async move {
            let result =
                match tokio::time::timeout(publish_timeout, publisher.publish(&topic, &message))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(PublishError::Timeout),
                };

            if let Err(e) = result {
                tracing::warn!(
                    topic = %topic,
                    reading_id,
                    error = %e,
                    "Failed to publish reading"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(44.478_2), 44.48);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(123.454), 123.45);
    }
}
