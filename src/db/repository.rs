// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage interface shared by the Firestore and in-memory backends.

use crate::error::AppError;
use crate::models::{NewRunner, Reading, Runner, Session};
use crate::services::validation::ValidatedReading;
use async_trait::async_trait;

/// Minimal repository over runners, sessions and readings.
///
/// Backends report failures as [`AppError::StorageUnavailable`]. Lookups of
/// missing records return `Ok(None)`; translating that into a not-found error
/// is the caller's job.
#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;

    async fn insert_runner(&self, runner: NewRunner) -> Result<Runner, AppError>;

    async fn get_runner(&self, runner_id: u64) -> Result<Option<Runner>, AppError>;

    async fn insert_session(&self, runner_id: u64) -> Result<Session, AppError>;

    async fn get_session(&self, session_id: u64) -> Result<Option<Session>, AppError>;

    async fn sessions_for_runner(&self, runner_id: u64) -> Result<Vec<Session>, AppError>;

    /// Most recently inserted reading of a session.
    async fn last_reading(&self, session_id: u64) -> Result<Option<Reading>, AppError>;

    /// All readings of a session in insertion order.
    async fn readings_for_session(&self, session_id: u64) -> Result<Vec<Reading>, AppError>;

    /// Insert a reading and add `distance` to the session total as one
    /// atomic write. Returns the stored reading and the new total, or
    /// `Ok(None)` if the session does not exist.
    ///
    /// Callers must serialize calls per session; the backend only guarantees
    /// that the two writes land together.
    async fn append_reading(
        &self,
        reading: &ValidatedReading,
        distance: f64,
    ) -> Result<Option<(Reading, f64)>, AppError>;
}
