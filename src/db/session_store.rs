// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: persistence entry point for runners, sessions and readings.
//!
//! Wraps a [`TelemetryRepository`] with:
//! - Not-found translation for the HTTP layer
//! - A timeout on every storage call
//! - Per-session locking so distance accrual is linearized per session

use crate::db::repository::TelemetryRepository;
use crate::error::{AppError, Result};
use crate::models::{NewRunner, Reading, Runner, Session};
use crate::services::geodesic::distance_between;
use crate::services::validation::ValidatedReading;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Per-session mutexes serializing `record_reading`.
pub type SessionLocks = Arc<DashMap<u64, Arc<Mutex<()>>>>;

/// Outcome of an accepted reading.
#[derive(Debug, Clone)]
pub struct RecordedReading {
    pub reading: Reading,
    /// Distance from the previous reading in meters (0 for the first)
    pub distance_added: f64,
    /// Session total after this reading, full precision
    pub total_distance: f64,
}

/// Session-scoped storage operations.
#[derive(Clone)]
pub struct SessionStore {
    repo: Arc<dyn TelemetryRepository>,
    locks: SessionLocks,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(repo: Arc<dyn TelemetryRepository>, timeout: Duration) -> Self {
        Self {
            repo,
            locks: Arc::new(DashMap::new()),
            timeout,
        }
    }

    /// Run a storage operation under the configured timeout.
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    op,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Storage operation timed out"
                );
                Err(AppError::StorageUnavailable(format!("{} timed out", op)))
            }
        }
    }

    /// Check that the backend is reachable.
    pub async fn ping(&self) -> Result<()> {
        self.bounded("ping", self.repo.ping()).await
    }

    // ─── Runners ─────────────────────────────────────────────────

    /// Register a new runner.
    pub async fn register_runner(&self, name: String, email: String) -> Result<Runner> {
        let runner = self
            .bounded(
                "insert_runner",
                self.repo.insert_runner(NewRunner { name, email }),
            )
            .await?;
        tracing::info!(runner_id = runner.id, "Runner registered");
        Ok(runner)
    }

    pub async fn get_runner(&self, runner_id: u64) -> Result<Runner> {
        self.bounded("get_runner", self.repo.get_runner(runner_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Runner {} not found", runner_id)))
    }

    // ─── Sessions ────────────────────────────────────────────────

    /// Start a tracking session for an existing runner.
    pub async fn start_session(&self, runner_id: u64) -> Result<Session> {
        self.get_runner(runner_id).await?;
        let session = self
            .bounded("insert_session", self.repo.insert_session(runner_id))
            .await?;
        tracing::info!(session_id = session.id, runner_id, "Session started");
        Ok(session)
    }

    pub async fn get_session(&self, session_id: u64) -> Result<Session> {
        self.bounded("get_session", self.repo.get_session(session_id))
            .await?
            .ok_or(AppError::SessionNotFound(session_id))
    }

    pub async fn sessions_for_runner(&self, runner_id: u64) -> Result<Vec<Session>> {
        self.get_runner(runner_id).await?;
        self.bounded(
            "sessions_for_runner",
            self.repo.sessions_for_runner(runner_id),
        )
        .await
    }

    // ─── Readings ────────────────────────────────────────────────

    /// Most recently inserted reading of a session, if any.
    pub async fn last_reading(&self, session_id: u64) -> Result<Option<Reading>> {
        self.bounded("last_reading", self.repo.last_reading(session_id))
            .await
    }

    /// Readings of a session ascending by timestamp (ties by insertion).
    pub async fn history(&self, session_id: u64) -> Result<Vec<Reading>> {
        self.get_session(session_id).await?;
        let mut readings = self
            .bounded(
                "readings_for_session",
                self.repo.readings_for_session(session_id),
            )
            .await?;
        readings.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(readings)
    }

    /// Append a reading and accrue the distance from the previous one.
    ///
    /// Reading the previous position, computing the step and writing the new
    /// reading plus total happen under the session's lock, so concurrent
    /// callers for the same session never see the same "last reading".
    ///
    /// A timeout reports `StorageUnavailable` even if the backend's atomic
    /// write already landed. The reading and its total are then stored
    /// together and the next call accrues from it.
    pub async fn record_reading(&self, reading: &ValidatedReading) -> Result<RecordedReading> {
        let session_id = reading.session_id();

        let lock = self
            .locks
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.record_locked(session_id, reading).await
        };

        // Map entry plus our clone: nobody else holds or waits on this lock.
        self.locks.remove_if(&session_id, |_, l| Arc::strong_count(l) == 2);

        result
    }

    async fn record_locked(
        &self,
        session_id: u64,
        reading: &ValidatedReading,
    ) -> Result<RecordedReading> {
        self.bounded("record_reading", async {
            if self.repo.get_session(session_id).await?.is_none() {
                return Err(AppError::SessionNotFound(session_id));
            }

            let distance_added = match self.repo.last_reading(session_id).await? {
                Some(previous) => distance_between(
                    previous.point(),
                    geo::Point::new(reading.lon(), reading.lat()),
                ),
                None => 0.0,
            };

            let (stored, total_distance) = self
                .repo
                .append_reading(reading, distance_added)
                .await?
                .ok_or(AppError::SessionNotFound(session_id))?;

            Ok::<_, AppError>(RecordedReading {
                reading: stored,
                distance_added,
                total_distance,
            })
        })
        .await
        .inspect_err(|e| {
            if matches!(e, AppError::StorageUnavailable(_)) {
                tracing::warn!(session_id, "Reading write outcome unknown");
            }
        })
    }
}
