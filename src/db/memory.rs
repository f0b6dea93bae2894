// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory storage backend for local development and tests.

use crate::db::repository::TelemetryRepository;
use crate::error::AppError;
use crate::models::{NewRunner, Reading, Runner, Session};
use crate::services::validation::ValidatedReading;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    last_runner_id: u64,
    last_session_id: u64,
    last_reading_id: u64,
    runners: BTreeMap<u64, Runner>,
    sessions: BTreeMap<u64, Session>,
    /// Readings per session, in insertion order
    readings: BTreeMap<u64, Vec<Reading>>,
}

/// Process-local store. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TelemetryRepository for MemoryDb {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn insert_runner(&self, runner: NewRunner) -> Result<Runner, AppError> {
        let mut state = self.state.write().await;
        state.last_runner_id += 1;
        let runner = Runner {
            id: state.last_runner_id,
            name: runner.name,
            email: runner.email,
            created_at: chrono::Utc::now(),
        };
        state.runners.insert(runner.id, runner.clone());
        Ok(runner)
    }

    async fn get_runner(&self, runner_id: u64) -> Result<Option<Runner>, AppError> {
        Ok(self.state.read().await.runners.get(&runner_id).cloned())
    }

    async fn insert_session(&self, runner_id: u64) -> Result<Session, AppError> {
        let mut state = self.state.write().await;
        state.last_session_id += 1;
        let session = Session::new(state.last_session_id, runner_id, chrono::Utc::now());
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, session_id: u64) -> Result<Option<Session>, AppError> {
        Ok(self.state.read().await.sessions.get(&session_id).cloned())
    }

    async fn sessions_for_runner(&self, runner_id: u64) -> Result<Vec<Session>, AppError> {
        Ok(self
            .state
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.runner_id == runner_id)
            .cloned()
            .collect())
    }

    async fn last_reading(&self, session_id: u64) -> Result<Option<Reading>, AppError> {
        Ok(self
            .state
            .read()
            .await
            .readings
            .get(&session_id)
            .and_then(|r| r.last())
            .cloned())
    }

    async fn readings_for_session(&self, session_id: u64) -> Result<Vec<Reading>, AppError> {
        Ok(self
            .state
            .read()
            .await
            .readings
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_reading(
        &self,
        reading: &ValidatedReading,
        distance: f64,
    ) -> Result<Option<(Reading, f64)>, AppError> {
        let session_id = reading.session_id();
        let mut state = self.state.write().await;

        if !state.sessions.contains_key(&session_id) {
            return Ok(None);
        }

        state.last_reading_id += 1;
        let stored = Reading {
            id: state.last_reading_id,
            session_id,
            latitude: reading.lat(),
            longitude: reading.lon(),
            battery: reading.battery(),
            temperature: reading.temperature(),
            timestamp: chrono::Utc::now(),
        };

        let new_total = match state.sessions.get_mut(&session_id) {
            Some(session) => {
                session.total_distance += distance;
                session.total_distance
            }
            None => return Ok(None),
        };

        state
            .readings
            .entry(session_id)
            .or_default()
            .push(stored.clone());

        Ok(Some((stored, new_total)))
    }
}
