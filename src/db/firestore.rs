// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Runners (registration records)
//! - Sessions (running distance totals)
//! - Readings (telemetry samples, keyed by reading ID)
//! - Counters (sequential ID allocation)

use crate::db::collections;
use crate::db::repository::TelemetryRepository;
use crate::error::AppError;
use crate::models::{NewRunner, Reading, Runner, Session};
use crate::services::validation::ValidatedReading;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Sequential ID counter document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Counter {
    value: u64,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
    /// Serializes counter read-modify-write within this instance.
    id_lock: Arc<Mutex<()>>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator rejects real credentials, so skip the auth chain entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self::from_client(Some(client)))
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self::from_client(Some(client)))
    }

    /// Create an offline client. Every operation fails with `StorageUnavailable`.
    pub fn new_offline() -> Self {
        Self::from_client(None)
    }

    fn from_client(client: Option<firestore::FirestoreDb>) -> Self {
        Self {
            client,
            id_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::StorageUnavailable("Database not connected (offline mode)".to_string())
        })
    }

    // ─── ID Allocation ───────────────────────────────────────────

    /// Allocate the next ID for a collection.
    ///
    /// Counters live in `counters/{collection}`. The in-process lock keeps
    /// concurrent requests on this instance from handing out the same ID.
    async fn next_id(&self, collection: &str) -> Result<u64, AppError> {
        let _guard = self.id_lock.lock().await;
        let client = self.get_client()?;

        let current: Option<Counter> = client
            .fluent()
            .select()
            .by_id_in(collections::COUNTERS)
            .obj()
            .one(collection)
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        let next = Counter {
            value: current.unwrap_or_default().value + 1,
        };

        let _: () = client
            .fluent()
            .update()
            .in_col(collections::COUNTERS)
            .document_id(collection)
            .object(&next)
            .execute()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        Ok(next.value)
    }
}

#[async_trait]
impl TelemetryRepository for FirestoreDb {
    async fn ping(&self) -> Result<(), AppError> {
        let _: Option<Counter> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::COUNTERS)
            .obj()
            .one(collections::RUNNERS)
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;
        Ok(())
    }

    // ─── Runner Operations ───────────────────────────────────────

    async fn insert_runner(&self, runner: NewRunner) -> Result<Runner, AppError> {
        let runner = Runner {
            id: self.next_id(collections::RUNNERS).await?,
            name: runner.name,
            email: runner.email,
            created_at: chrono::Utc::now(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::RUNNERS)
            .document_id(runner.id.to_string())
            .object(&runner)
            .execute()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        Ok(runner)
    }

    async fn get_runner(&self, runner_id: u64) -> Result<Option<Runner>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RUNNERS)
            .obj()
            .one(&runner_id.to_string())
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    // ─── Session Operations ──────────────────────────────────────

    async fn insert_session(&self, runner_id: u64) -> Result<Session, AppError> {
        let session = Session::new(
            self.next_id(collections::SESSIONS).await?,
            runner_id,
            chrono::Utc::now(),
        );

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .document_id(session.id.to_string())
            .object(&session)
            .execute()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        Ok(session)
    }

    async fn get_session(&self, session_id: u64) -> Result<Option<Session>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SESSIONS)
            .obj()
            .one(&session_id.to_string())
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    async fn sessions_for_runner(&self, runner_id: u64) -> Result<Vec<Session>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SESSIONS)
            .filter(move |q| q.field("runner_id").eq(runner_id))
            .order_by([("id", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    // ─── Reading Operations ──────────────────────────────────────

    async fn last_reading(&self, session_id: u64) -> Result<Option<Reading>, AppError> {
        let latest: Vec<Reading> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::READINGS)
            .filter(move |q| q.field("session_id").eq(session_id))
            .order_by([("id", firestore::FirestoreQueryDirection::Descending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        Ok(latest.into_iter().next())
    }

    async fn readings_for_session(&self, session_id: u64) -> Result<Vec<Reading>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::READINGS)
            .filter(move |q| q.field("session_id").eq(session_id))
            .order_by([("id", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    /// Store the reading and the new session total in one transaction.
    ///
    /// The session is read before the transaction begins; the caller's
    /// per-session lock is what keeps that read current.
    async fn append_reading(
        &self,
        reading: &ValidatedReading,
        distance: f64,
    ) -> Result<Option<(Reading, f64)>, AppError> {
        let session_id = reading.session_id();

        let Some(mut session) = self.get_session(session_id).await? else {
            tracing::warn!(session_id, "Session not found, aborting reading write");
            return Ok(None);
        };

        let stored = Reading {
            id: self.next_id(collections::READINGS).await?,
            session_id,
            latitude: reading.lat(),
            longitude: reading.lon(),
            battery: reading.battery(),
            temperature: reading.temperature(),
            timestamp: chrono::Utc::now(),
        };
        session.total_distance += distance;

        let client = self.get_client()?;
        let mut transaction = client.begin_transaction().await.map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to begin transaction: {}", e))
        })?;

        client
            .fluent()
            .update()
            .in_col(collections::READINGS)
            .document_id(stored.id.to_string())
            .object(&stored)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::StorageUnavailable(format!("Failed to add reading to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .document_id(session_id.to_string())
            .object(&session)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::StorageUnavailable(format!("Failed to add session to transaction: {}", e))
            })?;

        transaction.commit().await.map_err(|e| {
            AppError::StorageUnavailable(format!("Transaction commit failed: {}", e))
        })?;

        tracing::debug!(
            session_id,
            reading_id = stored.id,
            total_distance = session.total_distance,
            "Reading stored atomically"
        );

        Ok(Some((stored, session.total_distance)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_client_reports_storage_unavailable() {
        let db = FirestoreDb::new_offline();
        assert!(matches!(
            db.ping().await,
            Err(AppError::StorageUnavailable(_))
        ));
        assert!(matches!(
            db.get_session(1).await,
            Err(AppError::StorageUnavailable(_))
        ));
    }
}
