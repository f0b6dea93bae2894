// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use runner_tracker::config::Config;
use runner_tracker::db::{FirestoreDb, MemoryDb, TelemetryRepository};
use runner_tracker::error::AppError;
use runner_tracker::models::{CandidateReading, NewRunner, Reading, Runner, Session};
use runner_tracker::routes::create_router;
use runner_tracker::services::publisher::{PublishError, TelemetryMessage};
use runner_tracker::services::sensors::TransportError;
use runner_tracker::services::validation::ValidatedReading;
use runner_tracker::services::{Publisher, SensorKind, SensorTransport};
use runner_tracker::AppState;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Sensor transport answering from fixed values, with per-sensor failures
/// and latencies.
pub struct StubSensors {
    pub calls: AtomicUsize,
    failing: Mutex<HashSet<SensorKind>>,
    delays: Mutex<HashMap<SensorKind, Duration>>,
    position: Mutex<(f64, f64)>,
}

#[allow(dead_code)]
impl StubSensors {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
            position: Mutex::new((lat, lon)),
        }
    }

    pub fn fail(&self, kind: SensorKind) {
        self.failing.lock().unwrap().insert(kind);
    }

    pub fn delay(&self, kind: SensorKind, latency: Duration) {
        self.delays.lock().unwrap().insert(kind, latency);
    }

    pub fn move_to(&self, lat: f64, lon: f64) {
        *self.position.lock().unwrap() = (lat, lon);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn kind_for_url(url: &str) -> SensorKind {
    if url.ends_with("/gps") {
        SensorKind::Gps
    } else if url.ends_with("/battery") {
        SensorKind::Battery
    } else {
        SensorKind::Temperature
    }
}

#[async_trait]
impl SensorTransport for StubSensors {
    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let kind = kind_for_url(url);

        let latency = self.delays.lock().unwrap().get(&kind).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.lock().unwrap().contains(&kind) {
            return Err(TransportError::Status(503));
        }

        let (lat, lon) = *self.position.lock().unwrap();
        Ok(match kind {
            SensorKind::Gps => json!({ "lat": lat, "lon": lon }),
            SensorKind::Battery => json!({ "battery": 87.5 }),
            SensorKind::Temperature => json!({ "temperature": 21.3 }),
        })
    }
}

/// Publisher that records every message, fails every call, or hangs.
#[derive(Default)]
pub struct RecordingPublisher {
    pub fail: bool,
    pub hang: bool,
    pub messages: Mutex<Vec<(String, TelemetryMessage)>>,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Never answers within any reasonable publish timeout.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<(String, TelemetryMessage)> {
        self.messages.lock().unwrap().clone()
    }

    /// Wait until at least `count` messages arrived. Publishing runs on
    /// background tasks, so tests poll for it.
    pub async fn wait_for(&self, count: usize) -> Vec<(String, TelemetryMessage)> {
        for _ in 0..400 {
            let published = self.published();
            if published.len() >= count {
                return published;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "expected {} published messages, got {}",
            count,
            self.published().len()
        );
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, message: &TelemetryMessage) -> Result<(), PublishError> {
        if self.hang {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.fail {
            return Err(PublishError::Client("broker unreachable".to_string()));
        }
        self.messages
            .lock()
            .unwrap()
            .push((topic.to_string(), message.clone()));
        Ok(())
    }
}

/// In-memory repository that pauses after reading a session's last reading,
/// so concurrent writers interleave between "read last" and "append".
pub struct YieldingRepo {
    inner: MemoryDb,
    pause: Duration,
}

#[allow(dead_code)]
impl YieldingRepo {
    pub fn new(pause: Duration) -> Self {
        Self {
            inner: MemoryDb::new(),
            pause,
        }
    }
}

#[async_trait]
impl TelemetryRepository for YieldingRepo {
    async fn ping(&self) -> Result<(), AppError> {
        self.inner.ping().await
    }

    async fn insert_runner(&self, runner: NewRunner) -> Result<Runner, AppError> {
        self.inner.insert_runner(runner).await
    }

    async fn get_runner(&self, runner_id: u64) -> Result<Option<Runner>, AppError> {
        self.inner.get_runner(runner_id).await
    }

    async fn insert_session(&self, runner_id: u64) -> Result<Session, AppError> {
        self.inner.insert_session(runner_id).await
    }

    async fn get_session(&self, session_id: u64) -> Result<Option<Session>, AppError> {
        self.inner.get_session(session_id).await
    }

    async fn sessions_for_runner(&self, runner_id: u64) -> Result<Vec<Session>, AppError> {
        self.inner.sessions_for_runner(runner_id).await
    }

    async fn last_reading(&self, session_id: u64) -> Result<Option<Reading>, AppError> {
        let last = self.inner.last_reading(session_id).await;
        tokio::time::sleep(self.pause).await;
        last
    }

    async fn readings_for_session(&self, session_id: u64) -> Result<Vec<Reading>, AppError> {
        self.inner.readings_for_session(session_id).await
    }

    async fn append_reading(
        &self,
        reading: &ValidatedReading,
        distance: f64,
    ) -> Result<Option<(Reading, f64)>, AppError> {
        self.inner.append_reading(reading, distance).await
    }
}

/// Test app with its collaborators exposed for inspection.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub sensors: Arc<StubSensors>,
    pub publisher: Arc<RecordingPublisher>,
}

/// Create a test app over the in-memory backend.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    build_test_app(Arc::new(MemoryDb::new()), RecordingPublisher::default())
}

#[allow(dead_code)]
pub fn create_test_app_with(publisher: RecordingPublisher) -> TestApp {
    build_test_app(Arc::new(MemoryDb::new()), publisher)
}

#[allow(dead_code)]
pub fn create_test_app_over(repo: Arc<dyn TelemetryRepository>) -> TestApp {
    build_test_app(repo, RecordingPublisher::default())
}

fn build_test_app(repo: Arc<dyn TelemetryRepository>, publisher: RecordingPublisher) -> TestApp {
    let config = Config::test_default();
    let sensors = Arc::new(StubSensors::new(38.72, -9.14));
    let publisher = Arc::new(publisher);

    let state = Arc::new(AppState::new(
        config,
        repo,
        sensors.clone(),
        publisher.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        sensors,
        publisher,
    }
}

/// Register a runner and start a session, returning the session id.
#[allow(dead_code)]
pub async fn start_session(state: &AppState) -> u64 {
    let runner = state
        .store
        .register_runner("Ana".to_string(), "ana@example.com".to_string())
        .await
        .expect("register runner");
    state
        .store
        .start_session(runner.id)
        .await
        .expect("start session")
        .id
}

#[allow(dead_code)]
pub fn candidate(session_id: u64, lat: f64, lon: f64) -> CandidateReading {
    CandidateReading {
        session_id,
        lat,
        lon,
        battery: 80.0,
        temperature: 20.0,
    }
}
