// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runner-Tracker: live telemetry for tracked running sessions
//!
//! This crate provides the backend API that ingests position, battery and
//! temperature readings, accrues per-session distance, and republishes each
//! accepted reading for live consumers.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SessionStore;
use services::{PollOrchestrator, TelemetryIngestor};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: SessionStore,
    pub ingestor: TelemetryIngestor,
    pub poller: PollOrchestrator,
}

impl AppState {
    /// Wire the services together over the given collaborators.
    pub fn new(
        config: Config,
        repo: std::sync::Arc<dyn db::TelemetryRepository>,
        transport: std::sync::Arc<dyn services::SensorTransport>,
        publisher: std::sync::Arc<dyn services::Publisher>,
    ) -> Self {
        let store = SessionStore::new(repo, config.storage_timeout);
        let ingestor = TelemetryIngestor::new(store.clone(), publisher, config.publish_timeout);
        let gateway = services::SensorGateway::new(
            transport,
            config.sensors.clone(),
            config.sensor_timeout,
        );
        let poller = PollOrchestrator::new(gateway, ingestor.clone(), config.device_secret.clone());

        Self {
            config,
            store,
            ingestor,
            poller,
        }
    }
}
