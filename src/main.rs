// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runner-Tracker API Server
//!
//! Ingests runner telemetry, accrues session distance, and republishes
//! accepted readings over MQTT.

use runner_tracker::{
    config::{Config, StorageBackend},
    db::{FirestoreDb, MemoryDb, TelemetryRepository},
    services::{HttpTransport, LogPublisher, MqttPublisher, Publisher},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Runner-Tracker API");

    // Storage backend
    let repo: Arc<dyn TelemetryRepository> = match &config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
        StorageBackend::Firestore { project_id } => Arc::new(FirestoreDb::new(project_id).await?),
    };

    // Sensor transport (one shared HTTP client)
    let transport = Arc::new(HttpTransport::new(config.sensor_timeout)?);
    tracing::info!(
        gps = %config.sensors.gps,
        battery = %config.sensors.battery,
        temperature = %config.sensors.temperature,
        "Sensor gateway initialized"
    );

    // Publish sink
    let publisher: Arc<dyn Publisher> = match &config.mqtt {
        Some(mqtt) => {
            tracing::info!(host = %mqtt.host, port = mqtt.port, "Publishing telemetry over MQTT");
            Arc::new(MqttPublisher::connect(&mqtt.client_id, &mqtt.host, mqtt.port))
        }
        None => {
            tracing::warn!("MQTT_HOST not set; telemetry will only be logged");
            Arc::new(LogPublisher)
        }
    };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), repo, transport, publisher));

    // Build router
    let app = runner_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("runner_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
