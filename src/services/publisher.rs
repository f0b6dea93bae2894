// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live telemetry publication.
//!
//! Every accepted reading is republished on `tracking/{session_id}/gps`.
//! Publishing is best-effort: the persisted reading is the source of truth,
//! so callers log failures and move on.

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Depth of the request channel between the MQTT client and its event loop.
const MQTT_CHANNEL_CAPACITY: usize = 64;
const MQTT_KEEP_ALIVE: Duration = Duration::from_secs(60);
/// Pause before the event loop retries after a connection error.
const MQTT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Topic for live updates of a session.
pub fn session_topic(session_id: u64) -> String {
    format!("tracking/{}/gps", session_id)
}

/// Body published for each accepted reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    pub lat: f64,
    pub lon: f64,
    pub battery: f64,
    pub temperature: f64,
    /// Session total in meters, rounded to 2 decimals
    pub total_distance: f64,
}

/// Errors from the publish sink.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("broker client error: {0}")]
    Client(String),

    #[error("publish timed out")]
    Timeout,
}

/// Fire-and-forget publish sink.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, message: &TelemetryMessage) -> Result<(), PublishError>;
}

/// Publisher used when no broker is configured; only logs.
#[derive(Debug, Default, Clone)]
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, topic: &str, message: &TelemetryMessage) -> Result<(), PublishError> {
        tracing::debug!(
            topic,
            total_distance = message.total_distance,
            "No broker configured, dropping telemetry message"
        );
        Ok(())
    }
}

/// MQTT publisher. The event loop runs on its own task and reconnects on
/// failure; `publish` only enqueues and never waits for channel space.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    /// Connect to a broker and spawn the event loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(client_id: &str, host: &str, port: u16) -> Self {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(MQTT_KEEP_ALIVE);

        let (client, mut eventloop) = AsyncClient::new(options, MQTT_CHANNEL_CAPACITY);

        let broker = format!("{}:{}", host, port);
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!(broker = %broker, "Connected to MQTT broker");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(broker = %broker, error = %e, "MQTT connection error");
                        tokio::time::sleep(MQTT_RECONNECT_DELAY).await;
                    }
                }
            }
        });

        Self { client }
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, message: &TelemetryMessage) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(message)?;
        // Fails immediately when the request channel is full (broker down).
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| PublishError::Client(e.to_string()))
    }
}
