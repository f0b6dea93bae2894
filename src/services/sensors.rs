// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sensor gateway for the three remote telemetry endpoints.
//!
//! Each fetch is independent and bounded by its own timeout. Every failure
//! mode (transport error, non-success status, timeout, malformed payload)
//! collapses into [`SensorUnavailable`] tagged with the sensor that failed.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Which of the three sensors a fetch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Gps,
    Battery,
    Temperature,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Gps => "gps",
            SensorKind::Battery => "battery",
            SensorKind::Temperature => "temperature",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sensor could not produce a usable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} sensor unavailable")]
pub struct SensorUnavailable(pub SensorKind);

impl From<SensorUnavailable> for crate::error::AppError {
    fn from(err: SensorUnavailable) -> Self {
        crate::error::AppError::SensorUnavailable(err.0)
    }
}

/// Low-level transport failure. Never leaves this module.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("invalid body: {0}")]
    Body(String),
}

/// Fetches a JSON document from a sensor endpoint.
#[async_trait]
pub trait SensorTransport: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, TransportError>;
}

/// HTTP transport backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl SensorTransport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, TransportError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))
    }
}

/// Endpoint URLs of the three sensors.
#[derive(Debug, Clone)]
pub struct SensorEndpoints {
    pub gps: String,
    pub battery: String,
    pub temperature: String,
}

/// Position reported by the GPS sensor.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GpsFix {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Deserialize)]
struct BatteryPayload {
    battery: f64,
}

#[derive(Deserialize)]
struct TemperaturePayload {
    temperature: f64,
}

/// Gateway that turns raw sensor responses into typed values.
#[derive(Clone)]
pub struct SensorGateway {
    transport: Arc<dyn SensorTransport>,
    endpoints: SensorEndpoints,
    timeout: Duration,
}

impl SensorGateway {
    pub fn new(
        transport: Arc<dyn SensorTransport>,
        endpoints: SensorEndpoints,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            endpoints,
            timeout,
        }
    }

    /// Fetch the current position.
    pub async fn fetch_gps(&self) -> Result<GpsFix, SensorUnavailable> {
        self.fetch(SensorKind::Gps, &self.endpoints.gps).await
    }

    /// Fetch the battery level in percent.
    pub async fn fetch_battery(&self) -> Result<f64, SensorUnavailable> {
        self.fetch::<BatteryPayload>(SensorKind::Battery, &self.endpoints.battery)
            .await
            .map(|p| p.battery)
    }

    /// Fetch the temperature in degrees Celsius.
    pub async fn fetch_temperature(&self) -> Result<f64, SensorUnavailable> {
        self.fetch::<TemperaturePayload>(SensorKind::Temperature, &self.endpoints.temperature)
            .await
            .map(|p| p.temperature)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        kind: SensorKind,
        url: &str,
    ) -> Result<T, SensorUnavailable> {
        let value = match tokio::time::timeout(self.timeout, self.transport.get_json(url)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                tracing::warn!(sensor = %kind, url, error = %e, "Sensor request failed");
                return Err(SensorUnavailable(kind));
            }
            Err(_) => {
                tracing::warn!(
                    sensor = %kind,
                    url,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Sensor request timed out"
                );
                return Err(SensorUnavailable(kind));
            }
        };

        serde_json::from_value(value).map_err(|e| {
            tracing::warn!(sensor = %kind, url, error = %e, "Malformed sensor payload");
            SensorUnavailable(kind)
        })
    }
}
