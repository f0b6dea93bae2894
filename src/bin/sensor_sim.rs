// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Simulated sensor device.
//!
//! Serves `/gps`, `/battery` and `/temperature` for local end-to-end runs of
//! the poll endpoint. Every read advances the simulated device: the position
//! random-walks, the battery drains and the temperature wanders.

use axum::{extract::State, routing::get, Json, Router};
use rand::Rng;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Maximum position step per read, in degrees.
const POSITION_STEP_DEG: f64 = 0.0005;
/// Battery drain per read, in percent.
const BATTERY_DRAIN: (f64, f64) = (0.1, 0.5);
/// Maximum temperature change per read, in degrees Celsius.
const TEMPERATURE_STEP: f64 = 0.2;

/// State of the simulated device.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Device {
    lat: f64,
    lon: f64,
    battery: f64,
    temperature: f64,
}

impl Default for Device {
    fn default() -> Self {
        // Paris, fully charged, mild day.
        Self {
            lat: 48.8566,
            lon: 2.3522,
            battery: 100.0,
            temperature: 20.0,
        }
    }
}

impl Device {
    fn step_position<R: Rng>(&mut self, rng: &mut R) {
        self.lat = (self.lat + rng.random_range(-POSITION_STEP_DEG..=POSITION_STEP_DEG))
            .clamp(-90.0, 90.0);
        self.lon = (self.lon + rng.random_range(-POSITION_STEP_DEG..=POSITION_STEP_DEG))
            .clamp(-180.0, 180.0);
    }

    fn drain_battery<R: Rng>(&mut self, rng: &mut R) {
        self.battery = (self.battery - rng.random_range(BATTERY_DRAIN.0..=BATTERY_DRAIN.1)).max(0.0);
    }

    fn drift_temperature<R: Rng>(&mut self, rng: &mut R) {
        self.temperature = (self.temperature
            + rng.random_range(-TEMPERATURE_STEP..=TEMPERATURE_STEP))
        .clamp(-40.0, 60.0);
    }
}

type SharedDevice = Arc<Mutex<Device>>;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Apply `f` to the device and return the updated snapshot.
fn advance(device: &SharedDevice, f: impl FnOnce(&mut Device, &mut rand::rngs::ThreadRng)) -> Device {
    let mut rng = rand::rng();
    let mut guard = device.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut *guard, &mut rng);
    *guard
}

async fn gps(State(device): State<SharedDevice>) -> Json<Value> {
    let d = advance(&device, |d, rng| d.step_position(rng));
    Json(json!({ "lat": d.lat, "lon": d.lon }))
}

async fn battery(State(device): State<SharedDevice>) -> Json<Value> {
    let d = advance(&device, |d, rng| d.drain_battery(rng));
    Json(json!({ "battery": round2(d.battery) }))
}

async fn temperature(State(device): State<SharedDevice>) -> Json<Value> {
    let d = advance(&device, |d, rng| d.drift_temperature(rng));
    Json(json!({ "temperature": round2(d.temperature) }))
}

fn router(device: SharedDevice) -> Router {
    Router::new()
        .route("/gps", get(gps))
        .route("/battery", get(battery))
        .route("/temperature", get(temperature))
        .with_state(device)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = std::env::var("SENSOR_SIM_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5683);

    let app = router(Arc::new(Mutex::new(Device::default())));

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Sensor simulator listening");

    axum::serve(listener, app).await?;
    Ok(())
}
