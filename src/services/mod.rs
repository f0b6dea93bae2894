// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod geodesic;
pub mod ingest;
pub mod poll;
pub mod publisher;
pub mod sensors;
pub mod validation;

pub use ingest::{IngestOutcome, TelemetryIngestor};
pub use poll::PollOrchestrator;
pub use publisher::{LogPublisher, MqttPublisher, Publisher};
pub use sensors::{HttpTransport, SensorEndpoints, SensorGateway, SensorKind, SensorTransport};
