// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device poll route.

use crate::error::Result;
use crate::services::IngestOutcome;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use std::sync::Arc;

/// Header carrying the device shared secret.
pub const DEVICE_KEY_HEADER: &str = "x-device-key";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/poll/{session_id}", post(poll_sensors))
}

/// Poll the three sensors and ingest the combined reading.
async fn poll_sensors(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Json<IngestOutcome>> {
    let device_key = headers
        .get(DEVICE_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    let outcome = state.poller.poll(session_id, device_key).await?;
    Ok(Json(outcome))
}
