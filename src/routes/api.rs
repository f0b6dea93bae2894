// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for runners, sessions and readings.

use crate::error::{AppError, Result};
use crate::models::{CandidateReading, Runner, Session};
use crate::services::geodesic::{encode_track, track_feature, track_line};
use crate::services::ingest::round2;
use crate::services::IngestOutcome;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/runners", post(create_runner))
        .route("/api/runners/{runner_id}", get(get_runner))
        .route("/api/runners/{runner_id}/sessions", get(get_runner_sessions))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{session_id}", get(get_session))
        .route("/api/sessions/{session_id}/history", get(get_history))
        .route("/api/sessions/{session_id}/track", get(get_track))
        .route("/api/measurements", post(create_measurement))
}

// ─── Runners ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRunnerRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

/// Register a runner.
async fn create_runner(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRunnerRequest>,
) -> Result<(StatusCode, Json<Runner>)> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let runner = state
        .store
        .register_runner(body.name.trim().to_string(), body.email)
        .await?;
    Ok((StatusCode::CREATED, Json(runner)))
}

async fn get_runner(
    State(state): State<Arc<AppState>>,
    Path(runner_id): Path<u64>,
) -> Result<Json<Runner>> {
    Ok(Json(state.store.get_runner(runner_id).await?))
}

async fn get_runner_sessions(
    State(state): State<Arc<AppState>>,
    Path(runner_id): Path<u64>,
) -> Result<Json<Vec<Session>>> {
    Ok(Json(state.store.sessions_for_runner(runner_id).await?))
}

// ─── Sessions ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub runner_id: u64,
}

/// Start a tracking session.
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>)> {
    let session = state.store.start_session(body.runner_id).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Session overview with the encoded track.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionSummary {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub runner_id: u64,
    pub started_at: String,
    pub total_distance_m: f64,
    pub reading_count: usize,
    /// Google-encoded polyline (precision 5)
    pub polyline: String,
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<u64>,
) -> Result<Json<SessionSummary>> {
    let session = state.store.get_session(session_id).await?;
    let readings = state.store.history(session_id).await?;

    let polyline =
        encode_track(&track_line(&readings)).map_err(|e| AppError::Internal(e.into()))?;

    Ok(Json(SessionSummary {
        id: session.id,
        runner_id: session.runner_id,
        started_at: format_utc_rfc3339(session.started_at),
        total_distance_m: round2(session.total_distance),
        reading_count: readings.len(),
        polyline,
    }))
}

// ─── Readings ────────────────────────────────────────────────

/// One history entry.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HistoryEntry {
    pub lat: f64,
    pub lon: f64,
    pub battery: f64,
    pub temperature: f64,
    pub timestamp: String,
}

/// Readings of a session, oldest first.
async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<u64>,
) -> Result<Json<Vec<HistoryEntry>>> {
    let readings = state.store.history(session_id).await?;

    Ok(Json(
        readings
            .into_iter()
            .map(|r| HistoryEntry {
                lat: r.latitude,
                lon: r.longitude,
                battery: r.battery,
                temperature: r.temperature,
                timestamp: format_utc_rfc3339(r.timestamp),
            })
            .collect(),
    ))
}

/// Session track as a GeoJSON feature.
async fn get_track(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<u64>,
) -> Result<Json<geojson::Feature>> {
    let session = state.store.get_session(session_id).await?;
    let readings = state.store.history(session_id).await?;

    Ok(Json(track_feature(
        session.id,
        round2(session.total_distance),
        &track_line(&readings),
    )))
}

/// Ingest a client-submitted reading.
async fn create_measurement(
    State(state): State<Arc<AppState>>,
    Json(candidate): Json<CandidateReading>,
) -> Result<Json<IngestOutcome>> {
    Ok(Json(state.ingestor.ingest(candidate).await?))
}
