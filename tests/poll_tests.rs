// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device poll tests: authentication, fan-out and fail-fast behavior.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use runner_tracker::error::AppError;
use runner_tracker::routes::poll::DEVICE_KEY_HEADER;
use runner_tracker::services::SensorKind;
use serde_json::Value;
use std::time::{Duration, Instant};
use tower::ServiceExt;

mod common;
use common::{create_test_app, start_session};

const DEVICE_KEY: &str = "test_device_secret";

fn poll_request(session_id: u64, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/api/poll/{}", session_id));
    if let Some(key) = key {
        builder = builder.header(DEVICE_KEY_HEADER, key);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_wrong_key_contacts_no_sensor() {
    let app = create_test_app();
    let session_id = start_session(&app.state).await;

    let err = app
        .state
        .poller
        .poll(session_id, Some("WRONG"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthorized));
    assert_eq!(app.sensors.call_count(), 0);
}

#[tokio::test]
async fn test_missing_and_prefixed_keys_are_rejected() {
    let app = create_test_app();
    let session_id = start_session(&app.state).await;

    for key in [None, Some(""), Some("test_device"), Some("test_device_secret ")] {
        let err = app.state.poller.poll(session_id, key).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized), "key {:?} accepted", key);
    }
    assert_eq!(app.sensors.call_count(), 0);
}

#[tokio::test]
async fn test_successful_poll_ingests_combined_reading() {
    let app = create_test_app();
    let session_id = start_session(&app.state).await;

    let first = app
        .state
        .poller
        .poll(session_id, Some(DEVICE_KEY))
        .await
        .expect("poll succeeds");
    assert_eq!(first.distance_added_m, 0.0);
    assert_eq!(app.sensors.call_count(), 3);

    app.sensors.move_to(38.7204, -9.14);
    let second = app
        .state
        .poller
        .poll(session_id, Some(DEVICE_KEY))
        .await
        .unwrap();
    assert!((second.total_distance_m - 44.48).abs() < 1.0);

    let history = app.state.store.history(session_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].battery, 87.5);
    assert_eq!(history[0].temperature, 21.3);
    assert_eq!(history[1].latitude, 38.7204);
}

#[tokio::test]
async fn test_failing_sensor_is_named_and_nothing_stored() {
    for kind in [SensorKind::Gps, SensorKind::Battery, SensorKind::Temperature] {
        let app = create_test_app();
        let session_id = start_session(&app.state).await;
        app.sensors.fail(kind);

        let err = app
            .state
            .poller
            .poll(session_id, Some(DEVICE_KEY))
            .await
            .unwrap_err();

        match err {
            AppError::SensorUnavailable(failed) => assert_eq!(failed, kind),
            other => panic!("expected sensor error, got {:?}", other),
        }

        let history = app.state.store.history(session_id).await.unwrap();
        assert!(history.is_empty());
        assert!(app.publisher.published().is_empty());
    }
}

#[tokio::test]
async fn test_sensors_are_fetched_concurrently() {
    let app = create_test_app();
    let session_id = start_session(&app.state).await;
    let latency = Duration::from_millis(100);
    for kind in [SensorKind::Gps, SensorKind::Battery, SensorKind::Temperature] {
        app.sensors.delay(kind, latency);
    }

    let started = Instant::now();
    app.state
        .poller
        .poll(session_id, Some(DEVICE_KEY))
        .await
        .expect("poll succeeds");
    let elapsed = started.elapsed();

    assert_eq!(app.sensors.call_count(), 3);
    // One sensor round trip, not three back to back.
    assert!(elapsed >= latency);
    assert!(elapsed < latency * 5 / 2, "poll took {:?}", elapsed);
}

#[tokio::test]
async fn test_slow_sensor_times_out_and_nothing_stored() {
    let app = create_test_app();
    let session_id = start_session(&app.state).await;
    let sensor_timeout = app.state.config.sensor_timeout;
    app.sensors.delay(SensorKind::Temperature, sensor_timeout * 10);

    let started = Instant::now();
    let err = app
        .state
        .poller
        .poll(session_id, Some(DEVICE_KEY))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, AppError::SensorUnavailable(SensorKind::Temperature)));
    assert!(elapsed < sensor_timeout * 5, "poll took {:?}", elapsed);

    let history = app.state.store.history(session_id).await.unwrap();
    assert!(history.is_empty());
    let session = app.state.store.get_session(session_id).await.unwrap();
    assert_eq!(session.total_distance, 0.0);
}

#[tokio::test]
async fn test_poll_unknown_session() {
    let app = create_test_app();

    let err = app
        .state
        .poller
        .poll(777, Some(DEVICE_KEY))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::SessionNotFound(777)));
}

#[tokio::test]
async fn test_poll_route_requires_device_key() {
    let app = create_test_app();
    let session_id = start_session(&app.state).await;

    let response = app
        .router
        .clone()
        .oneshot(poll_request(session_id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "unauthorized");

    let response = app
        .router
        .oneshot(poll_request(session_id, Some("nope")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.sensors.call_count(), 0);
}

#[tokio::test]
async fn test_poll_route_success() {
    let app = create_test_app();
    let session_id = start_session(&app.state).await;

    let response = app
        .router
        .oneshot(poll_request(session_id, Some(DEVICE_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["measurement_id"].as_u64().is_some());
    assert_eq!(body["distance_added_m"], 0.0);
    assert_eq!(body["total_distance_m"], 0.0);
}

#[tokio::test]
async fn test_poll_route_reports_failed_sensor() {
    let app = create_test_app();
    let session_id = start_session(&app.state).await;
    app.sensors.fail(SensorKind::Battery);

    let response = app
        .router
        .oneshot(poll_request(session_id, Some(DEVICE_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"], "sensor_unavailable");
    assert_eq!(body["sensor"], "battery");
}
