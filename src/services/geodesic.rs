// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Great-circle distance and session track geometry.

use crate::models::Reading;
use geo::{Coord, LineString, Point};
use geojson::{Feature, Geometry, JsonObject};

/// Mean Earth radius used for all distance accrual.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Polyline precision (5 decimal places, Google encoded polyline format).
const POLYLINE_PRECISION: u32 = 5;

/// Haversine distance in meters between two coordinates given in degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Haversine distance between two `geo` points (x = lon, y = lat).
pub fn distance_between(from: Point<f64>, to: Point<f64>) -> f64 {
    haversine_distance(from.y(), from.x(), to.y(), to.x())
}

/// Sum of distances between consecutive readings.
pub fn path_length(readings: &[Reading]) -> f64 {
    readings
        .windows(2)
        .map(|pair| distance_between(pair[0].point(), pair[1].point()))
        .sum()
}

/// Build the ordered track of a session.
pub fn track_line(readings: &[Reading]) -> LineString<f64> {
    readings
        .iter()
        .map(|r| Coord {
            x: r.longitude,
            y: r.latitude,
        })
        .collect::<Vec<_>>()
        .into()
}

/// Errors from track geometry operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Failed to encode polyline: {0}")]
    PolylineError(String),
}

/// Encode a track as a polyline string.
pub fn encode_track(line: &LineString<f64>) -> Result<String, TrackError> {
    polyline::encode_coordinates(line.coords().copied(), POLYLINE_PRECISION)
        .map_err(|e| TrackError::PolylineError(e.to_string()))
}

/// Build a GeoJSON feature for a session track.
pub fn track_feature(session_id: u64, total_distance: f64, line: &LineString<f64>) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("session_id".to_string(), session_id.into());
    properties.insert("total_distance_m".to_string(), total_distance.into());
    properties.insert("points".to_string(), line.0.len().into());

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(line))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
