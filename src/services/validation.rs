// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Physical-range validation for incoming readings.
//!
//! Checks run in a fixed order (latitude, longitude, battery, temperature)
//! and stop at the first violation so error messages are deterministic.

use crate::models::CandidateReading;
use std::fmt;
use std::ops::RangeInclusive;

pub const LATITUDE_RANGE: RangeInclusive<f64> = -90.0..=90.0;
pub const LONGITUDE_RANGE: RangeInclusive<f64> = -180.0..=180.0;
pub const BATTERY_RANGE: RangeInclusive<f64> = 0.0..=100.0;
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = -40.0..=60.0;

/// Reading field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingField {
    Latitude,
    Longitude,
    Battery,
    Temperature,
}

impl ReadingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingField::Latitude => "latitude",
            ReadingField::Longitude => "longitude",
            ReadingField::Battery => "battery",
            ReadingField::Temperature => "temperature",
        }
    }
}

impl fmt::Display for ReadingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First range violation found in a candidate reading.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: ReadingField,
    pub reason: String,
}

/// A reading whose values are known to be within physical range.
///
/// The only way to build one is [`validate`], so downstream code never
/// re-checks ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedReading {
    session_id: u64,
    lat: f64,
    lon: f64,
    battery: f64,
    temperature: f64,
}

impl ValidatedReading {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn battery(&self) -> f64 {
        self.battery
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl TryFrom<CandidateReading> for ValidatedReading {
    type Error = ValidationError;

    fn try_from(candidate: CandidateReading) -> Result<Self, Self::Error> {
        validate(&candidate)
    }
}

/// Validate a candidate reading, returning the first violated constraint.
pub fn validate(candidate: &CandidateReading) -> Result<ValidatedReading, ValidationError> {
    check(ReadingField::Latitude, candidate.lat, &LATITUDE_RANGE)?;
    check(ReadingField::Longitude, candidate.lon, &LONGITUDE_RANGE)?;
    check(ReadingField::Battery, candidate.battery, &BATTERY_RANGE)?;
    check(
        ReadingField::Temperature,
        candidate.temperature,
        &TEMPERATURE_RANGE,
    )?;

    Ok(ValidatedReading {
        session_id: candidate.session_id,
        lat: candidate.lat,
        lon: candidate.lon,
        battery: candidate.battery,
        temperature: candidate.temperature,
    })
}

// NaN fails `contains`, so non-finite input is rejected here too.
fn check(
    field: ReadingField,
    value: f64,
    range: &RangeInclusive<f64>,
) -> Result<(), ValidationError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError {
            field,
            reason: format!(
                "{} is outside [{}, {}]",
                value,
                range.start(),
                range.end()
            ),
        })
    }
}
