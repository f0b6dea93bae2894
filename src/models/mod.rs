// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod reading;
pub mod runner;
pub mod session;

pub use reading::{CandidateReading, Reading};
pub use runner::{NewRunner, Runner};
pub use session::Session;
