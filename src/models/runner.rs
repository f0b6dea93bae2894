// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runner model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered runner. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runner {
    /// Runner ID (also used as document ID)
    pub id: u64,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// When the runner registered
    pub created_at: DateTime<Utc>,
}

/// Fields supplied at registration; the backend assigns the rest.
#[derive(Debug, Clone)]
pub struct NewRunner {
    pub name: String,
    pub email: String,
}
