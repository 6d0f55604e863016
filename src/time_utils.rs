// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with millisecond precision and a `Z`
/// suffix, matching what the frontend's date parsing expects.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format a stored BSON timestamp for API responses.
pub fn format_bson_rfc3339(date: mongodb::bson::DateTime) -> String {
    format_utc_rfc3339(date.to_chrono())
}
