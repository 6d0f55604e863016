// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Practice plan model for storage and API.

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::format_bson_rfc3339;

/// Stored practice plan in the `plans` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Owning account
    pub user: ObjectId,
    /// Plan title (3-100 chars)
    pub plan_name: String,
    /// Yoga style, free text up to 50 chars
    pub yoga_type: String,
    /// Daily meditation minutes (1-180)
    pub meditation_time: i32,
    /// Program length (1-52 weeks)
    pub duration_weeks: i32,
    /// Ordered schedule entries, one per practice slot
    #[serde(default)]
    pub daily_schedule: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime,
}

/// Plan as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlanResponse {
    pub id: String,
    pub plan_name: String,
    pub yoga_type: String,
    pub meditation_time: i32,
    pub duration_weeks: i32,
    pub daily_schedule: Vec<String>,
    pub notes: Option<String>,
    pub completed: bool,
    /// RFC3339
    pub created_at: String,
}

impl From<&Plan> for PlanResponse {
    fn from(plan: &Plan) -> Self {
        Self {
            id: plan.id.to_hex(),
            plan_name: plan.plan_name.clone(),
            yoga_type: plan.yoga_type.clone(),
            meditation_time: plan.meditation_time,
            duration_weeks: plan.duration_weeks,
            daily_schedule: plan.daily_schedule.clone(),
            notes: plan.notes.clone(),
            completed: plan.completed,
            created_at: format_bson_rfc3339(plan.created_at),
        }
    }
}
