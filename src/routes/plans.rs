// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Practice plan routes. Every operation is scoped to the authenticated
//! owner; creation and completion queue detached notifications after the
//! write commits.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_auth, AuthUser};
use crate::models::{Plan, PlanResponse, User};
use crate::routes::{trimmed, MessageResponse};
use crate::validation::{plan_name_validator, yoga_type_validator};
use crate::AppState;

/// Plan routes (require authentication).
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/plans", post(create_plan).get(list_plans))
        .route("/plans/stats", get(plan_stats))
        .route("/plans/{id}", delete(delete_plan))
        .route("/plans/{id}/complete", patch(complete_plan))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

// ─── Create & List ───────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    #[serde(default)]
    #[validate(custom(function = "plan_name_validator"))]
    pub plan_name: String,

    #[serde(default)]
    #[validate(custom(function = "yoga_type_validator"))]
    pub yoga_type: String,

    #[validate(
        required(message = "Meditation time is required"),
        range(min = 1, max = 180, message = "Meditation time must be between 1-180 minutes")
    )]
    pub meditation_time: Option<i32>,

    #[validate(
        required(message = "Duration is required"),
        range(min = 1, max = 52, message = "Duration must be between 1-52 weeks")
    )]
    pub duration_weeks: Option<i32>,

    pub daily_schedule: Option<Vec<String>>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlanActionResponse {
    pub message: String,
    pub plan: PlanResponse,
}

/// Create a plan, then notify the owner from detached tasks.
async fn create_plan(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<PlanActionResponse>)> {
    payload.validate()?;

    let plan = Plan {
        id: ObjectId::new(),
        user: user.id,
        plan_name: payload.plan_name.trim().to_string(),
        yoga_type: payload.yoga_type.trim().to_string(),
        meditation_time: payload.meditation_time.unwrap_or_default(),
        duration_weeks: payload.duration_weeks.unwrap_or_default(),
        daily_schedule: payload.daily_schedule.unwrap_or_default(),
        notes: trimmed(payload.notes),
        completed: false,
        created_at: DateTime::now(),
    };

    state.db.insert_plan(&plan).await?;
    tracing::info!(user = %user.email, plan = %plan.plan_name, "Plan created");

    notify_plan_created(&state, &user, &plan);

    Ok((
        StatusCode::CREATED,
        Json(PlanActionResponse {
            message: "Plan created successfully".to_string(),
            plan: PlanResponse::from(&plan),
        }),
    ))
}

/// List the caller's plans, newest first.
async fn list_plans(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<PlanResponse>>> {
    let plans = state.db.plans_for_user(user.id).await?;
    Ok(Json(plans.iter().map(PlanResponse::from).collect()))
}

// ─── Delete & Complete ───────────────────────────────────────

/// Delete one of the caller's plans.
async fn delete_plan(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let plan = owned_plan(&state, &id, user.id, "delete").await?;

    state.db.delete_plan(plan.id).await?;
    tracing::info!(user = %user.email, plan = %plan.plan_name, "Plan deleted");

    Ok(Json(MessageResponse {
        message: "Plan deleted successfully".to_string(),
    }))
}

/// Mark one of the caller's plans completed and queue a congratulation.
async fn complete_plan(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<PlanActionResponse>> {
    let mut plan = owned_plan(&state, &id, user.id, "modify").await?;

    state.db.complete_plan(plan.id).await?;
    plan.completed = true;
    tracing::info!(user = %user.email, plan = %plan.plan_name, "Plan completed");

    let message = format!(
        "Hi {},\n\nCongratulations! You have completed your yoga plan \"{}\"!\n\n\
         Keep up the great work and stay consistent.\n\n- Yoga Planner App",
        user.name, plan.plan_name
    );
    state.mailer.send_detached(
        user.email.clone(),
        "\u{1F389} Yoga Plan Completed".to_string(),
        message,
    );

    Ok(Json(PlanActionResponse {
        message: "Plan marked as completed".to_string(),
        plan: PlanResponse::from(&plan),
    }))
}

/// Load a plan and check it belongs to the caller. The 404 for a missing
/// plan also covers malformed ids.
async fn owned_plan(
    state: &Arc<AppState>,
    raw_id: &str,
    owner: ObjectId,
    action: &str,
) -> Result<Plan> {
    let Ok(plan_id) = ObjectId::parse_str(raw_id) else {
        return Err(AppError::NotFound("Plan not found".to_string()));
    };

    let plan = state
        .db
        .find_plan(plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))?;

    if plan.user != owner {
        return Err(AppError::Forbidden(format!(
            "Unauthorized: You can only {action} your own plans"
        )));
    }
    Ok(plan)
}

// ─── Stats ───────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlanStats {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_plans: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub completed_plans: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub pending_plans: u64,
    pub completion_rate: f64,
}

/// Completion stats across the caller's plans.
async fn plan_stats(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<PlanStats>> {
    let total_plans = state.db.count_plans_for_user(user.id).await?;
    let completed_plans = state.db.count_completed_plans_for_user(user.id).await?;

    let completion_rate = if total_plans > 0 {
        completed_plans as f64 / total_plans as f64 * 100.0
    } else {
        0.0
    };

    Ok(Json(PlanStats {
        total_plans,
        completed_plans,
        pending_plans: total_plans - completed_plans,
        completion_rate: round_2dp(completion_rate),
    }))
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Email always; SMS only when the account carries a phone number.
fn notify_plan_created(state: &Arc<AppState>, user: &User, plan: &Plan) {
    let message = format!(
        "Hi {},\n\nYour yoga plan \"{}\" has been created successfully!\n\
         Keep practicing and stay consistent.\n\n- Yoga Planner App",
        user.name, plan.plan_name
    );
    state.mailer.send_detached(
        user.email.clone(),
        "\u{1F9D8} Yoga Plan Created Successfully".to_string(),
        message,
    );

    if let Some(phone) = &user.phone {
        state.sms.send_detached(
            phone.clone(),
            format!(
                "Hi {}, your yoga plan \"{}\" is ready! Stay consistent \u{1F9D8}\u{200D}\u{2642}\u{FE0F}",
                user.name, plan.plan_name
            ),
        );
    }
}
