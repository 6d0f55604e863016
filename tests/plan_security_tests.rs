// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Plan CRUD, ownership, and stats tests against a real MongoDB instance.
//!
//! Run with: MONGO_TEST_URI=mongodb://localhost:27017 cargo test

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};
use tower::ServiceExt;
use yoga_planner::AppState;

async fn request_with_cookie(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: &str,
    body: Option<Value>,
) -> axum::response::Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

async fn post_plan(app: &Router, cookie: &str, body: Value) -> axum::response::Response {
    request_with_cookie(app, Method::POST, "/plans", cookie, Some(body)).await
}

async fn list_plans(app: &Router, cookie: &str) -> Value {
    let response = request_with_cookie(app, Method::GET, "/plans", cookie, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    common::body_json(response).await
}

/// Register an account, verify it directly in the database, and log in.
/// Returns the session cookie for subsequent requests.
async fn signed_in_user(app: &Router, state: &Arc<AppState>, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/users/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "Asha Rao",
                        "email": email,
                        "password": "Password1!"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let user = state
        .db
        .find_user_by_email(email)
        .await
        .unwrap()
        .expect("registered user should exist");
    state.db.mark_verified_clear_otp(user.id).await.unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/users/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"email": email, "password": "Password1!"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login should set a session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn sample_plan() -> Value {
    json!({
        "planName": "Morning Flow",
        "yogaType": "Vinyasa",
        "meditationTime": 15,
        "durationWeeks": 8
    })
}

async fn create_plan_id(app: &Router, cookie: &str, body: Value) -> String {
    let response = post_plan(app, cookie, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = common::body_json(response).await;
    body["plan"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_plan_returns_created_plan() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let cookie = signed_in_user(&app, &state, "plans@example.com").await;

    let response = post_plan(
        &app,
        &cookie,
        json!({
            "planName": "Morning Flow",
            "yogaType": "Vinyasa",
            "meditationTime": 15,
            "durationWeeks": 8,
            "dailySchedule": ["Mon 7am", "Wed 7am"],
            "notes": "Focus on breathing"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = common::body_json(response).await;
    assert_eq!(body["message"], "Plan created successfully");

    let plan = &body["plan"];
    assert_eq!(plan["planName"], "Morning Flow");
    assert_eq!(plan["yogaType"], "Vinyasa");
    assert_eq!(plan["meditationTime"], 15);
    assert_eq!(plan["durationWeeks"], 8);
    assert_eq!(plan["dailySchedule"], json!(["Mon 7am", "Wed 7am"]));
    assert_eq!(plan["notes"], "Focus on breathing");
    assert_eq!(plan["completed"], false);
    assert!(plan["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(plan["createdAt"].as_str().is_some());
}

#[tokio::test]
async fn test_create_plan_fills_defaults() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let cookie = signed_in_user(&app, &state, "defaults@example.com").await;

    let response = post_plan(&app, &cookie, sample_plan()).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = common::body_json(response).await;
    assert_eq!(body["plan"]["dailySchedule"], json!([]));
    assert!(body["plan"]["notes"].is_null());
    assert_eq!(body["plan"]["completed"], false);
}

#[tokio::test]
async fn test_list_plans_newest_first() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let cookie = signed_in_user(&app, &state, "list@example.com").await;

    let mut first = sample_plan();
    first["planName"] = json!("Evening Wind Down");
    create_plan_id(&app, &cookie, first).await;
    // Insertion timestamps have millisecond resolution; keep the two apart.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let mut second = sample_plan();
    second["planName"] = json!("Sunrise Stretch");
    create_plan_id(&app, &cookie, second).await;

    let plans = list_plans(&app, &cookie).await;
    let plans = plans.as_array().expect("list response should be an array");
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0]["planName"], "Sunrise Stretch");
    assert_eq!(plans[1]["planName"], "Evening Wind Down");
}

#[tokio::test]
async fn test_list_is_scoped_to_owner() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let owner = signed_in_user(&app, &state, "owner@example.com").await;
    let other = signed_in_user(&app, &state, "other@example.com").await;

    create_plan_id(&app, &owner, sample_plan()).await;

    let own = list_plans(&app, &owner).await;
    assert_eq!(own.as_array().unwrap().len(), 1);
    let theirs = list_plans(&app, &other).await;
    assert_eq!(theirs.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_complete_plan() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let cookie = signed_in_user(&app, &state, "complete@example.com").await;
    let plan_id = create_plan_id(&app, &cookie, sample_plan()).await;

    let response = request_with_cookie(
        &app,
        Method::PATCH,
        &format!("/plans/{plan_id}/complete"),
        &cookie,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["message"], "Plan marked as completed");
    assert_eq!(body["plan"]["completed"], true);

    let plans = list_plans(&app, &cookie).await;
    assert_eq!(plans[0]["completed"], true);
}

#[tokio::test]
async fn test_delete_plan() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let cookie = signed_in_user(&app, &state, "delete@example.com").await;
    let plan_id = create_plan_id(&app, &cookie, sample_plan()).await;

    let response = request_with_cookie(
        &app,
        Method::DELETE,
        &format!("/plans/{plan_id}"),
        &cookie,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["message"], "Plan deleted successfully");

    let plans = list_plans(&app, &cookie).await;
    assert_eq!(plans.as_array().unwrap().len(), 0);

    // Deleting again finds nothing.
    let response = request_with_cookie(
        &app,
        Method::DELETE,
        &format!("/plans/{plan_id}"),
        &cookie,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = common::body_json(response).await;
    assert_eq!(body["message"], "Plan not found");
}

#[tokio::test]
async fn test_cannot_delete_another_users_plan() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let owner = signed_in_user(&app, &state, "victim@example.com").await;
    let attacker = signed_in_user(&app, &state, "attacker@example.com").await;
    let plan_id = create_plan_id(&app, &owner, sample_plan()).await;

    let response = request_with_cookie(
        &app,
        Method::DELETE,
        &format!("/plans/{plan_id}"),
        &attacker,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = common::body_json(response).await;
    assert_eq!(
        body["message"],
        "Unauthorized: You can only delete your own plans"
    );

    // The plan must survive the attempt.
    let plans = list_plans(&app, &owner).await;
    assert_eq!(plans.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cannot_complete_another_users_plan() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let owner = signed_in_user(&app, &state, "mine@example.com").await;
    let attacker = signed_in_user(&app, &state, "sneaky@example.com").await;
    let plan_id = create_plan_id(&app, &owner, sample_plan()).await;

    let response = request_with_cookie(
        &app,
        Method::PATCH,
        &format!("/plans/{plan_id}/complete"),
        &attacker,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = common::body_json(response).await;
    assert_eq!(
        body["message"],
        "Unauthorized: You can only modify your own plans"
    );

    let plans = list_plans(&app, &owner).await;
    assert_eq!(plans[0]["completed"], false);
}

#[tokio::test]
async fn test_unknown_plan_id_returns_not_found() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let cookie = signed_in_user(&app, &state, "unknown@example.com").await;

    let missing = ObjectId::new().to_hex();
    let response = request_with_cookie(
        &app,
        Method::DELETE,
        &format!("/plans/{missing}"),
        &cookie,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = common::body_json(response).await;
    assert_eq!(body["message"], "Plan not found");
}

#[tokio::test]
async fn test_malformed_plan_id_returns_not_found() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let cookie = signed_in_user(&app, &state, "malformed@example.com").await;

    // Not a valid ObjectId; treated the same as a missing plan.
    let response =
        request_with_cookie(&app, Method::DELETE, "/plans/not-an-id", &cookie, None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = common::body_json(response).await;
    assert_eq!(body["message"], "Plan not found");
}

#[tokio::test]
async fn test_plan_stats() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let cookie = signed_in_user(&app, &state, "stats@example.com").await;

    for name in ["Plan One", "Plan Two", "Plan Three"] {
        let mut body = sample_plan();
        body["planName"] = json!(name);
        create_plan_id(&app, &cookie, body).await;
    }
    let plans = list_plans(&app, &cookie).await;
    let first_id = plans[0]["id"].as_str().unwrap().to_string();
    let response = request_with_cookie(
        &app,
        Method::PATCH,
        &format!("/plans/{first_id}/complete"),
        &cookie,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = request_with_cookie(&app, Method::GET, "/plans/stats", &cookie, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = common::body_json(response).await;
    assert_eq!(stats["totalPlans"], 3);
    assert_eq!(stats["completedPlans"], 1);
    assert_eq!(stats["pendingPlans"], 2);
    assert_eq!(stats["completionRate"], 33.33);
}

#[tokio::test]
async fn test_plan_stats_empty() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let cookie = signed_in_user(&app, &state, "nostats@example.com").await;

    let response = request_with_cookie(&app, Method::GET, "/plans/stats", &cookie, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = common::body_json(response).await;
    assert_eq!(stats["totalPlans"], 0);
    assert_eq!(stats["completedPlans"], 0);
    assert_eq!(stats["pendingPlans"], 0);
    assert_eq!(stats["completionRate"], 0.0);
}

#[tokio::test]
async fn test_create_plan_requires_all_fields() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let cookie = signed_in_user(&app, &state, "fields@example.com").await;

    let response = post_plan(&app, &cookie, json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["message"], "Validation failed");

    let errors = body["errors"].as_array().unwrap();
    let message_for = |field: &str| {
        errors
            .iter()
            .find(|e| e["field"] == field)
            .unwrap_or_else(|| panic!("no error for {field}: {errors:?}"))["message"]
            .as_str()
            .unwrap()
            .to_string()
    };
    assert_eq!(message_for("planName"), "Plan name is required");
    assert_eq!(message_for("yogaType"), "Yoga type is required");
    assert_eq!(message_for("meditationTime"), "Meditation time is required");
    assert_eq!(message_for("durationWeeks"), "Duration is required");
}

#[tokio::test]
async fn test_create_plan_range_validation() {
    require_mongo!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db);
    let cookie = signed_in_user(&app, &state, "ranges@example.com").await;

    let response = post_plan(
        &app,
        &cookie,
        json!({
            "planName": "Morning Flow",
            "yogaType": "Vinyasa",
            "meditationTime": 200,
            "durationWeeks": 60,
            "notes": "x".repeat(1001)
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    let messages: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["message"].as_str())
        .collect();
    assert!(messages.contains(&"Meditation time must be between 1-180 minutes"));
    assert!(messages.contains(&"Duration must be between 1-52 weeks"));
    assert!(messages.contains(&"Notes cannot exceed 1000 characters"));
}

#[tokio::test]
async fn test_plan_routes_require_session() {
    // No database needed: auth middleware rejects before any lookup happens.
    let (app, _state) = common::create_test_app();

    let cases = [
        (Method::POST, "/plans"),
        (Method::GET, "/plans"),
        (Method::GET, "/plans/stats"),
        (Method::DELETE, "/plans/0123456789abcdef01234567"),
        (Method::PATCH, "/plans/0123456789abcdef01234567/complete"),
    ];
    for (method, uri) in cases {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method.clone())
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri} should require a session"
        );
        let body = common::body_json(response).await;
        assert_eq!(body["message"], "Not authorized, no token");
    }
}
