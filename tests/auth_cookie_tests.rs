// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Session cookie attribute tests.
//!
//! These tests verify the cookie removal attributes on logout match the
//! creation attributes for development and production deployments. Browsers
//! only replace a cookie when the attributes line up.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use tower::ServiceExt;
use yoga_planner::config::{Config, Environment};

mod common;

fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

async fn logout(app: axum::Router) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/users/logout")
            .header(header::COOKIE, "token=whatever")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_logout_clears_cookie_development_attributes() {
    let (app, _) = common::create_test_app();

    let response = logout(app).await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies = set_cookie_headers(&response);
    let token_cookie = find_cookie(&set_cookies, "token");

    assert!(token_cookie.contains("Path=/"));
    assert!(token_cookie.contains("HttpOnly"));
    assert!(token_cookie.contains("SameSite=Strict"));
    assert!(token_cookie.contains("Max-Age=0"));
    assert!(!token_cookie.contains("Secure"));
}

#[tokio::test]
async fn test_logout_clears_cookie_production_attributes() {
    let config = Config {
        environment: Environment::Production,
        ..Config::default()
    };
    let (app, _) = common::create_test_app_with(
        config,
        common::test_db_offline(),
        yoga_planner::services::Mailer::new_mock(),
    );

    let response = logout(app).await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies = set_cookie_headers(&response);
    let token_cookie = find_cookie(&set_cookies, "token");

    // Production serves the frontend from a different origin, so the
    // cookie must be cross-site.
    assert!(token_cookie.contains("SameSite=None"));
    assert!(token_cookie.contains("Secure"));
    assert!(token_cookie.contains("HttpOnly"));
    assert!(token_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_logout_without_session_still_succeeds() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/users/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Logout is idempotent; no session required.
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["message"], "Logged out successfully");
}
