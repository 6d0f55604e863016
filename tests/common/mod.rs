// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use yoga_planner::config::Config;
use yoga_planner::db::MongoDb;
use yoga_planner::middleware::RateLimits;
use yoga_planner::routes::create_router;
use yoga_planner::services::{AccountService, Mailer, SmsClient};
use yoga_planner::AppState;

/// Check if a MongoDB test instance is available via environment variable.
#[allow(dead_code)]
pub fn mongo_available() -> bool {
    std::env::var("MONGO_TEST_URI").is_ok()
}

/// Skip test with message if MongoDB not available.
#[macro_export]
macro_rules! require_mongo {
    () => {
        if !crate::common::mongo_available() {
            eprintln!("⚠️  Skipping: MONGO_TEST_URI not set");
            return;
        }
    };
}

/// Create a test database connection against the MONGO_TEST_URI instance.
///
/// Every call uses a fresh database name, so tests never see each other's
/// documents and the unique indexes start empty.
#[allow(dead_code)]
pub async fn test_db() -> MongoDb {
    let uri = std::env::var("MONGO_TEST_URI").expect("MONGO_TEST_URI not set");
    let name = format!("yoga-planner-test-{}", ObjectId::new().to_hex());
    let db = MongoDb::new(&uri, &name)
        .await
        .expect("Failed to connect to MongoDB test instance");
    db.ensure_indexes()
        .await
        .expect("Failed to create MongoDB indexes");
    db
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> MongoDb {
    MongoDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::default(), test_db_offline(), Mailer::new_mock())
}

/// Create a test app over a live database (see [`test_db`]).
#[allow(dead_code)]
pub fn create_test_app_with_db(db: MongoDb) -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::default(), db, Mailer::new_mock())
}

/// Assemble a router and shared state from the given parts.
#[allow(dead_code)]
pub fn create_test_app_with(
    config: Config,
    db: MongoDb,
    mailer: Mailer,
) -> (axum::Router, Arc<AppState>) {
    let sms = SmsClient::new_mock();
    let account = AccountService::new(db.clone(), mailer.clone(), &config);

    let state = Arc::new(AppState {
        config,
        db,
        mailer,
        sms,
        account,
        limits: RateLimits::new(),
    });

    (create_router(state.clone()), state)
}

/// Create a session token for a user id with the test signing key.
#[allow(dead_code)]
pub fn create_test_token(user_id: ObjectId, signing_key: &[u8]) -> String {
    yoga_planner::middleware::auth::create_session_token(user_id, signing_key)
        .expect("Failed to create session token")
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body is not valid JSON")
}
