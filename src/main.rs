// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Yoga Planner API Server
//!
//! Manages yoga practice plans: account registration with email
//! verification, session login, and CRUD over each user's plans.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yoga_planner::{
    config::Config,
    db::MongoDb,
    middleware::RateLimits,
    services::{AccountService, Mailer, SmsClient},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        verification = ?config.verification_mode,
        "Starting Yoga Planner API"
    );

    // Connect to MongoDB and make sure the unique indexes exist
    let db = MongoDb::new(&config.mongo_uri, &config.mongo_db)
        .await
        .expect("Failed to connect to MongoDB");
    db.ensure_indexes()
        .await
        .expect("Failed to create MongoDB indexes");
    tracing::info!(database = %config.mongo_db, "MongoDB connected");

    // Outbound notification channels
    let mailer = Mailer::new(&config).expect("Failed to initialize SMTP transport");
    let sms = SmsClient::new(&config);

    let account = AccountService::new(db.clone(), mailer.clone(), &config);

    let limits = RateLimits::new();

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        mailer,
        sms,
        account,
        limits,
    });

    // Expired rate-limit windows accumulate until pruned
    let prune_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(15 * 60));
        loop {
            interval.tick().await;
            prune_state.limits.prune();
        }
    });

    // Build router
    let app = yoga_planner::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("yoga_planner=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
