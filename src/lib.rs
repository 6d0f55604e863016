// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Yoga Planner: plan and track a personal yoga practice
//!
//! This crate provides the backend API for account management (email
//! verification, sessions, password reset) and practice plans.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod validation;

use config::Config;
use db::MongoDb;
use middleware::RateLimits;
use services::{AccountService, Mailer, SmsClient};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: MongoDb,
    pub mailer: Mailer,
    pub sms: SmsClient,
    pub account: AccountService,
    pub limits: RateLimits,
}
