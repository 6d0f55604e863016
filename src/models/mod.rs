// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Data models for the application.

pub mod plan;
pub mod user;

pub use plan::{Plan, PlanResponse};
pub use user::{FitnessLevel, User, UserProfile};
