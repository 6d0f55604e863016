// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Services module - business logic layer.

pub mod account;
pub mod lockout;
pub mod mailer;
pub mod sms;
pub mod tokens;

pub use account::{AccountService, NewAccount};
pub use mailer::Mailer;
pub use sms::SmsClient;
