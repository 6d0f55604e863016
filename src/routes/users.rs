// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Account routes: registration, verification, sessions, password reset,
//! and profile management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::VerificationMode;
use crate::error::{AppError, Result};
use crate::middleware::auth::{
    clear_session_cookie, create_session_token, require_auth, session_cookie, AuthUser,
};
use crate::middleware::rate_limit::{limit_auth, limit_password_reset, limit_verification};
use crate::models::user::ProfileChanges;
use crate::models::{FitnessLevel, UserProfile};
use crate::routes::{trimmed, MessageResponse};
use crate::services::NewAccount;
use crate::validation::{
    email_validator, fitness_level_validator, name_validator, optional_email_validator,
    optional_name_validator, phone_validator, strict_phone_validator, strong_password_validator,
};
use crate::AppState;

/// Account routes, grouped by the rate-limit policy each group carries.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let credentials = Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route_layer(middleware::from_fn_with_state(state.clone(), limit_auth));

    let verification = Router::new()
        .route("/users/resend-otp", post(resend_otp))
        .route("/users/resend-verification", post(resend_verification))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            limit_verification,
        ));

    let reset = Router::new()
        .route("/users/forgot-password", post(forgot_password))
        .route("/users/reset-password/{token}", post(reset_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            limit_password_reset,
        ));

    let open = Router::new()
        .route("/users/logout", post(logout))
        .route("/users/verify-otp", post(verify_otp))
        .route("/users/verify-email/{token}", get(verify_email));

    let account = Router::new()
        .route("/users/me", get(get_me))
        .route("/users/profile", put(update_profile))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .merge(credentials)
        .merge(verification)
        .merge(reset)
        .merge(open)
        .merge(account)
}

// ─── Registration ────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(custom(function = "name_validator"))]
    pub name: String,

    #[serde(default)]
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(custom(function = "phone_validator"))]
    pub phone: Option<String>,

    #[validate(range(min = 13, max = 120, message = "Age must be between 13 and 120"))]
    pub age: Option<i32>,

    #[validate(custom(function = "fitness_level_validator"))]
    pub fitness_level: Option<String>,

    #[validate(length(max = 200, message = "Goal cannot exceed 200 characters"))]
    pub goal: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegisterResponse {
    pub message: String,
    pub requires_verification: bool,
    pub email: String,
}

/// Create an unverified account and send the verification email.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    payload.validate()?;

    let data = NewAccount {
        name: payload.name.trim().to_string(),
        email: payload.email,
        password: payload.password,
        phone: trimmed(payload.phone),
        age: payload.age,
        fitness_level: payload
            .fitness_level
            .as_deref()
            .map(str::trim)
            .and_then(FitnessLevel::from_name),
        goal: trimmed(payload.goal),
    };

    let email = state.account.register(data).await?;

    let message = match state.account.verification_mode() {
        VerificationMode::Otp => {
            "Registration successful! Please check your email for the OTP verification code."
        }
        VerificationMode::Link => {
            "Registration successful! Please check your email to verify your account."
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: message.to_string(),
            requires_verification: true,
            email,
        }),
    ))
}

// ─── Sessions ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserProfile,
}

/// Authenticate and set the session cookie.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    payload.validate()?;

    let user = state
        .account
        .login(&payload.email, &payload.password)
        .await?;

    let token = create_session_token(user.id, &state.config.jwt_secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {e}")))?;
    let jar = jar.add(session_cookie(token, state.config.environment));

    Ok((
        jar,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            user: UserProfile::from(&user),
        }),
    ))
}

/// Clear the session cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.add(clear_session_cookie(state.config.environment));
    (
        jar,
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}

// ─── Verification ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OtpResponse {
    pub message: String,
    pub success: bool,
}

/// Check a one-time code and mark the account verified.
async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<OtpResponse>> {
    if payload.email.trim().is_empty() || payload.otp.trim().is_empty() {
        return Err(AppError::BadRequest("Email and OTP are required".to_string()));
    }

    state
        .account
        .verify_otp(&payload.email, payload.otp.trim())
        .await?;

    Ok(Json(OtpResponse {
        message: "Email verified successfully! You can now login.".to_string(),
        success: true,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[serde(default)]
    #[validate(custom(function = "email_validator"))]
    pub email: String,
}

/// Issue and send a fresh one-time code.
async fn resend_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<OtpResponse>> {
    payload.validate()?;
    state.account.resend_otp(&payload.email).await?;

    Ok(Json(OtpResponse {
        message: "OTP has been resent to your email".to_string(),
        success: true,
    }))
}

/// Consume an emailed verification link token.
async fn verify_email(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.account.verify_email(&token).await?;

    Ok(Json(MessageResponse {
        message: "Email verified successfully! You can now log in.".to_string(),
    }))
}

/// Issue and send a fresh verification link.
async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    payload.validate()?;
    state.account.resend_verification(&payload.email).await?;

    Ok(Json(MessageResponse {
        message: "Verification email sent! Please check your inbox.".to_string(),
    }))
}

// ─── Password Reset ──────────────────────────────────────────

/// Request a reset link. The response is identical whether or not the
/// email belongs to an account.
async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    payload.validate()?;
    state.account.forgot_password(&payload.email).await?;

    Ok(Json(MessageResponse {
        message: "If a user with that email exists, a password reset link has been sent."
            .to_string(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        custom(function = "strong_password_validator")
    )]
    pub password: String,
}

/// Consume a reset token and install the new password.
async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    payload.validate()?;
    state.account.reset_password(&token, &payload.password).await?;

    Ok(Json(MessageResponse {
        message: "Password reset successful! You can now log in with your new password."
            .to_string(),
    }))
}

// ─── Profile ─────────────────────────────────────────────────

/// Get current user profile.
async fn get_me(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(custom(function = "optional_name_validator"))]
    pub name: Option<String>,

    #[validate(custom(function = "optional_email_validator"))]
    pub email: Option<String>,

    #[validate(custom(function = "strict_phone_validator"))]
    pub phone: Option<String>,

    #[validate(range(min = 13, max = 120, message = "Age must be between 13 and 120"))]
    pub age: Option<i32>,

    #[validate(custom(function = "fitness_level_validator"))]
    pub fitness_level: Option<String>,

    #[validate(length(max = 200, message = "Goal cannot exceed 200 characters"))]
    pub goal: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub user: UserProfile,
}

/// Merge-patch the caller's profile. Omitted fields keep their values.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>> {
    payload.validate()?;

    let changes = ProfileChanges {
        name: trimmed(payload.name),
        email: payload.email,
        phone: trimmed(payload.phone),
        age: payload.age,
        fitness_level: payload
            .fitness_level
            .as_deref()
            .map(str::trim)
            .and_then(FitnessLevel::from_name),
        goal: trimmed(payload.goal),
    };

    let (profile, email_changed) = state.account.update_profile(&user, changes).await?;

    let message = if email_changed {
        "Profile updated successfully. Please verify your new email address."
    } else {
        "Profile updated successfully"
    };

    Ok(Json(UpdateProfileResponse {
        message: message.to_string(),
        user: profile,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_collects_field_errors() {
        let payload = RegisterRequest {
            name: "J".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            phone: Some("abc".to_string()),
            age: Some(12),
            fitness_level: Some("expert".to_string()),
            goal: None,
        };

        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("age"));
        assert!(fields.contains_key("fitness_level"));
    }

    #[test]
    fn test_register_request_accepts_minimal_payload() {
        let payload = RegisterRequest {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            password: "password123".to_string(),
            phone: None,
            age: None,
            fitness_level: None,
            goal: None,
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_reset_password_requires_strength() {
        let weak = ResetPasswordRequest {
            password: "alllowercase1@".to_string(),
        };
        assert!(weak.validate().is_err());

        let strong = ResetPasswordRequest {
            password: "NewPass123!".to_string(),
        };
        assert!(strong.validate().is_ok());
    }
}
