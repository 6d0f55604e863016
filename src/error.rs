// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Application error types with consistent API responses.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    /// Verification/reset token or OTP that does not match, has expired,
    /// or has exhausted its attempt budget.
    #[error("{0}")]
    InvalidToken(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// Login against an account that has not completed email verification.
    #[error("Please verify your email before logging in")]
    Unverified { email: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Account is temporarily locked")]
    Locked,

    #[error("{message}")]
    RateLimited { message: String, retry_after: u64 },

    #[error("Database error: {0}")]
    Database(String),

    /// Email/SMS dispatch failure. Carries the user-facing message; the
    /// transport error is logged at the call site.
    #[error("{0}")]
    Notification(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    requires_verification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

/// One rejected request field.
#[derive(Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn field_errors(errors: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    for (field, kind) in errors.errors() {
        if let validator::ValidationErrorsKind::Field(list) = kind {
            for err in list {
                out.push(FieldError {
                    field: camel_case(field),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {field}")),
                });
            }
        }
    }
    out
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after = None;
        let (status, body) = match &self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    message: "Validation failed".to_string(),
                    requires_verification: None,
                    email: None,
                    errors: Some(field_errors(errors)),
                },
            ),
            AppError::BadRequest(msg) | AppError::InvalidToken(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::plain(msg))
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorResponse::plain(msg)),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse::plain(msg)),
            AppError::Unverified { email } => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    message: "Please verify your email with OTP before logging in. Check your inbox for the verification code.".to_string(),
                    requires_verification: Some(true),
                    email: Some(email.clone()),
                    errors: None,
                },
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::plain(msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::plain(msg)),
            AppError::Locked => (
                StatusCode::LOCKED,
                ErrorResponse::plain(
                    "Account is temporarily locked due to multiple failed login attempts. Please try again later.",
                ),
            ),
            AppError::RateLimited {
                message,
                retry_after: secs,
            } => {
                retry_after = Some(*secs);
                (StatusCode::TOO_MANY_REQUESTS, ErrorResponse::plain(message))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::plain("Internal server error"),
                )
            }
            AppError::Notification(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::plain(msg))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::plain("Internal server error"),
                )
            }
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl ErrorResponse {
    fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            requires_verification: None,
            email: None,
            errors: None,
        }
    }
}

/// Validator reports Rust field names; the wire format is camelCase.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_unverified_carries_flag_and_email() {
        let (status, body) = body_json(AppError::Unverified {
            email: "yogi@example.com".to_string(),
        })
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["requiresVerification"], true);
        assert_eq!(body["email"], "yogi@example.com");
    }

    #[tokio::test]
    async fn test_locked_uses_fixed_message() {
        let (status, body) = body_json(AppError::Locked).await;

        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(
            body["message"],
            "Account is temporarily locked due to multiple failed login attempts. Please try again later."
        );
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let err = AppError::RateLimited {
            message: "Too many requests".to_string(),
            retry_after: 900,
        };
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "900");
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let (status, body) = body_json(AppError::Database("connection refused".to_string())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn test_camel_case_field_names() {
        assert_eq!(camel_case("fitness_level"), "fitnessLevel");
        assert_eq!(camel_case("email"), "email");
        assert_eq!(camel_case("daily_schedule"), "dailySchedule");
    }
}
