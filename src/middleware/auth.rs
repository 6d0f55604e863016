// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! JWT session middleware and cookie construction.

use crate::config::Environment;
use crate::error::AppError;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// Session lifetime, shared by the JWT expiry and the cookie Max-Age.
pub const SESSION_TTL_DAYS: i64 = 7;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id, hex)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user resolved from the session token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Middleware that requires a valid session.
///
/// The account is looked up on every request, so a deleted account is
/// rejected even while its token is still within its lifetime.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") => h[7..].to_string(),
            _ => {
                return Err(AppError::Unauthorized(
                    "Not authorized, no token".to_string(),
                ))
            }
        }
    };

    let key = DecodingKey::from_secret(&state.config.jwt_secret);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(&token, &key, &validation)
        .map_err(|_| AppError::Unauthorized("Token invalid or expired".to_string()))?;

    let user_id = ObjectId::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::Unauthorized("Token invalid or expired".to_string()))?;

    let user = state
        .db
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    request.extensions_mut().insert(AuthUser(user));

    Ok(next.run(request).await)
}

/// Create a JWT for a user session.
pub fn create_session_token(user_id: ObjectId, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_hex(),
        iat: now,
        exp: now + (SESSION_TTL_DAYS as usize) * 24 * 60 * 60,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Build the session cookie for a fresh login.
///
/// Production serves the API and the frontend from different origins, so
/// the cookie must be SameSite=None and Secure to ride along on cross-site
/// requests. Development stays same-site over plain HTTP.
pub fn session_cookie(token: String, environment: Environment) -> Cookie<'static> {
    base_cookie(token, environment)
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// Build an expired cookie that clears the session. Attributes must match
/// the login cookie or browsers keep the old one.
pub fn clear_session_cookie(environment: Environment) -> Cookie<'static> {
    base_cookie(String::new(), environment)
        .max_age(time::Duration::ZERO)
        .build()
}

fn base_cookie(
    value: String,
    environment: Environment,
) -> cookie::CookieBuilder<'static> {
    let production = environment.is_production();
    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .path("/")
        .secure(production)
        .same_site(if production {
            SameSite::None
        } else {
            SameSite::Strict
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_development_attributes() {
        let cookie = session_cookie("abc123".to_string(), Environment::Development);
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_ne!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    }

    #[test]
    fn test_session_cookie_production_is_cross_site() {
        let cookie = session_cookie("abc123".to_string(), Environment::Production);
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(Environment::Development);
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }

    #[test]
    fn test_session_token_round_trip() {
        let key = b"test-signing-key";
        let id = ObjectId::new();
        let token = create_session_token(id, key).unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(key),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, id.to_hex());
        assert!(decoded.claims.exp > decoded.claims.iat);
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 7 * 24 * 60 * 60);
    }
}
