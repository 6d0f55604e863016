// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Per-IP rate limiting.
//!
//! Fixed windows keyed by client IP. The auth limiter counts only failed
//! responses, so legitimate logins never consume its small budget; the
//! other policies count every request.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::AppError;
use crate::AppState;

const API_MAX: u32 = 100;
const AUTH_MAX: u32 = 5;
const RESET_MAX: u32 = 3;
const VERIFICATION_MAX: u32 = 3;

const QUARTER_HOUR: Duration = Duration::from_secs(15 * 60);
const ONE_HOUR: Duration = Duration::from_secs(60 * 60);

/// Outcome of a limiter check.
#[derive(Debug, PartialEq)]
pub enum Decision {
    Allowed,
    Blocked { retry_after: u64 },
}

struct Window {
    started: Instant,
    count: u32,
}

/// One fixed-window policy.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max: u32,
    window: Duration,
    message: &'static str,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration, message: &'static str) -> Self {
        Self {
            windows: DashMap::new(),
            max,
            window,
            message,
        }
    }

    /// Count a hit and decide.
    pub fn hit(&self, key: &str) -> Decision {
        self.hit_at(key, Instant::now())
    }

    /// Decide without counting. Used by failures-only policies, which
    /// record after seeing the response status.
    pub fn peek(&self, key: &str) -> Decision {
        self.peek_at(key, Instant::now())
    }

    /// Count a hit without deciding.
    pub fn record(&self, key: &str) {
        self.hit_at(key, Instant::now());
    }

    /// Drop windows that have already expired.
    pub fn prune(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, w| now.duration_since(w.started) < self.window);
    }

    fn hit_at(&self, key: &str, now: Instant) -> Decision {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max {
            return Decision::Blocked {
                retry_after: self.retry_after(entry.started, now),
            };
        }

        entry.count += 1;
        Decision::Allowed
    }

    fn peek_at(&self, key: &str, now: Instant) -> Decision {
        if let Some(entry) = self.windows.get(key) {
            if now.duration_since(entry.started) < self.window && entry.count >= self.max {
                return Decision::Blocked {
                    retry_after: self.retry_after(entry.started, now),
                };
            }
        }
        Decision::Allowed
    }

    fn retry_after(&self, started: Instant, now: Instant) -> u64 {
        let remaining = self.window.saturating_sub(now.duration_since(started));
        remaining.as_secs().max(1)
    }

    fn blocked_error(&self, key: &str, retry_after: u64) -> AppError {
        tracing::warn!(ip = %key, message = self.message, "Rate limit exceeded");
        AppError::RateLimited {
            message: self.message.to_string(),
            retry_after,
        }
    }
}

/// The limiter policies applied across the API.
pub struct RateLimits {
    pub api: RateLimiter,
    pub auth: RateLimiter,
    pub password_reset: RateLimiter,
    pub verification: RateLimiter,
}

impl RateLimits {
    pub fn new() -> Self {
        Self {
            api: RateLimiter::new(
                API_MAX,
                QUARTER_HOUR,
                "Too many requests from this IP, please try again after 15 minutes",
            ),
            auth: RateLimiter::new(
                AUTH_MAX,
                QUARTER_HOUR,
                "Too many login/registration attempts from this IP, please try again after 15 minutes",
            ),
            password_reset: RateLimiter::new(
                RESET_MAX,
                ONE_HOUR,
                "Too many password reset attempts from this IP, please try again after an hour",
            ),
            verification: RateLimiter::new(
                VERIFICATION_MAX,
                ONE_HOUR,
                "Too many verification email requests from this IP, please try again after an hour",
            ),
        }
    }

    /// Drop expired windows across every policy.
    pub fn prune(&self) {
        self.api.prune();
        self.auth.prune();
        self.password_reset.prune();
        self.verification.prune();
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new()
    }
}

/// Global limit on all API traffic.
pub async fn limit_api(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);
    match state.limits.api.hit(&ip) {
        Decision::Allowed => Ok(next.run(request).await),
        Decision::Blocked { retry_after } => Err(state.limits.api.blocked_error(&ip, retry_after)),
    }
}

/// Tight limit on credential endpoints, counting only failures.
pub async fn limit_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);
    if let Decision::Blocked { retry_after } = state.limits.auth.peek(&ip) {
        return Err(state.limits.auth.blocked_error(&ip, retry_after));
    }

    let response = next.run(request).await;
    if response.status().is_client_error() || response.status().is_server_error() {
        state.limits.auth.record(&ip);
    }
    Ok(response)
}

/// Limit on password reset requests and submissions.
pub async fn limit_password_reset(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);
    match state.limits.password_reset.hit(&ip) {
        Decision::Allowed => Ok(next.run(request).await),
        Decision::Blocked { retry_after } => Err(state
            .limits
            .password_reset
            .blocked_error(&ip, retry_after)),
    }
}

/// Limit on verification resends.
pub async fn limit_verification(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);
    match state.limits.verification.hit(&ip) {
        Decision::Allowed => Ok(next.run(request).await),
        Decision::Blocked { retry_after } => Err(state
            .limits
            .verification
            .blocked_error(&ip, retry_after)),
    }
}

/// Client IP: first X-Forwarded-For hop (set by the proxy in production),
/// then the socket address, then a shared bucket.
fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
