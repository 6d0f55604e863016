// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Verification token, password-reset token, and OTP generation.
//!
//! Link tokens are 32 random bytes, hex encoded. Only the sha-256 digest is
//! persisted; the raw value goes out once, embedded in a URL. A fast hash is
//! fine here because the raw token is unguessable and short-lived, unlike a
//! password. OTPs are uniform 6-digit codes and are persisted the same way.

use mongodb::bson::DateTime;
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Emailed verification links stay valid for 24 hours.
pub const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
/// Password-reset links stay valid for 1 hour.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;
/// One-time codes stay valid for 10 minutes.
pub const OTP_TTL_MINUTES: i64 = 10;
/// Wrong guesses allowed against one code before it is burned.
pub const OTP_MAX_ATTEMPTS: i32 = 3;

/// A freshly generated token: the raw value to hand to the user and the
/// digest to persist.
pub struct IssuedToken {
    pub raw: String,
    pub digest: String,
}

/// Generate a link token (64 hex chars of fresh randomness).
pub fn generate_token() -> IssuedToken {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    let raw = hex::encode(bytes);
    let digest = sha256_hex(&raw);
    IssuedToken { raw, digest }
}

/// Generate a uniform 6-digit one-time code.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Hex-encoded sha-256 digest, the stored form of tokens and OTPs.
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a candidate raw value against a stored digest without leaking
/// the mismatch position through timing.
pub fn digest_matches(candidate: &str, stored_digest: &str) -> bool {
    let candidate_digest = sha256_hex(candidate);
    candidate_digest
        .as_bytes()
        .ct_eq(stored_digest.as_bytes())
        .into()
}

/// Expiry timestamp `minutes` from `now`.
pub fn expiry_after_minutes(now: DateTime, minutes: i64) -> DateTime {
    DateTime::from_millis(now.timestamp_millis() + minutes * 60_000)
}

/// Expiry timestamp `hours` from `now`.
pub fn expiry_after_hours(now: DateTime, hours: i64) -> DateTime {
    expiry_after_minutes(now, hours * 60)
}
