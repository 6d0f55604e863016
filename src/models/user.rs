//! Account model for storage and API.

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::format_bson_rfc3339;

/// Self-reported fitness level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl FitnessLevel {
    /// Parse the lowercase wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

/// Stored account record in the `users` collection.
///
/// Optional fields are omitted from the document when absent so that the
/// sparse unique index on `phone` only covers accounts that carry one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Display name (2-50 chars, letters and spaces)
    pub name: String,
    /// Login identity, stored trimmed and lowercased; unique
    pub email: String,
    /// bcrypt digest; never serialized into an API response
    pub password_hash: String,
    /// Optional phone number; unique among accounts that have one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness_level: Option<FitnessLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,

    /// Whether the email has been verified
    #[serde(default)]
    pub is_verified: bool,

    // ─── OTP verification state ──────────────────────────────────
    /// sha-256 hex of the active one-time code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_expires: Option<DateTime>,
    /// Wrong guesses against the active code
    #[serde(default)]
    pub otp_attempts: i32,

    // ─── Link verification state ─────────────────────────────────
    /// sha-256 hex of the emailed verification token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_token_expires: Option<DateTime>,

    // ─── Password reset state ────────────────────────────────────
    /// sha-256 hex of the emailed reset token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_password_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_password_expires: Option<DateTime>,

    // ─── Lockout state ───────────────────────────────────────────
    /// Consecutive failed logins since the last success
    #[serde(default)]
    pub login_attempts: i32,
    /// Set while the account is locked out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_until: Option<DateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    /// Whether the account is currently locked out of login.
    pub fn is_locked(&self, now: DateTime) -> bool {
        matches!(self.lock_until, Some(until) if until > now)
    }
}

/// Field changes for a profile update. `None` leaves the stored value
/// untouched (merge-patch semantics).
#[derive(Debug, Default, Clone)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub age: Option<i32>,
    pub fitness_level: Option<FitnessLevel>,
    pub goal: Option<String>,
}

/// Account profile as returned by the API. Excludes every credential and
/// security field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub age: Option<i32>,
    pub fitness_level: Option<FitnessLevel>,
    pub goal: Option<String>,
    pub is_verified: bool,
    /// RFC3339, absent until the first login
    pub last_login: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            age: user.age,
            fitness_level: user.fitness_level,
            goal: user.goal.clone(),
            is_verified: user.is_verified,
            last_login: user.last_login.map(format_bson_rfc3339),
        }
    }
}
