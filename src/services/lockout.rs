//! Login-attempt lockout policy.
//!
//! Pure transition logic over the counters persisted on the account record.
//! The caller rejects locked accounts before any password comparison runs,
//! so a lockout never leaks credential timing and never inflates the
//! counter. The increment itself is read-then-write; two concurrent
//! failures against one account can under-count. Documented, not corrected.

use mongodb::bson::DateTime;

/// Failures allowed before the account locks.
pub const MAX_LOGIN_ATTEMPTS: i32 = 5;
/// How long a lock lasts.
pub const LOCK_DURATION_HOURS: i64 = 2;

/// What to persist after a failed password check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedLoginOutcome {
    /// A previous lock has lapsed: restart the counter at 1 and clear the
    /// lock timestamp.
    ResetStale,
    /// Record the failure. `lock_at` is set when this failure is the one
    /// that reaches the cap.
    Count {
        attempts: i32,
        lock_at: Option<DateTime>,
    },
}

/// Whether a lock timestamp is active at `now`.
pub fn is_locked(lock_until: Option<DateTime>, now: DateTime) -> bool {
    matches!(lock_until, Some(until) if until > now)
}

/// Transition for a failed password check.
pub fn on_failed_login(
    attempts: i32,
    lock_until: Option<DateTime>,
    now: DateTime,
) -> FailedLoginOutcome {
    if let Some(until) = lock_until {
        if until < now {
            return FailedLoginOutcome::ResetStale;
        }
    }

    let attempts = attempts + 1;
    let lock_at = if attempts >= MAX_LOGIN_ATTEMPTS && !is_locked(lock_until, now) {
        Some(DateTime::from_millis(
            now.timestamp_millis() + LOCK_DURATION_HOURS * 3_600_000,
        ))
    } else {
        None
    };

    FailedLoginOutcome::Count { attempts, lock_at }
}

/// Whether a successful login needs to clear lockout state.
pub fn needs_reset(attempts: i32, lock_until: Option<DateTime>) -> bool {
    attempts > 0 || lock_until.is_some()
}
