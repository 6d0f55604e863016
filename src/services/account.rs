// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Account service: registration, verification, login, password reset,
//! and profile updates.
//!
//! One canonical flow, parameterized by [`VerificationMode`]: a deployment
//! issues either OTP codes or link tokens at registration, never both. The
//! verify endpoints act purely on stored state, so a token this deployment
//! never issued simply will not match.

use mongodb::bson::DateTime;

use crate::config::{Config, VerificationMode};
use crate::db::MongoDb;
use crate::error::{AppError, Result};
use crate::models::user::ProfileChanges;
use crate::models::{FitnessLevel, User, UserProfile};
use crate::services::lockout::{self, FailedLoginOutcome};
use crate::services::tokens;
use crate::services::Mailer;

/// bcrypt cost factor for password hashing.
const BCRYPT_COST: u32 = 12;

/// Validated data for a new registration.
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub age: Option<i32>,
    pub fitness_level: Option<FitnessLevel>,
    pub goal: Option<String>,
}

/// Orchestrates every account operation against the store and the mailer.
#[derive(Clone)]
pub struct AccountService {
    db: MongoDb,
    mailer: Mailer,
    verification_mode: VerificationMode,
    frontend_url: String,
}

impl AccountService {
    pub fn new(db: MongoDb, mailer: Mailer, config: &Config) -> Self {
        Self {
            db,
            mailer,
            verification_mode: config.verification_mode,
            frontend_url: config.frontend_url.clone(),
        }
    }

    pub fn verification_mode(&self) -> VerificationMode {
        self.verification_mode
    }

    // ─── Registration & Verification ─────────────────────────────

    /// Register a new unverified account and dispatch the verification
    /// email for the active mode. Returns the normalized email.
    ///
    /// In OTP mode a failed dispatch rolls the account back, making
    /// registration all-or-nothing; in link mode the account is kept so
    /// that a later resend can recover it.
    pub async fn register(&self, data: NewAccount) -> Result<String> {
        let email = normalize_email(&data.email);
        let now = DateTime::now();

        if self.db.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
        if let Some(phone) = &data.phone {
            if self.db.phone_taken(phone, None).await? {
                return Err(AppError::Conflict(
                    "User with this phone number already exists".to_string(),
                ));
            }
        }

        let password_hash = hash_password(&data.password)?;

        let mut user = User {
            id: mongodb::bson::oid::ObjectId::new(),
            name: data.name,
            email: email.clone(),
            password_hash,
            phone: data.phone,
            age: data.age,
            fitness_level: data.fitness_level,
            goal: data.goal,
            is_verified: false,
            otp_hash: None,
            otp_expires: None,
            otp_attempts: 0,
            verification_token: None,
            verification_token_expires: None,
            reset_password_token: None,
            reset_password_expires: None,
            login_attempts: 0,
            lock_until: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        };

        match self.verification_mode {
            VerificationMode::Otp => {
                let otp = tokens::generate_otp();
                user.otp_hash = Some(tokens::sha256_hex(&otp));
                user.otp_expires = Some(tokens::expiry_after_minutes(now, tokens::OTP_TTL_MINUTES));

                self.db.insert_user(&user).await?;

                let message = format!(
                    "Hello {},\n\nThank you for registering with Yoga Planner!\n\n\
                     Your verification code is: {}\n\n\
                     This code will expire in 10 minutes.\n\n\
                     If you didn't register for an account, please ignore this email.\n\n\
                     Best regards,\nYoga Planner Team",
                    user.name, otp
                );
                if self
                    .mailer
                    .send(&email, "Verify Your Email - Yoga Planner", &message)
                    .await
                    .is_err()
                {
                    tracing::warn!(email = %email, "Rolling back registration after email failure");
                    if let Err(delete_err) = self.db.delete_user(user.id).await {
                        tracing::error!(
                            email = %email,
                            error = %delete_err,
                            "Failed to roll back unverified account"
                        );
                    }
                    return Err(AppError::Notification(
                        "Failed to send verification email. Please try again.".to_string(),
                    ));
                }
            }
            VerificationMode::Link => {
                let token = tokens::generate_token();
                user.verification_token = Some(token.digest);
                user.verification_token_expires = Some(tokens::expiry_after_hours(
                    now,
                    tokens::VERIFICATION_TOKEN_TTL_HOURS,
                ));

                self.db.insert_user(&user).await?;

                let url = format!("{}/verify-email/{}", self.frontend_url, token.raw);
                if self
                    .mailer
                    .send_verification_email(&email, &user.name, &url)
                    .await
                    .is_err()
                {
                    // Account stays; resend-verification can recover it.
                    return Err(AppError::Notification(
                        "Failed to send verification email. Please try again.".to_string(),
                    ));
                }
            }
        }

        tracing::info!(email = %email, mode = ?self.verification_mode, "Account registered");
        Ok(email)
    }

    /// Consume an emailed verification token.
    pub async fn verify_email(&self, raw_token: &str) -> Result<()> {
        let digest = tokens::sha256_hex(raw_token);
        let now = DateTime::now();

        let user = self
            .db
            .find_user_by_verification_token(&digest, now)
            .await?
            .ok_or_else(|| {
                AppError::InvalidToken("Invalid or expired verification token".to_string())
            })?;

        self.db.mark_verified_clear_token(user.id).await?;
        tracing::info!(email = %user.email, "Email verified via link");
        Ok(())
    }

    /// Check a one-time code against the stored digest.
    ///
    /// The attempt cap is checked before the comparison, so a correct
    /// guess after three failures still fails.
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<()> {
        let email = normalize_email(email);
        let now = DateTime::now();

        let user = self
            .db
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.is_verified {
            return Err(AppError::BadRequest("Email is already verified".to_string()));
        }

        let (digest, expires) = match (&user.otp_hash, user.otp_expires) {
            (Some(digest), Some(expires)) => (digest, expires),
            _ => {
                return Err(AppError::InvalidToken(
                    "No OTP found. Please request a new one.".to_string(),
                ))
            }
        };

        if expires < now {
            return Err(AppError::InvalidToken(
                "OTP has expired. Please request a new one.".to_string(),
            ));
        }

        if user.otp_attempts >= tokens::OTP_MAX_ATTEMPTS {
            return Err(AppError::InvalidToken(
                "Too many failed attempts. Please request a new OTP.".to_string(),
            ));
        }

        if !tokens::digest_matches(code, digest) {
            self.db.increment_otp_attempts(user.id).await?;
            let remaining = tokens::OTP_MAX_ATTEMPTS - user.otp_attempts - 1;
            return Err(AppError::InvalidToken(format!(
                "Invalid OTP. {remaining} attempts remaining."
            )));
        }

        self.db.mark_verified_clear_otp(user.id).await?;
        tracing::info!(email = %email, "Email verified via OTP");
        Ok(())
    }

    /// Issue and send a fresh one-time code. Rejected when this deployment
    /// issues link tokens instead.
    pub async fn resend_otp(&self, email: &str) -> Result<()> {
        if self.verification_mode != VerificationMode::Otp {
            return Err(AppError::BadRequest(
                "OTP verification is not enabled".to_string(),
            ));
        }

        let email = normalize_email(email);
        let user = self.unverified_user(&email).await?;
        let now = DateTime::now();

        let otp = tokens::generate_otp();
        self.db
            .set_otp_state(
                user.id,
                &tokens::sha256_hex(&otp),
                tokens::expiry_after_minutes(now, tokens::OTP_TTL_MINUTES),
            )
            .await?;

        let message = format!(
            "Hello {},\n\nYour new verification code is: {}\n\n\
             This code will expire in 10 minutes.\n\n\
             If you didn't request this code, please ignore this email.\n\n\
             Best regards,\nYoga Planner Team",
            user.name, otp
        );
        self.mailer
            .send(&email, "Verify Your Email - Yoga Planner", &message)
            .await
            .map_err(|_| AppError::Notification("Failed to resend OTP".to_string()))?;

        tracing::info!(email = %email, "OTP resent");
        Ok(())
    }

    /// Issue and send a fresh verification link. Rejected when this
    /// deployment issues OTP codes instead.
    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        if self.verification_mode != VerificationMode::Link {
            return Err(AppError::BadRequest(
                "Link verification is not enabled".to_string(),
            ));
        }

        let email = normalize_email(email);
        let user = self.unverified_user(&email).await?;
        let now = DateTime::now();

        let token = tokens::generate_token();
        self.db
            .set_verification_token(
                user.id,
                &token.digest,
                tokens::expiry_after_hours(now, tokens::VERIFICATION_TOKEN_TTL_HOURS),
            )
            .await?;

        let url = format!("{}/verify-email/{}", self.frontend_url, token.raw);
        self.mailer
            .send_verification_email(&email, &user.name, &url)
            .await
            .map_err(|_| {
                AppError::Notification("Failed to resend verification email".to_string())
            })?;

        tracing::info!(email = %email, "Verification email resent");
        Ok(())
    }

    /// Look up an account that still needs verification.
    async fn unverified_user(&self, email: &str) -> Result<User> {
        let user = self
            .db
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.is_verified {
            return Err(AppError::BadRequest("Email is already verified".to_string()));
        }
        Ok(user)
    }

    // ─── Login ───────────────────────────────────────────────────

    /// Authenticate an email/password pair.
    ///
    /// Order matters: the lock check runs before the verified check and
    /// before any password comparison, so a locked account neither leaks
    /// credential timing nor inflates its counter. Unknown email and wrong
    /// password produce the identical message.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let now = DateTime::now();

        let Some(mut user) = self.db.find_user_by_email(&email).await? else {
            return Err(AppError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        };

        if user.is_locked(now) {
            tracing::warn!(email = %email, "Login attempt against locked account");
            return Err(AppError::Locked);
        }

        if !user.is_verified {
            return Err(AppError::Unverified { email: user.email });
        }

        if !verify_password(password, &user.password_hash)? {
            match lockout::on_failed_login(user.login_attempts, user.lock_until, now) {
                FailedLoginOutcome::ResetStale => {
                    self.db.set_lockout_state(user.id, 1, None).await?;
                }
                FailedLoginOutcome::Count { attempts, lock_at } => {
                    if lock_at.is_some() {
                        tracing::warn!(email = %email, attempts, "Account locked after repeated failures");
                    }
                    self.db.set_lockout_state(user.id, attempts, lock_at).await?;
                }
            }
            return Err(AppError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        if lockout::needs_reset(user.login_attempts, user.lock_until) {
            self.db.clear_lockout(user.id).await?;
            user.login_attempts = 0;
            user.lock_until = None;
        }

        self.db.record_last_login(user.id, now).await?;
        user.last_login = Some(now);

        tracing::info!(email = %email, "Login successful");
        Ok(user)
    }

    // ─── Password Reset ──────────────────────────────────────────

    /// Issue a reset token and email the reset link. Does nothing (still
    /// `Ok`) for an unknown email; the handler's response body is constant
    /// either way.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);

        let Some(user) = self.db.find_user_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let now = DateTime::now();
        let token = tokens::generate_token();
        self.db
            .set_reset_token(
                user.id,
                &token.digest,
                tokens::expiry_after_minutes(now, tokens::RESET_TOKEN_TTL_MINUTES),
            )
            .await?;

        let url = format!("{}/reset-password/{}", self.frontend_url, token.raw);
        if self
            .mailer
            .send_password_reset_email(&email, &user.name, &url)
            .await
            .is_err()
        {
            // An unsendable link must not stay live.
            if let Err(clear_err) = self.db.clear_reset_token(user.id).await {
                tracing::error!(email = %email, error = %clear_err, "Failed to clear reset token");
            }
            return Err(AppError::Notification(
                "Failed to send password reset email. Please try again.".to_string(),
            ));
        }

        tracing::info!(email = %email, "Password reset email sent");
        Ok(())
    }

    /// Consume a reset token and install the new password. Clears lockout
    /// state and notifies the user from a detached task.
    pub async fn reset_password(&self, raw_token: &str, new_password: &str) -> Result<()> {
        let digest = tokens::sha256_hex(raw_token);
        let now = DateTime::now();

        let user = self
            .db
            .find_user_by_reset_token(&digest, now)
            .await?
            .ok_or_else(|| {
                AppError::InvalidToken("Invalid or expired password reset token".to_string())
            })?;

        let password_hash = hash_password(new_password)?;
        self.db.apply_password_reset(user.id, &password_hash).await?;

        // Confirmation is informational; its failure is invisible to the
        // caller and only logged by the detached sender.
        let message = format!(
            "Hi {},\n\nYour password has been successfully reset.\n\n\
             If you didn't make this change, please contact us immediately.\n\n\
             - Yoga Planner App Team",
            user.name
        );
        self.mailer.send_detached(
            user.email.clone(),
            "\u{1F512} Password Reset Successful".to_string(),
            message,
        );

        tracing::info!(email = %user.email, "Password reset complete");
        Ok(())
    }

    // ─── Profile ─────────────────────────────────────────────────

    /// Merge-patch the caller's profile. Returns the fresh profile and
    /// whether the email changed.
    pub async fn update_profile(
        &self,
        current: &User,
        mut changes: ProfileChanges,
    ) -> Result<(UserProfile, bool)> {
        if let Some(new_email) = changes.email.as_deref() {
            let normalized = normalize_email(new_email);
            if normalized == current.email {
                changes.email = None;
            } else {
                if self.db.email_taken(&normalized, Some(current.id)).await? {
                    return Err(AppError::Conflict(
                        "Email is already in use by another account".to_string(),
                    ));
                }
                changes.email = Some(normalized);
            }
        }

        if let Some(phone) = changes.phone.as_deref() {
            if current.phone.as_deref() != Some(phone)
                && self.db.phone_taken(phone, Some(current.id)).await?
            {
                return Err(AppError::Conflict(
                    "Phone number is already in use by another account".to_string(),
                ));
            }
        }

        let email_changed = changes.email.is_some();
        self.db.apply_profile_changes(current.id, &changes).await?;

        let user = self
            .db
            .find_user_by_id(current.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!(email = %user.email, "Profile updated");
        Ok((UserProfile::from(&user), email_changed))
    }
}

/// Trim and lowercase, the stored form of every email.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password verification failed: {e}")))
}
