// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! MongoDB client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (account records with credential and security state)
//! - Plans (practice plans, owned by one account)
//!
//! Every mutation is scoped to a single document; the only cross-document
//! guarantees come from the unique indexes created at startup.

use std::time::Duration;

use futures_util::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, DateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};

use crate::db::collections;
use crate::error::AppError;
use crate::models::user::ProfileChanges;
use crate::models::{Plan, User};

/// MongoDB database handle.
#[derive(Clone)]
pub struct MongoDb {
    db: Option<Database>,
}

impl MongoDb {
    /// Connect to MongoDB and verify connectivity with a ping.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, AppError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| AppError::Database(format!("Invalid MongoDB connection string: {}", e)))?;

        // Time out server selection after 5s instead of the driver's 30s
        options.server_selection_timeout = Some(Duration::from_secs(5));
        options.max_idle_time = Some(Duration::from_secs(45));
        options.max_pool_size = Some(10);
        options.min_pool_size = Some(2);
        options.app_name = Some("yoga-planner".to_string());

        let client = Client::with_options(options)
            .map_err(|e| AppError::Database(format!("Failed to create MongoDB client: {}", e)))?;
        let db = client.database(db_name);

        // Surface a bad URI at startup rather than on the first request
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        tracing::info!(database = db_name, "Connected to MongoDB");

        Ok(Self { db: Some(db) })
    }

    /// Create a mock handle for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { db: None }
    }

    /// Helper to get the database or return an error if offline.
    fn get_db(&self) -> Result<&Database, AppError> {
        self.db
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    fn users(&self) -> Result<Collection<User>, AppError> {
        Ok(self.get_db()?.collection(collections::USERS))
    }

    fn plans(&self) -> Result<Collection<Plan>, AppError> {
        Ok(self.get_db()?.collection(collections::PLANS))
    }

    /// Create the indexes the application relies on. Idempotent.
    ///
    /// - unique `email` on users
    /// - sparse unique `phone` on users (only accounts that carry a phone)
    /// - `(user, created_at desc)` on plans for the list query
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let users = self.users()?;
        users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create email index: {}", e)))?;

        users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "phone": 1 })
                    .options(IndexOptions::builder().unique(true).sparse(true).build())
                    .build(),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create phone index: {}", e)))?;

        self.plans()?
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user": 1, "created_at": -1 })
                    .build(),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create plan index: {}", e)))?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    // ─── User Lookups ────────────────────────────────────────────

    /// Get a user by normalized email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.users()?
            .find_one(doc! { "email": email })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user by id.
    pub async fn find_user_by_id(&self, id: ObjectId) -> Result<Option<User>, AppError> {
        self.users()?
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the user holding an unexpired verification-token digest.
    pub async fn find_user_by_verification_token(
        &self,
        digest: &str,
        now: DateTime,
    ) -> Result<Option<User>, AppError> {
        self.users()?
            .find_one(doc! {
                "verification_token": digest,
                "verification_token_expires": { "$gt": now },
            })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the user holding an unexpired reset-token digest.
    pub async fn find_user_by_reset_token(
        &self,
        digest: &str,
        now: DateTime,
    ) -> Result<Option<User>, AppError> {
        self.users()?
            .find_one(doc! {
                "reset_password_token": digest,
                "reset_password_expires": { "$gt": now },
            })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether an email is registered to some account other than `exclude`.
    pub async fn email_taken(
        &self,
        email: &str,
        exclude: Option<ObjectId>,
    ) -> Result<bool, AppError> {
        let mut filter = doc! { "email": email };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id });
        }
        Ok(self
            .users()?
            .find_one(filter)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some())
    }

    /// Whether a phone number is registered to some account other than `exclude`.
    pub async fn phone_taken(
        &self,
        phone: &str,
        exclude: Option<ObjectId>,
    ) -> Result<bool, AppError> {
        let mut filter = doc! { "phone": phone };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id });
        }
        Ok(self
            .users()?
            .find_one(filter)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some())
    }

    // ─── User Writes ─────────────────────────────────────────────

    /// Insert a new account. A duplicate-key race on email or phone maps
    /// to `Conflict`, same as the pre-insert checks.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        self.users()?
            .insert_one(user)
            .await
            .map(|_| ())
            .map_err(map_duplicate_key)
    }

    /// Delete an account. Only used to roll back a registration whose
    /// verification email could not be sent.
    pub async fn delete_user(&self, id: ObjectId) -> Result<(), AppError> {
        self.users()?
            .delete_one(doc! { "_id": id })
            .await
            .map(|_| ())
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a fresh OTP digest, resetting the attempt counter.
    pub async fn set_otp_state(
        &self,
        id: ObjectId,
        digest: &str,
        expires: DateTime,
    ) -> Result<(), AppError> {
        self.update_user(
            id,
            doc! {
                "$set": {
                    "otp_hash": digest,
                    "otp_expires": expires,
                    "otp_attempts": 0,
                    "updated_at": DateTime::now(),
                },
            },
        )
        .await
    }

    /// Count one wrong guess against the active OTP.
    pub async fn increment_otp_attempts(&self, id: ObjectId) -> Result<(), AppError> {
        self.update_user(
            id,
            doc! {
                "$inc": { "otp_attempts": 1 },
                "$set": { "updated_at": DateTime::now() },
            },
        )
        .await
    }

    /// Flip the account to verified and clear all OTP state.
    pub async fn mark_verified_clear_otp(&self, id: ObjectId) -> Result<(), AppError> {
        self.update_user(
            id,
            doc! {
                "$set": {
                    "is_verified": true,
                    "otp_attempts": 0,
                    "updated_at": DateTime::now(),
                },
                "$unset": { "otp_hash": "", "otp_expires": "" },
            },
        )
        .await
    }

    /// Store a fresh verification-token digest.
    pub async fn set_verification_token(
        &self,
        id: ObjectId,
        digest: &str,
        expires: DateTime,
    ) -> Result<(), AppError> {
        self.update_user(
            id,
            doc! {
                "$set": {
                    "verification_token": digest,
                    "verification_token_expires": expires,
                    "updated_at": DateTime::now(),
                },
            },
        )
        .await
    }

    /// Flip the account to verified and consume the verification token.
    pub async fn mark_verified_clear_token(&self, id: ObjectId) -> Result<(), AppError> {
        self.update_user(
            id,
            doc! {
                "$set": { "is_verified": true, "updated_at": DateTime::now() },
                "$unset": {
                    "verification_token": "",
                    "verification_token_expires": "",
                },
            },
        )
        .await
    }

    /// Store a fresh password-reset-token digest.
    pub async fn set_reset_token(
        &self,
        id: ObjectId,
        digest: &str,
        expires: DateTime,
    ) -> Result<(), AppError> {
        self.update_user(
            id,
            doc! {
                "$set": {
                    "reset_password_token": digest,
                    "reset_password_expires": expires,
                    "updated_at": DateTime::now(),
                },
            },
        )
        .await
    }

    /// Drop reset-token state, invalidating any outstanding reset link.
    pub async fn clear_reset_token(&self, id: ObjectId) -> Result<(), AppError> {
        self.update_user(
            id,
            doc! {
                "$set": { "updated_at": DateTime::now() },
                "$unset": {
                    "reset_password_token": "",
                    "reset_password_expires": "",
                },
            },
        )
        .await
    }

    /// Install a new password hash, consuming the reset token and zeroing
    /// lockout state.
    pub async fn apply_password_reset(
        &self,
        id: ObjectId,
        password_hash: &str,
    ) -> Result<(), AppError> {
        self.update_user(
            id,
            doc! {
                "$set": {
                    "password_hash": password_hash,
                    "login_attempts": 0,
                    "updated_at": DateTime::now(),
                },
                "$unset": {
                    "reset_password_token": "",
                    "reset_password_expires": "",
                    "lock_until": "",
                },
            },
        )
        .await
    }

    /// Persist a lockout transition: the new attempt count, plus the lock
    /// timestamp when one was issued (clears any stale one otherwise).
    pub async fn set_lockout_state(
        &self,
        id: ObjectId,
        attempts: i32,
        lock_until: Option<DateTime>,
    ) -> Result<(), AppError> {
        let update = match lock_until {
            Some(until) => doc! {
                "$set": {
                    "login_attempts": attempts,
                    "lock_until": until,
                    "updated_at": DateTime::now(),
                },
            },
            None => doc! {
                "$set": { "login_attempts": attempts, "updated_at": DateTime::now() },
                "$unset": { "lock_until": "" },
            },
        };
        self.update_user(id, update).await
    }

    /// Zero the failure counter and clear any lock.
    pub async fn clear_lockout(&self, id: ObjectId) -> Result<(), AppError> {
        self.set_lockout_state(id, 0, None).await
    }

    /// Stamp a successful login.
    pub async fn record_last_login(&self, id: ObjectId, now: DateTime) -> Result<(), AppError> {
        self.update_user(
            id,
            doc! { "$set": { "last_login": now, "updated_at": DateTime::now() } },
        )
        .await
    }

    /// Merge-patch profile fields; `None` entries are left untouched.
    pub async fn apply_profile_changes(
        &self,
        id: ObjectId,
        changes: &ProfileChanges,
    ) -> Result<(), AppError> {
        let mut set = doc! { "updated_at": DateTime::now() };
        if let Some(name) = &changes.name {
            set.insert("name", name);
        }
        if let Some(email) = &changes.email {
            set.insert("email", email);
        }
        if let Some(phone) = &changes.phone {
            set.insert("phone", phone);
        }
        if let Some(age) = changes.age {
            set.insert("age", age);
        }
        if let Some(level) = changes.fitness_level {
            let value = to_bson(&level).map_err(|e| AppError::Database(e.to_string()))?;
            set.insert("fitness_level", value);
        }
        if let Some(goal) = &changes.goal {
            set.insert("goal", goal);
        }
        self.update_user(id, doc! { "$set": set }).await
    }

    async fn update_user(&self, id: ObjectId, update: Document) -> Result<(), AppError> {
        self.users()?
            .update_one(doc! { "_id": id }, update)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Plan Operations ─────────────────────────────────────────

    /// Store a new plan.
    pub async fn insert_plan(&self, plan: &Plan) -> Result<(), AppError> {
        self.plans()?
            .insert_one(plan)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All plans owned by one account, newest first.
    pub async fn plans_for_user(&self, user: ObjectId) -> Result<Vec<Plan>, AppError> {
        self.plans()?
            .find(doc! { "user": user })
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a plan by id.
    pub async fn find_plan(&self, id: ObjectId) -> Result<Option<Plan>, AppError> {
        self.plans()?
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a plan. Ownership is checked by the caller.
    pub async fn delete_plan(&self, id: ObjectId) -> Result<(), AppError> {
        self.plans()?
            .delete_one(doc! { "_id": id })
            .await
            .map(|_| ())
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a plan completed. Ownership is checked by the caller.
    pub async fn complete_plan(&self, id: ObjectId) -> Result<(), AppError> {
        self.plans()?
            .update_one(doc! { "_id": id }, doc! { "$set": { "completed": true } })
            .await
            .map(|_| ())
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of plans owned by one account.
    pub async fn count_plans_for_user(&self, user: ObjectId) -> Result<u64, AppError> {
        self.plans()?
            .count_documents(doc! { "user": user })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of completed plans owned by one account.
    pub async fn count_completed_plans_for_user(&self, user: ObjectId) -> Result<u64, AppError> {
        self.plans()?
            .count_documents(doc! { "user": user, "completed": true })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Map a duplicate-key write failure (code 11000) onto the same `Conflict`
/// the pre-insert checks produce; anything else is a database error.
fn map_duplicate_key(e: mongodb::error::Error) -> AppError {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = &*e.kind {
        if write_error.code == 11000 {
            let message = if write_error.message.contains("phone") {
                "User with this phone number already exists"
            } else {
                "User with this email already exists"
            };
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::Database(e.to_string())
}
