//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and handed to services by value; no
//! code path reads the process environment after boot.

use std::env;
use std::str::FromStr;

/// Deployment environment. Toggles cookie cross-site policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            other => Err(ConfigError::Invalid("APP_ENV", other.to_string())),
        }
    }
}

/// Which email-verification strategy this deployment issues at registration.
///
/// Exactly one is active per deployment; the resend endpoints reject
/// requests for the inactive strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    /// 6-digit one-time code, 10 minute expiry, 3 attempts.
    Otp,
    /// Emailed link carrying a random token, 24 hour expiry.
    Link,
}

impl FromStr for VerificationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "otp" => Ok(VerificationMode::Otp),
            "link" => Ok(VerificationMode::Link),
            other => Err(ConfigError::Invalid("VERIFICATION_MODE", other.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Deployment ---
    /// Deployment environment (cookie policy, error verbosity)
    pub environment: Environment,
    /// Verification strategy issued at registration
    pub verification_mode: VerificationMode,
    /// Server port
    pub port: u16,
    /// Frontend URL for CORS and for building verification/reset links
    pub frontend_url: String,

    // --- Storage ---
    /// MongoDB connection string
    pub mongo_uri: String,
    /// Database name
    pub mongo_db: String,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_secret: Vec<u8>,

    // --- Outbound email (SMTP) ---
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    /// From address, rendered as "Yoga Planner <sender>"
    pub smtp_sender: String,

    // --- Outbound SMS (optional gateway) ---
    /// SMS gateway endpoint; SMS is disabled when unset
    pub sms_api_url: Option<String>,
    pub sms_api_key: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            verification_mode: VerificationMode::Otp,
            port: 5000,
            frontend_url: "http://localhost:5173".to_string(),
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_db: "yoga-planner-test".to_string(),
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_user: "test_user".to_string(),
            smtp_pass: "test_pass".to_string(),
            smtp_sender: "noreply@example.com".to_string(),
            sms_api_url: None,
            sms_api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            environment: env::var("APP_ENV")
                .unwrap_or_else(|_| "development".to_string())
                .parse()?,
            verification_mode: env::var("VERIFICATION_MODE")
                .unwrap_or_else(|_| "otp".to_string())
                .parse()?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),

            mongo_uri: env::var("MONGO_URI").map_err(|_| ConfigError::Missing("MONGO_URI"))?,
            mongo_db: env::var("MONGO_DB").unwrap_or_else(|_| "yoga-planner".to_string()),

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_SECRET"))?
                .into_bytes(),

            smtp_host: env::var("SMTP_HOST")
                .unwrap_or_else(|_| "smtp-relay.brevo.com".to_string()),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .unwrap_or(587),
            smtp_user: env::var("SMTP_USER").map_err(|_| ConfigError::Missing("SMTP_USER"))?,
            smtp_pass: env::var("SMTP_PASS").map_err(|_| ConfigError::Missing("SMTP_PASS"))?,
            smtp_sender: env::var("SMTP_SENDER")
                .map_err(|_| ConfigError::Missing("SMTP_SENDER"))?,

            sms_api_url: env::var("SMS_API_URL").ok(),
            sms_api_key: env::var("SMS_API_KEY").ok(),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
