// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Outbound email over SMTP.
//!
//! Messages go out as multipart alternative: the plain-text body plus an
//! HTML rendering with line breaks converted, which is what the hosted
//! relay expects for decent inbox placement.

use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Config;
use crate::error::AppError;

/// SMTP mailer. In mock mode (tests) nothing is sent.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    fail_sends: bool,
}

impl Mailer {
    /// Build a mailer from SMTP settings (STARTTLS relay).
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let creds = Credentials::new(config.smtp_user.clone(), config.smtp_pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid SMTP relay: {e}")))?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport: Some(transport),
            from: Self::sender_mailbox(&config.smtp_sender)?,
            fail_sends: false,
        })
    }

    /// Create a mock mailer for testing: sends are logged and dropped.
    pub fn new_mock() -> Self {
        Self {
            transport: None,
            from: Mailbox::new(
                Some("Yoga Planner".to_string()),
                "noreply@example.com".parse().expect("static address"),
            ),
            fail_sends: false,
        }
    }

    /// Create a mock mailer whose sends always fail, for exercising the
    /// dispatch-failure paths (registration rollback, reset-token cleanup).
    pub fn new_failing_mock() -> Self {
        Self {
            fail_sends: true,
            ..Self::new_mock()
        }
    }

    fn sender_mailbox(sender: &str) -> Result<Mailbox, AppError> {
        format!("Yoga Planner <{sender}>")
            .parse()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid SMTP sender address: {e}")))
    }

    /// Send a plain-text message (an HTML alternative is derived from it).
    ///
    /// Errors carry a generic public message; the transport failure itself
    /// is logged here. Callers attach the flow-specific message.
    pub async fn send(&self, to: &str, subject: &str, message: &str) -> Result<(), AppError> {
        if self.fail_sends {
            tracing::error!(to = %to, subject = %subject, "Email send failed (mock failure mode)");
            return Err(AppError::Notification("Failed to send email".to_string()));
        }

        let Some(transport) = &self.transport else {
            tracing::info!(to = %to, subject = %subject, "Email send skipped (mock mode)");
            return Ok(());
        };

        let to_mailbox: Mailbox = to.parse().map_err(|e| {
            tracing::warn!(to = %to, error = %e, "Invalid recipient address");
            AppError::Notification("Failed to send email".to_string())
        })?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(message.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body(message)),
                    ),
            )
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to build email message");
                AppError::Notification("Failed to send email".to_string())
            })?;

        match transport.send(email).await {
            Ok(_) => {
                tracing::info!(to = %to, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(to = %to, subject = %subject, error = %e, "Failed to send email");
                Err(AppError::Notification("Failed to send email".to_string()))
            }
        }
    }

    /// Verification link email (link flow).
    pub async fn send_verification_email(
        &self,
        to: &str,
        name: &str,
        verification_url: &str,
    ) -> Result<(), AppError> {
        let subject = "\u{1F9D8} Verify Your Email - Yoga Planner App";
        let message = format!(
            "Hi {name},\n\nThank you for registering with Yoga Planner App!\n\n\
             Please verify your email by clicking the link below:\n{verification_url}\n\n\
             This link will expire in 24 hours.\n\n\
             If you didn't create this account, please ignore this email.\n\n\
             - Yoga Planner App Team"
        );
        self.send(to, subject, &message).await
    }

    /// Password reset link email.
    pub async fn send_password_reset_email(
        &self,
        to: &str,
        name: &str,
        reset_url: &str,
    ) -> Result<(), AppError> {
        let subject = "\u{1F512} Password Reset Request - Yoga Planner App";
        let message = format!(
            "Hi {name},\n\nYou requested to reset your password.\n\n\
             Please click the link below to reset your password:\n{reset_url}\n\n\
             This link will expire in 1 hour.\n\n\
             If you didn't request this, please ignore this email and your password \
             will remain unchanged.\n\n\
             - Yoga Planner App Team"
        );
        self.send(to, subject, &message).await
    }

    /// Send from a detached task: the caller's response does not wait on
    /// the SMTP round trip and cannot observe a failure. One retry after
    /// five seconds, then the failure is logged and dropped.
    pub fn send_detached(&self, to: String, subject: String, message: String) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if mailer.send(&to, &subject, &message).await.is_ok() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            if let Err(e) = mailer.send(&to, &subject, &message).await {
                tracing::error!(to = %to, subject = %subject, error = %e, "Detached email failed after retry");
            }
        });
    }
}

/// Render the plain-text body as minimal HTML.
fn html_body(text: &str) -> String {
    text.replace('\n', "<br>")
}
