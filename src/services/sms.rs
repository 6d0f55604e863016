// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! SMS gateway client.
//!
//! Plan notifications go out through a simple JSON HTTP gateway. SMS is
//! best-effort: the client is disabled entirely when the gateway is not
//! configured, and every caller treats failures as log-and-continue.

use crate::config::Config;
use crate::error::AppError;

#[derive(Clone)]
struct Gateway {
    url: String,
    api_key: String,
}

/// SMS gateway client. Disabled (sends are dropped) when unconfigured.
#[derive(Clone)]
pub struct SmsClient {
    http: reqwest::Client,
    gateway: Option<Gateway>,
}

impl SmsClient {
    /// Build a client from gateway settings; disabled if either the URL or
    /// the API key is missing.
    pub fn new(config: &Config) -> Self {
        let gateway = match (&config.sms_api_url, &config.sms_api_key) {
            (Some(url), Some(api_key)) => Some(Gateway {
                url: url.clone(),
                api_key: api_key.clone(),
            }),
            _ => {
                tracing::info!("SMS gateway not configured, SMS notifications disabled");
                None
            }
        };

        Self {
            http: reqwest::Client::new(),
            gateway,
        }
    }

    /// Create a disabled client for testing.
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            gateway: None,
        }
    }

    /// Send a text message. A no-op when the gateway is disabled.
    pub async fn send(&self, to: &str, message: &str) -> Result<(), AppError> {
        let Some(gateway) = &self.gateway else {
            tracing::debug!(to = %to, "SMS send skipped (gateway disabled)");
            return Ok(());
        };

        let body = serde_json::json!({
            "to": to,
            "message": message,
        });

        let response = self
            .http
            .post(&gateway.url)
            .bearer_auth(&gateway.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(to = %to, error = %e, "SMS request failed");
                AppError::Notification("Failed to send SMS".to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(to = %to, %status, detail = %detail, "SMS gateway rejected message");
            return Err(AppError::Notification("Failed to send SMS".to_string()));
        }

        tracing::info!(to = %to, "SMS sent");
        Ok(())
    }

    /// Send from a detached task with one retry after five seconds. The
    /// caller cannot observe a failure; it is logged and dropped.
    pub fn send_detached(&self, to: String, message: String) {
        let sms = self.clone();
        tokio::spawn(async move {
            if sms.send(&to, &message).await.is_ok() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            if let Err(e) = sms.send(&to, &message).await {
                tracing::error!(to = %to, error = %e, "Detached SMS failed after retry");
            }
        });
    }
}
