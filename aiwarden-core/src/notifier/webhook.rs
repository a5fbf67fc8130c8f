//! HTTP webhook delivery
//!
//! POSTs [`NotifyEvent`] envelopes to a configured endpoint, with an
//! optional bearer token and bounded retry for transient failures.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::config::NotifierConfig;
use crate::error::{Error, Result};
use crate::gateway::LinkStatus;
use crate::types::{Activity, SessionSummary};

use super::{Alert, Notifier, NotifyEvent};

/// Webhook client for pushing monitoring output.
pub struct WebhookNotifier {
    config: NotifierConfig,
    http_client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    /// Create a webhook notifier from configuration.
    ///
    /// Returns an error if the configuration is invalid or missing the
    /// endpoint URL.
    pub fn new(config: NotifierConfig) -> Result<Self> {
        config.validate()?;

        let endpoint = config
            .webhook_url
            .clone()
            .ok_or_else(|| Error::Config("notifier.webhook_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        // Build default headers
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.token {
            let auth_value = format!("Bearer {}", token);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid token: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            endpoint,
        })
    }

    /// POST one envelope, no retry.
    async fn post(&self, event: &NotifyEvent) -> Result<()> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(event)
            .send()
            .await
            .map_err(|e| Error::Notify(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        Err(Error::Notify(format!(
            "webhook error ({}): {}",
            status, error_text
        )))
    }

    /// POST with retry logic.
    ///
    /// Retries transient failures (5xx, timeouts) with exponential backoff.
    async fn post_with_retry(&self, event: &NotifyEvent) -> Result<()> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(500);

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    "Retrying webhook delivery (attempt {}/{}), waiting {:?}",
                    attempt + 1,
                    self.config.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }

            match self.post(event).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if is_retryable_error(&e) {
                        tracing::warn!("Transient error delivering webhook event: {}", e);
                        last_error = Some(e);
                        continue;
                    } else {
                        // Non-retryable error, fail immediately
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Notify("max retries exceeded".to_string())))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn publish_activity(&self, activity: &Activity) -> Result<()> {
        self.post_with_retry(&NotifyEvent::activity(activity)).await
    }

    async fn publish_alert(&self, alert: &Alert) -> Result<()> {
        self.post_with_retry(&NotifyEvent::alert(alert)).await
    }

    async fn publish_session_update(&self, summary: &SessionSummary) -> Result<()> {
        self.post_with_retry(&NotifyEvent::session_update(summary))
            .await
    }

    async fn publish_status(
        &self,
        status: LinkStatus,
        last_activity: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.post_with_retry(&NotifyEvent::status(status, last_activity))
            .await
    }
}

/// Check if an error is retryable (transient)
fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Notify(msg) => {
            // Retry on 5xx errors
            msg.contains("50") && (msg.contains("webhook error") || msg.contains("HTTP"))
                // Retry on network/timeout errors
                || msg.contains("timeout")
                || msg.contains("connection")
                || msg.contains("request failed")
        }
        _ => false,
    }
}
