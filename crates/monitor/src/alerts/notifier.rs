use std::time::Duration;

use async_trait::async_trait;

use super::{AlertError, Notification};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivery transport for rendered alerts
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), AlertError>;
}

/// Writes alerts to the log. Used when no transport is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AlertError> {
        tracing::info!(
            to = %notification.to,
            service = %notification.service,
            state = %notification.state,
            subject = %notification.subject,
            "alert"
        );
        Ok(())
    }
}

/// Posts each alert as JSON to a fixed URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(AlertError::Client)?;

        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(AlertError::Delivery)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::Rejected(status.as_u16()));
        }

        tracing::debug!(service = %notification.service, "alert delivered to webhook");
        Ok(())
    }
}
