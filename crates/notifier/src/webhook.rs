//! Chat webhook delivery (Slack-compatible incoming webhooks).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use gateway_common::config::ChatWebhookSettings;
use gateway_common::types::{DeliveryChannel, Notification};

use crate::notifier::{DeliveryError, Notifier};

/// Default request timeout for webhook calls.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON body posted to the webhook.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub text: &'a str,
}

/// Posts `{"text": <message>}` to a chat webhook URL.
pub struct ChatWebhookNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl ChatWebhookNotifier {
    pub fn new(settings: &ChatWebhookSettings) -> Result<Self, DeliveryError> {
        Self::with_timeout(settings, WEBHOOK_TIMEOUT)
    }

    pub fn with_timeout(
        settings: &ChatWebhookSettings,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            webhook_url: settings.webhook_url.clone(),
            client,
        })
    }

    /// Serialized request body for a message; the message is JSON-escaped.
    pub fn payload(message: &str) -> Result<String, serde_json::Error> {
        serde_json::to_string(&WebhookPayload { text: message })
    }
}

#[async_trait]
impl Notifier for ChatWebhookNotifier {
    async fn send_notification(&self, notification: &Notification) -> Result<(), DeliveryError> {
        tracing::debug!(notification_id = notification.id, "Sending chat webhook message");

        let body = Self::payload(&notification.message)?;
        let response = self
            .client
            .post(&self.webhook_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
            });
        }

        tracing::debug!(notification_id = notification.id, "Chat webhook message sent");
        Ok(())
    }

    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::ChatWebhook
    }
}
