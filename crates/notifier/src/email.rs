//! Email delivery over authenticated SMTP.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use gateway_common::config::EmailSettings;
use gateway_common::types::{DeliveryChannel, Notification};

use crate::notifier::{DeliveryError, Notifier};

/// Default SMTP connection/command timeout.
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_SUBJECT: &str = "Notification";

/// Sends each notification as one message to every configured recipient.
pub struct EmailNotifier {
    settings: EmailSettings,
    timeout: Duration,
}

impl EmailNotifier {
    pub fn new(settings: EmailSettings) -> Self {
        Self::with_timeout(settings, SMTP_TIMEOUT)
    }

    pub fn with_timeout(settings: EmailSettings, timeout: Duration) -> Self {
        Self { settings, timeout }
    }

    /// Build the outgoing message. The notification key becomes the subject.
    pub fn build_message(&self, notification: &Notification) -> Result<Message, DeliveryError> {
        let from: Mailbox = self.settings.from.parse()?;
        let subject = if notification.key.trim().is_empty() {
            DEFAULT_SUBJECT
        } else {
            notification.key.as_str()
        };

        let mut builder = Message::builder().from(from).subject(subject);
        for recipient in &self.settings.recipients {
            builder = builder.to(recipient.parse::<Mailbox>()?);
        }

        Ok(builder
            .header(ContentType::TEXT_PLAIN)
            .body(notification.message.clone())?)
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
        let credentials = Credentials::new(self.settings.from.clone(), self.settings.password.clone());

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.smtp_host)?
                .port(self.settings.smtp_port)
                .credentials(credentials)
                .timeout(Some(self.timeout))
                .build(),
        )
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_notification(&self, notification: &Notification) -> Result<(), DeliveryError> {
        tracing::debug!(
            notification_id = notification.id,
            recipients = self.settings.recipients.len(),
            "Sending email"
        );

        let message = self.build_message(notification)?;
        self.transport()?.send(message).await?;

        tracing::debug!(notification_id = notification.id, "Email has been sent");
        Ok(())
    }

    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::Email
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use gateway_common::types::NotificationStatus;

    use super::*;

    fn settings(recipients: &[&str]) -> EmailSettings {
        EmailSettings {
            from: "gateway@example.com".to_string(),
            password: "secret".to_string(),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            smtp_host: "127.0.0.1".to_string(),
            smtp_port: 1,
        }
    }

    fn notification(key: &str, message: &str) -> Notification {
        Notification {
            id: 7,
            key: key.to_string(),
            message: message.to_string(),
            delivery_channel: DeliveryChannel::Email,
            status: NotificationStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_message_addresses_every_recipient() {
        let notifier = EmailNotifier::new(settings(&["a@example.com", "b@example.com"]));
        let message = notifier
            .build_message(&notification("payment_cancelled", "Your payment has been cancelled"))
            .unwrap();

        assert_eq!(message.envelope().to().len(), 2);
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: payment_cancelled"));
        assert!(raw.contains("Your payment has been cancelled"));
    }

    #[test]
    fn test_empty_key_uses_default_subject() {
        let notifier = EmailNotifier::new(settings(&["a@example.com"]));
        let message = notifier.build_message(&notification("", "hello")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Notification"));
    }

    #[test]
    fn test_invalid_recipient_is_address_error() {
        let notifier = EmailNotifier::new(settings(&["not an address"]));
        let err = notifier.build_message(&notification("k", "m")).unwrap_err();
        assert!(matches!(err, DeliveryError::Address(_)));
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_smtp_error() {
        let notifier =
            EmailNotifier::with_timeout(settings(&["a@example.com"]), Duration::from_secs(2));
        let err = notifier
            .send_notification(&notification("k", "m"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Smtp(_)));
    }
}
