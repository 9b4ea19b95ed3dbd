//! Notifier selection keyed by delivery channel.

use std::sync::Arc;
use std::time::Duration;

use gateway_common::config::ChannelSettings;
use gateway_common::types::{DeliveryChannel, UnsupportedChannel};

use crate::email::EmailNotifier;
use crate::notifier::Notifier;
use crate::webhook::ChatWebhookNotifier;

/// Builds the notifier responsible for a delivery channel.
pub trait NotifierFactory: Send + Sync {
    /// Fails with `UnsupportedChannel` when no notifier can deliver over `channel`.
    fn create(&self, channel: DeliveryChannel) -> Result<Box<dyn Notifier>, UnsupportedChannel>;
}

/// Factory that builds a fresh notifier from the channel settings on every call.
pub struct ConfigNotifierFactory {
    settings: Arc<ChannelSettings>,
    timeout: Duration,
}

impl ConfigNotifierFactory {
    pub fn new(settings: Arc<ChannelSettings>, timeout: Duration) -> Self {
        Self { settings, timeout }
    }
}

impl NotifierFactory for ConfigNotifierFactory {
    fn create(&self, channel: DeliveryChannel) -> Result<Box<dyn Notifier>, UnsupportedChannel> {
        match channel {
            DeliveryChannel::Email => {
                let settings = self
                    .settings
                    .email
                    .clone()
                    .ok_or_else(|| UnsupportedChannel::new(channel.to_string()))?;
                Ok(Box::new(EmailNotifier::with_timeout(settings, self.timeout)))
            }
            DeliveryChannel::ChatWebhook => {
                let settings = self
                    .settings
                    .chat_webhook
                    .as_ref()
                    .ok_or_else(|| UnsupportedChannel::new(channel.to_string()))?;
                let notifier = ChatWebhookNotifier::with_timeout(settings, self.timeout)
                    .map_err(|e| {
                        tracing::error!(error = %e, "Failed to build chat webhook client");
                        UnsupportedChannel::new(channel.to_string())
                    })?;
                Ok(Box::new(notifier))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gateway_common::config::{ChatWebhookSettings, EmailSettings};

    use super::*;

    fn factory(settings: ChannelSettings) -> ConfigNotifierFactory {
        ConfigNotifierFactory::new(Arc::new(settings), Duration::from_secs(5))
    }

    #[test]
    fn test_configured_channels_resolve() {
        let factory = factory(ChannelSettings {
            email: Some(EmailSettings {
                from: "gateway@example.com".to_string(),
                password: "secret".to_string(),
                recipients: vec!["ops@example.com".to_string()],
                smtp_host: "smtp.example.com".to_string(),
                smtp_port: 587,
            }),
            chat_webhook: Some(ChatWebhookSettings {
                webhook_url: "https://hooks.example.com/T000".to_string(),
            }),
        });

        for channel in DeliveryChannel::ALL {
            let notifier = factory.create(channel).unwrap();
            assert_eq!(notifier.channel(), channel);
        }
    }

    #[test]
    fn test_unconfigured_channel_is_unsupported() {
        let factory = factory(ChannelSettings::default());

        let Err(err) = factory.create(DeliveryChannel::ChatWebhook) else {
            panic!("expected UnsupportedChannel");
        };
        assert_eq!(err.tag, "chat_webhook");

        let Err(err) = factory.create(DeliveryChannel::Email) else {
            panic!("expected UnsupportedChannel");
        };
        assert_eq!(err.tag, "email");
    }
}
