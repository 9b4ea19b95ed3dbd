use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// External transport a notification is delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum DeliveryChannel {
    Email,
    ChatWebhook,
}

impl DeliveryChannel {
    pub const ALL: [DeliveryChannel; 2] = [DeliveryChannel::Email, DeliveryChannel::ChatWebhook];
}

impl std::fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryChannel::Email => write!(f, "email"),
            DeliveryChannel::ChatWebhook => write!(f, "chat_webhook"),
        }
    }
}

/// A channel tag that does not name a channel this service can deliver through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported delivery channel '{tag}'")]
pub struct UnsupportedChannel {
    pub tag: String,
}

impl UnsupportedChannel {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl FromStr for DeliveryChannel {
    type Err = UnsupportedChannel;

    /// Accepts the persisted tags (`email`, `chat_webhook`) as well as the
    /// public API spellings (`Email`, `ChatWebhook`, `Slack`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(DeliveryChannel::Email),
            "chat_webhook" | "chatwebhook" | "slack" => Ok(DeliveryChannel::ChatWebhook),
            _ => Err(UnsupportedChannel::new(s)),
        }
    }
}

/// Delivery status of a notification.
///
/// Only `Pending -> Completed` and `Pending -> Failed` are valid transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Completed,
    Failed,
}

impl NotificationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, NotificationStatus::Pending)
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationStatus::Pending => write!(f, "pending"),
            NotificationStatus::Completed => write!(f, "completed"),
            NotificationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A persisted notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub key: String,
    pub message: String,
    pub delivery_channel: DeliveryChannel,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for a notification; persistence assigns the id and timestamp
/// and every new record starts out `Pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub key: String,
    pub message: String,
    pub delivery_channel: DeliveryChannel,
}
