//! The channel-polymorphic delivery capability and its error types.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use gateway_common::types::{DeliveryChannel, Notification, UnsupportedChannel};

/// Transport-level failure of a single delivery attempt.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("Failed to encode webhook payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook rejected notification with status {status}")]
    Rejected { status: u16 },

    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Why a dispatch attempt did not deliver a notification.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedChannel),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Delivers notifications over one specific channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a single notification.
    async fn send_notification(&self, notification: &Notification) -> Result<(), DeliveryError>;

    /// The channel this notifier delivers through.
    fn channel(&self) -> DeliveryChannel;
}
