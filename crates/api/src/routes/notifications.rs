//! Notification intake.

use std::collections::HashSet;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use gateway_common::error::AppError;
use gateway_common::types::{DeliveryChannel, NewNotification, Notification};
use gateway_notifier::WorkerError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/notifications/push-notification",
        post(push_notification),
    )
}

/// Request body of a push notification.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationInput {
    #[serde(default)]
    pub key: String,
    pub message: String,
    #[serde(default)]
    pub delivery_channels: Vec<String>,
}

impl NotificationInput {
    /// Validated, de-duplicated channel list in request order.
    fn channels(&self) -> Result<Vec<DeliveryChannel>, AppError> {
        if self.message.trim().is_empty() {
            return Err(AppError::Validation("message must not be empty".to_string()));
        }
        if self.delivery_channels.is_empty() {
            return Err(AppError::Validation(
                "deliveryChannels must name at least one channel".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut channels = Vec::with_capacity(self.delivery_channels.len());
        for tag in &self.delivery_channels {
            let channel: DeliveryChannel = tag.parse()?;
            if !seen.insert(channel) {
                return Err(AppError::Validation(format!(
                    "duplicate delivery channel '{}'",
                    tag
                )));
            }
            channels.push(channel);
        }

        Ok(channels)
    }
}

/// POST /public-api/v1/notifications/push-notification
///
/// Stores one pending notification per requested channel and hands the batch
/// to the worker. Delivery happens in the background.
async fn push_notification(
    State(state): State<AppState>,
    payload: Result<Json<NotificationInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<Notification>>), AppError> {
    let Json(input) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let channels = input.channels()?;

    if !state.worker.is_running() {
        return Err(WorkerError::NotRunning.into());
    }

    let mut created = Vec::with_capacity(channels.len());
    for channel in channels {
        let notification = state
            .repository
            .create(NewNotification {
                key: input.key.clone(),
                message: input.message.clone(),
                delivery_channel: channel,
            })
            .await?;
        created.push(notification);
    }

    let ids: Vec<i64> = created.iter().map(|n| n.id).collect();
    state.worker.enqueue(ids.clone()).await?;

    tracing::info!(key = %input.key, ?ids, "Notification accepted");

    Ok((StatusCode::ACCEPTED, Json(created)))
}
