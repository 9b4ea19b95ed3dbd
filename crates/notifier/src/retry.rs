//! Bounded-pass retry over a batch of notifications.
//!
//! Each cycle runs a fixed number of passes over the whole batch with no delay
//! between them. A notification delivered on any pass is not attempted again;
//! one still failing after the last pass is left as `NeedsRetry`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gateway_common::types::Notification;

use crate::factory::NotifierFactory;
use crate::notifier::{DeliveryError, DispatchError};

/// Default number of passes per cycle.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Per-cycle delivery outcome of a single notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    NeedsRetry,
    Satisfied,
}

/// Outcomes of one cycle, keyed by notification id. Only notifications that
/// were `Pending` when loaded have an entry.
#[derive(Debug, Default)]
pub struct CycleOutcomes {
    outcomes: HashMap<i64, RetryOutcome>,
    attempts: usize,
}

impl CycleOutcomes {
    pub fn get(&self, id: i64) -> Option<RetryOutcome> {
        self.outcomes.get(&id).copied()
    }

    pub(crate) fn insert(&mut self, id: i64, outcome: RetryOutcome) {
        self.outcomes.insert(id, outcome);
    }

    fn is_satisfied(&self, id: i64) -> bool {
        self.get(id) == Some(RetryOutcome::Satisfied)
    }

    /// Total dispatch attempts made during the cycle.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.outcomes.len()
    }
}

pub struct RetryController {
    factory: Arc<dyn NotifierFactory>,
    max_attempts: u32,
    delivery_timeout: Duration,
}

impl RetryController {
    pub fn new(
        factory: Arc<dyn NotifierFactory>,
        max_attempts: u32,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            factory,
            max_attempts,
            delivery_timeout,
        }
    }

    /// Run `max_attempts` passes over `batch`.
    pub async fn run(&self, batch: &[Notification]) -> CycleOutcomes {
        let mut outcomes = CycleOutcomes::default();
        for notification in batch {
            if !notification.status.is_terminal() {
                outcomes.insert(notification.id, RetryOutcome::NeedsRetry);
            } else {
                tracing::debug!(
                    notification_id = notification.id,
                    status = %notification.status,
                    "Skipping notification that is no longer pending"
                );
            }
        }

        for pass in 1..=self.max_attempts {
            for notification in batch {
                if notification.status.is_terminal() || outcomes.is_satisfied(notification.id)
                {
                    continue;
                }

                outcomes.attempts += 1;
                let outcome = match self.dispatch(notification).await {
                    Ok(()) => {
                        tracing::info!(
                            notification_id = notification.id,
                            channel = %notification.delivery_channel,
                            pass,
                            "Notification delivered"
                        );
                        RetryOutcome::Satisfied
                    }
                    Err(DispatchError::Unsupported(e)) => {
                        tracing::error!(
                            notification_id = notification.id,
                            channel = %notification.delivery_channel,
                            pass,
                            error = %e,
                            "No notifier available for channel"
                        );
                        RetryOutcome::NeedsRetry
                    }
                    Err(DispatchError::Delivery(e)) => {
                        tracing::warn!(
                            notification_id = notification.id,
                            channel = %notification.delivery_channel,
                            pass,
                            max_attempts = self.max_attempts,
                            error = %e,
                            "Notification delivery failed"
                        );
                        RetryOutcome::NeedsRetry
                    }
                };
                outcomes.insert(notification.id, outcome);
            }
        }

        outcomes
    }

    async fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        let notifier = self.factory.create(notification.delivery_channel)?;

        match tokio::time::timeout(
            self.delivery_timeout,
            notifier.send_notification(notification),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(DeliveryError::Timeout(self.delivery_timeout).into()),
        }
    }
}
