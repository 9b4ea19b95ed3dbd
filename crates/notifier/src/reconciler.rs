//! Persists each notification's terminal status once the retry passes end.

use std::sync::Arc;

use gateway_common::types::{Notification, NotificationStatus};

use crate::repository::NotificationRepository;
use crate::retry::{CycleOutcomes, RetryOutcome};

/// Counts of what a reconciliation wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub completed: usize,
    pub failed: usize,
    pub errors: usize,
}

pub struct StatusReconciler {
    repository: Arc<dyn NotificationRepository>,
}

impl StatusReconciler {
    pub fn new(repository: Arc<dyn NotificationRepository>) -> Self {
        Self { repository }
    }

    /// Write `Completed` for satisfied notifications and `Failed` for the rest.
    ///
    /// Notifications without an outcome (not pending when loaded) are left
    /// untouched. A failed write is logged and the remaining notifications are
    /// still reconciled.
    pub async fn reconcile(
        &self,
        batch: &[Notification],
        outcomes: &CycleOutcomes,
    ) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        for notification in batch {
            let status = match outcomes.get(notification.id) {
                Some(RetryOutcome::Satisfied) => NotificationStatus::Completed,
                Some(RetryOutcome::NeedsRetry) => NotificationStatus::Failed,
                None => continue,
            };

            match self.repository.save_status(notification.id, status).await {
                Ok(_) => match status {
                    NotificationStatus::Completed => summary.completed += 1,
                    _ => summary.failed += 1,
                },
                Err(e) => {
                    tracing::error!(
                        notification_id = notification.id,
                        channel = %notification.delivery_channel,
                        status = %status,
                        error = %e,
                        "Failed to persist notification status"
                    );
                    summary.errors += 1;
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use gateway_common::types::{DeliveryChannel, NewNotification};

    use super::*;
    use crate::repository::{InMemoryNotificationRepository, RepositoryError};

    /// Delegates to an in-memory repository but refuses to save one id.
    struct FlakySaves {
        inner: InMemoryNotificationRepository,
        broken_id: i64,
    }

    #[async_trait]
    impl NotificationRepository for FlakySaves {
        async fn create(
            &self,
            notification: NewNotification,
        ) -> Result<Notification, RepositoryError> {
            self.inner.create(notification).await
        }

        async fn find_all_by_ids(&self, ids: &[i64]) -> Result<Vec<Notification>, RepositoryError> {
            self.inner.find_all_by_ids(ids).await
        }

        async fn find_all_by_status(
            &self,
            status: NotificationStatus,
        ) -> Result<Vec<Notification>, RepositoryError> {
            self.inner.find_all_by_status(status).await
        }

        async fn save_status(
            &self,
            id: i64,
            status: NotificationStatus,
        ) -> Result<Notification, RepositoryError> {
            if id == self.broken_id {
                return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner.save_status(id, status).await
        }
    }

    async fn seed(repo: &dyn NotificationRepository, count: usize) -> Vec<Notification> {
        let mut created = Vec::new();
        for i in 0..count {
            created.push(
                repo.create(NewNotification {
                    key: format!("key-{}", i),
                    message: "hello".to_string(),
                    delivery_channel: DeliveryChannel::Email,
                })
                .await
                .unwrap(),
            );
        }
        created
    }

    #[tokio::test]
    async fn test_outcomes_map_to_terminal_status() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let batch = seed(repo.as_ref(), 2).await;

        let mut outcomes = CycleOutcomes::default();
        outcomes.insert(batch[0].id, RetryOutcome::Satisfied);
        outcomes.insert(batch[1].id, RetryOutcome::NeedsRetry);

        let summary = StatusReconciler::new(repo.clone())
            .reconcile(&batch, &outcomes)
            .await;

        assert_eq!(
            summary,
            ReconcileSummary {
                completed: 1,
                failed: 1,
                errors: 0
            }
        );
        assert_eq!(
            repo.get(batch[0].id).unwrap().status,
            NotificationStatus::Completed
        );
        assert_eq!(
            repo.get(batch[1].id).unwrap().status,
            NotificationStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_notifications_without_outcome_are_untouched() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let batch = seed(repo.as_ref(), 1).await;

        let summary = StatusReconciler::new(repo.clone())
            .reconcile(&batch, &CycleOutcomes::default())
            .await;

        assert_eq!(summary, ReconcileSummary::default());
        assert_eq!(
            repo.get(batch[0].id).unwrap().status,
            NotificationStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_save_failure_does_not_block_remaining() {
        let inner = InMemoryNotificationRepository::new();
        let batch = seed(&inner, 3).await;
        let repo = Arc::new(FlakySaves {
            inner,
            broken_id: batch[0].id,
        });

        let mut outcomes = CycleOutcomes::default();
        for notification in &batch {
            outcomes.insert(notification.id, RetryOutcome::Satisfied);
        }

        let summary = StatusReconciler::new(repo.clone())
            .reconcile(&batch, &outcomes)
            .await;

        assert_eq!(summary.completed, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(
            repo.inner.get(batch[0].id).unwrap().status,
            NotificationStatus::Pending
        );
        assert_eq!(
            repo.inner.get(batch[2].id).unwrap().status,
            NotificationStatus::Completed
        );
    }
}
