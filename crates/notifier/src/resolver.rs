//! Resolves the set of notifications a cycle acts on.

use std::sync::Arc;

use gateway_common::types::{Notification, NotificationStatus};

use crate::repository::{NotificationRepository, RepositoryError};

pub struct PendingResolver {
    repository: Arc<dyn NotificationRepository>,
}

impl PendingResolver {
    pub fn new(repository: Arc<dyn NotificationRepository>) -> Self {
        Self { repository }
    }

    /// Load exactly `ids` when given, otherwise every `Pending` notification.
    ///
    /// Explicit ids are not filtered by status here; stale records are skipped
    /// later by the retry controller.
    pub async fn resolve(&self, ids: &[i64]) -> Result<Vec<Notification>, RepositoryError> {
        if ids.is_empty() {
            self.repository
                .find_all_by_status(NotificationStatus::Pending)
                .await
        } else {
            self.repository.find_all_by_ids(ids).await
        }
    }
}

#[cfg(test)]
mod tests {
    use gateway_common::types::{DeliveryChannel, NewNotification};

    use super::*;
    use crate::repository::InMemoryNotificationRepository;

    async fn seed(repo: &InMemoryNotificationRepository, count: usize) -> Vec<i64> {
        let mut ids = Vec::new();
        for i in 0..count {
            let created = repo
                .create(NewNotification {
                    key: format!("key-{}", i),
                    message: "hello".to_string(),
                    delivery_channel: DeliveryChannel::ChatWebhook,
                })
                .await
                .unwrap();
            ids.push(created.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_empty_filter_loads_all_pending() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let ids = seed(&repo, 3).await;
        repo.save_status(ids[0], NotificationStatus::Completed)
            .await
            .unwrap();

        let resolver = PendingResolver::new(repo.clone());
        let loaded = resolver.resolve(&[]).await.unwrap();
        let loaded_ids: Vec<i64> = loaded.iter().map(|n| n.id).collect();
        assert_eq!(loaded_ids, vec![ids[1], ids[2]]);
    }

    #[tokio::test]
    async fn test_explicit_ids_load_regardless_of_status() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let ids = seed(&repo, 3).await;
        repo.save_status(ids[0], NotificationStatus::Failed)
            .await
            .unwrap();

        let resolver = PendingResolver::new(repo.clone());
        let loaded = resolver.resolve(&[ids[0], ids[2]]).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].status, NotificationStatus::Failed);
    }

    #[tokio::test]
    async fn test_explicit_ids_keep_trigger_order() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let ids = seed(&repo, 3).await;

        let resolver = PendingResolver::new(repo.clone());
        let loaded = resolver.resolve(&[ids[2], ids[0], ids[1]]).await.unwrap();
        let loaded_ids: Vec<i64> = loaded.iter().map(|n| n.id).collect();
        assert_eq!(loaded_ids, vec![ids[2], ids[0], ids[1]]);
    }
}
