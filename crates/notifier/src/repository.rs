//! Notification persistence.
//!
//! The delivery engine only ever reads notifications and moves their status
//! out of `Pending`; records are never deleted.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;

use gateway_common::error::AppError;
use gateway_common::types::{NewNotification, Notification, NotificationStatus};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification {0} not found")]
    NotFound(i64),

    #[error("Notification {0} is no longer pending")]
    NotPending(i64),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => AppError::Database(e),
            RepositoryError::NotFound(id) => AppError::NotFound(format!("Notification {}", id)),
            RepositoryError::NotPending(id) => {
                AppError::Validation(format!("Notification {} is no longer pending", id))
            }
        }
    }
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Persist a new notification in `Pending` status.
    async fn create(&self, notification: NewNotification) -> Result<Notification, RepositoryError>;

    /// Load the notifications with the given ids, whatever their status, in
    /// the order the ids are given. Unknown ids are skipped and a repeated id
    /// yields one record.
    async fn find_all_by_ids(&self, ids: &[i64]) -> Result<Vec<Notification>, RepositoryError>;

    async fn find_all_by_status(
        &self,
        status: NotificationStatus,
    ) -> Result<Vec<Notification>, RepositoryError>;

    /// Move a pending notification to `status`, leaving every other field as
    /// currently persisted.
    async fn save_status(
        &self,
        id: i64,
        status: NotificationStatus,
    ) -> Result<Notification, RepositoryError>;
}

/// PostgreSQL-backed repository.
#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: NewNotification) -> Result<Notification, RepositoryError> {
        let created: Notification = sqlx::query_as(
            r#"
            INSERT INTO notifications (key, message, delivery_channel, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&notification.key)
        .bind(&notification.message)
        .bind(notification.delivery_channel.to_string())
        .bind(NotificationStatus::Pending.to_string())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            notification_id = created.id,
            channel = %created.delivery_channel,
            "Notification created"
        );

        Ok(created)
    }

    async fn find_all_by_ids(&self, ids: &[i64]) -> Result<Vec<Notification>, RepositoryError> {
        let notifications: Vec<Notification> = sqlx::query_as(
            r#"
            SELECT n.*
            FROM notifications n
            JOIN (
                SELECT id, MIN(ord) AS ord
                FROM UNNEST($1::BIGINT[]) WITH ORDINALITY AS batch(id, ord)
                GROUP BY id
            ) batch ON batch.id = n.id
            ORDER BY batch.ord
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn find_all_by_status(
        &self,
        status: NotificationStatus,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let notifications: Vec<Notification> =
            sqlx::query_as("SELECT * FROM notifications WHERE status = $1 ORDER BY id")
                .bind(status.to_string())
                .fetch_all(&self.pool)
                .await?;

        Ok(notifications)
    }

    async fn save_status(
        &self,
        id: i64,
        status: NotificationStatus,
    ) -> Result<Notification, RepositoryError> {
        let updated: Option<Notification> = sqlx::query_as(
            r#"
            UPDATE notifications
            SET status = $1
            WHERE id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(status.to_string())
        .bind(id)
        .bind(NotificationStatus::Pending.to_string())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(notification) = updated {
            return Ok(notification);
        }

        // Distinguish a missing row from one that already left `Pending`
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Err(RepositoryError::NotPending(id)),
            None => Err(RepositoryError::NotFound(id)),
        }
    }
}

/// Process-local repository, used by tests and for running without a database.
#[derive(Default)]
pub struct InMemoryNotificationRepository {
    state: Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    last_id: i64,
    rows: BTreeMap<i64, Notification>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut InMemoryState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Snapshot of a single record.
    pub fn get(&self, id: i64) -> Option<Notification> {
        self.with_state(|state| state.rows.get(&id).cloned())
    }

    /// Snapshot of every record, ordered by id.
    pub fn all(&self) -> Vec<Notification> {
        self.with_state(|state| state.rows.values().cloned().collect())
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: NewNotification) -> Result<Notification, RepositoryError> {
        Ok(self.with_state(|state| {
            state.last_id += 1;
            let created = Notification {
                id: state.last_id,
                key: notification.key,
                message: notification.message,
                delivery_channel: notification.delivery_channel,
                status: NotificationStatus::Pending,
                created_at: Utc::now(),
            };
            state.rows.insert(created.id, created.clone());
            created
        }))
    }

    async fn find_all_by_ids(&self, ids: &[i64]) -> Result<Vec<Notification>, RepositoryError> {
        let mut seen = HashSet::new();
        Ok(self.with_state(|state| {
            ids.iter()
                .filter(|id| seen.insert(**id))
                .filter_map(|id| state.rows.get(id).cloned())
                .collect()
        }))
    }

    async fn find_all_by_status(
        &self,
        status: NotificationStatus,
    ) -> Result<Vec<Notification>, RepositoryError> {
        Ok(self.with_state(|state| {
            state
                .rows
                .values()
                .filter(|n| n.status == status)
                .cloned()
                .collect()
        }))
    }

    async fn save_status(
        &self,
        id: i64,
        status: NotificationStatus,
    ) -> Result<Notification, RepositoryError> {
        self.with_state(|state| {
            let row = state.rows.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
            if row.status != NotificationStatus::Pending {
                return Err(RepositoryError::NotPending(id));
            }
            row.status = status;
            Ok(row.clone())
        })
    }
}
