//! Shared application state for the Axum API server.

use std::sync::Arc;

use gateway_common::config::AppConfig;
use gateway_notifier::{NotificationRepository, NotificationWorker};

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn NotificationRepository>,
    pub worker: NotificationWorker,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn NotificationRepository>,
        worker: NotificationWorker,
        config: AppConfig,
    ) -> Self {
        Self {
            repository,
            worker,
            config: Arc::new(config),
        }
    }
}
