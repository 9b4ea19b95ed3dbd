//! One processing cycle: resolve, retry, reconcile.

use std::sync::Arc;

use gateway_common::config::WorkerSettings;

use crate::factory::NotifierFactory;
use crate::reconciler::StatusReconciler;
use crate::repository::{NotificationRepository, RepositoryError};
use crate::resolver::PendingResolver;
use crate::retry::RetryController;

/// What a single cycle did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Records loaded by the resolver
    pub loaded: usize,
    /// Dispatch attempts across all passes
    pub attempted: usize,
    pub completed: usize,
    pub failed: usize,
    pub reconcile_errors: usize,
}

pub struct DeliveryCycle {
    resolver: PendingResolver,
    retry: RetryController,
    reconciler: StatusReconciler,
}

impl DeliveryCycle {
    pub fn new(
        repository: Arc<dyn NotificationRepository>,
        factory: Arc<dyn NotifierFactory>,
        settings: &WorkerSettings,
    ) -> Self {
        Self {
            resolver: PendingResolver::new(repository.clone()),
            retry: RetryController::new(factory, settings.max_attempts, settings.delivery_timeout),
            reconciler: StatusReconciler::new(repository),
        }
    }

    /// Process `ids`, or every pending notification when `ids` is empty.
    ///
    /// Only a failure to load the batch is returned; nothing has been written
    /// in that case.
    pub async fn run(&self, ids: &[i64]) -> Result<CycleReport, RepositoryError> {
        let batch = self.resolver.resolve(ids).await?;
        if batch.is_empty() {
            return Ok(CycleReport::default());
        }

        let outcomes = self.retry.run(&batch).await;
        let summary = self.reconciler.reconcile(&batch, &outcomes).await;

        Ok(CycleReport {
            loaded: batch.len(),
            attempted: outcomes.attempts(),
            completed: summary.completed,
            failed: summary.failed,
            reconcile_errors: summary.errors,
        })
    }
}
