//! Background delivery worker.
//!
//! The worker owns a bounded trigger queue of id batches and a single
//! scheduler task. The scheduler waits for either a batch or its polling
//! interval, then runs one [`DeliveryCycle`] at a time: an enqueued batch is
//! processed exactly as given, a timeout sweeps every pending notification.
//!
//! # Lifecycle
//!
//! `NotStarted -> Running -> Stopped`. `Stopped` is terminal. One mutex guards
//! the state and the queue's sender; it is never held across an `.await`.
//!
//! # Full queue
//!
//! When the queue already holds `queue_capacity` batches, [`NotificationWorker::enqueue`]
//! waits for room (backpressure on the caller) rather than dropping the batch.
//! A `stop` issued while a caller is waiting releases it with
//! [`WorkerError::NotRunning`].
//!
//! # Shutdown
//!
//! Every batch accepted by `enqueue` is delivered: on `stop` the scheduler
//! closes the queue and runs one more cycle for each batch still buffered
//! before it exits. A panic inside a cycle is logged and the scheduler keeps
//! running.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use gateway_common::config::WorkerSettings;
use gateway_common::error::AppError;

use crate::cycle::DeliveryCycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("Notification worker is already running")]
    AlreadyRunning,

    #[error("Notification worker is not running")]
    NotRunning,

    #[error("Notification worker has been stopped")]
    Stopped,
}

impl From<WorkerError> for AppError {
    fn from(err: WorkerError) -> Self {
        AppError::Unavailable(err.to_string())
    }
}

enum WorkerState {
    NotStarted,
    Running {
        sender: mpsc::Sender<Vec<i64>>,
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    },
    Stopped,
}

struct WorkerInner {
    state: Mutex<WorkerState>,
    cycle: Arc<DeliveryCycle>,
    poll_interval: Duration,
    queue_capacity: usize,
}

/// Handle to the background delivery worker. Cheap to clone; all clones
/// control the same worker.
#[derive(Clone)]
pub struct NotificationWorker {
    inner: Arc<WorkerInner>,
}

impl NotificationWorker {
    pub fn new(cycle: DeliveryCycle, settings: &WorkerSettings) -> Self {
        Self {
            inner: Arc::new(WorkerInner {
                state: Mutex::new(WorkerState::NotStarted),
                cycle: Arc::new(cycle),
                poll_interval: settings.poll_interval,
                queue_capacity: settings.queue_capacity.max(1),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WorkerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock(), WorkerState::Running { .. })
    }

    /// Allocate the trigger queue and spawn the scheduler task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), WorkerError> {
        let mut state = self.lock();
        match *state {
            WorkerState::NotStarted => {}
            WorkerState::Running { .. } => return Err(WorkerError::AlreadyRunning),
            WorkerState::Stopped => return Err(WorkerError::Stopped),
        }

        let (sender, receiver) = mpsc::channel(self.inner.queue_capacity);
        let cancel = CancellationToken::new();
        let scheduler = Scheduler {
            cycle: self.inner.cycle.clone(),
            receiver,
            cancel: cancel.clone(),
            poll_interval: self.inner.poll_interval,
        };
        let handle = tokio::spawn(scheduler.run());

        *state = WorkerState::Running {
            sender,
            cancel,
            handle,
        };

        tracing::info!(
            poll_interval_secs = self.inner.poll_interval.as_secs(),
            queue_capacity = self.inner.queue_capacity,
            "Notification worker started"
        );
        Ok(())
    }

    /// Stop the worker and wait for the scheduler task to exit.
    ///
    /// A cycle already in progress runs to completion, then every batch still
    /// queued is processed before the scheduler exits.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lock(), WorkerState::Stopped);

        let WorkerState::Running {
            sender,
            cancel,
            handle,
        } = previous
        else {
            return;
        };

        drop(sender);
        cancel.cancel();
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Notification worker task ended abnormally");
        }

        tracing::info!("Notification worker stopped");
    }

    fn sender(&self) -> Option<mpsc::Sender<Vec<i64>>> {
        match &*self.lock() {
            WorkerState::Running { sender, .. } => Some(sender.clone()),
            _ => None,
        }
    }

    /// Hand a batch of notification ids to the worker.
    ///
    /// Waits while the queue is full. An empty batch asks for a sweep of all
    /// pending notifications. `Ok` means the batch will be processed, even if
    /// `stop` is called right after.
    pub async fn enqueue(&self, ids: Vec<i64>) -> Result<(), WorkerError> {
        let Some(sender) = self.sender() else {
            tracing::warn!(batch_size = ids.len(), "Enqueue rejected, worker is not running");
            return Err(WorkerError::NotRunning);
        };

        let batch_size = ids.len();
        sender.send(ids).await.map_err(|_| {
            tracing::warn!(batch_size, "Enqueue rejected, worker stopped while waiting");
            WorkerError::NotRunning
        })?;

        tracing::debug!(batch_size, "Notification batch enqueued");
        Ok(())
    }
}

/// Why the scheduler woke up.
enum Wake {
    Batch(Vec<i64>),
    Timeout,
}

struct Scheduler {
    cycle: Arc<DeliveryCycle>,
    receiver: mpsc::Receiver<Vec<i64>>,
    cancel: CancellationToken,
    poll_interval: Duration,
}

impl Scheduler {
    async fn run(mut self) {
        loop {
            let wake = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                batch = self.receiver.recv() => match batch {
                    Some(ids) => Wake::Batch(ids),
                    None => break,
                },
                _ = tokio::time::sleep(self.poll_interval) => Wake::Timeout,
            };

            self.process(wake).await;
        }

        self.receiver.close();
        let mut drained = 0usize;
        while let Ok(ids) = self.receiver.try_recv() {
            drained += 1;
            self.process(Wake::Batch(ids)).await;
        }
        if drained > 0 {
            tracing::info!(drained, "Processed queued batches on shutdown");
        }
    }

    async fn process(&self, wake: Wake) {
        let (trigger, ids) = match wake {
            Wake::Batch(ids) => ("enqueue", ids),
            Wake::Timeout => ("timer", Vec::new()),
        };

        let batch_size = ids.len();
        let cycle = self.cycle.clone();
        let result = tokio::spawn(async move { cycle.run(&ids).await }).await;

        match result {
            Ok(Ok(report)) if report.loaded > 0 => {
                tracing::info!(
                    trigger,
                    loaded = report.loaded,
                    attempted = report.attempted,
                    completed = report.completed,
                    failed = report.failed,
                    reconcile_errors = report.reconcile_errors,
                    "Delivery cycle finished"
                );
            }
            Ok(Ok(_)) => {
                tracing::debug!(trigger, "Delivery cycle found nothing to deliver");
            }
            Ok(Err(e)) => {
                tracing::error!(
                    trigger,
                    batch_size,
                    error = %e,
                    "Failed to load notifications, skipping cycle"
                );
            }
            Err(e) => {
                tracing::error!(
                    trigger,
                    batch_size,
                    error = %e,
                    "Delivery cycle panicked, notifications left pending"
                );
            }
        }
    }
}
