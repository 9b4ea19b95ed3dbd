//! Asynchronous notification delivery engine.
//!
//! A single background worker wakes when new notification ids are enqueued
//! (or when its polling interval elapses), loads the affected records, runs a
//! fixed number of delivery passes through the channel-specific notifiers and
//! persists each notification's terminal status.

pub mod cycle;
pub mod email;
pub mod factory;
pub mod notifier;
pub mod reconciler;
pub mod repository;
pub mod resolver;
pub mod retry;
pub mod webhook;
pub mod worker;

pub use cycle::{CycleReport, DeliveryCycle};
pub use factory::{ConfigNotifierFactory, NotifierFactory};
pub use notifier::{DeliveryError, DispatchError, Notifier};
pub use repository::{
    InMemoryNotificationRepository, NotificationRepository, PgNotificationRepository,
    RepositoryError,
};
pub use worker::{NotificationWorker, WorkerError};
