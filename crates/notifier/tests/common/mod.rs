//! Test doubles shared by the notifier integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use gateway_common::config::WorkerSettings;
use gateway_common::types::{DeliveryChannel, NewNotification, Notification, UnsupportedChannel};
use gateway_notifier::{
    DeliveryError, InMemoryNotificationRepository, Notifier, NotifierFactory,
    NotificationRepository,
};

/// Scripted delivery results keyed by notification id. Ids without a script
/// are delivered successfully.
#[derive(Default)]
pub struct Script {
    results: Mutex<HashMap<i64, VecDeque<bool>>>,
    calls: Mutex<Vec<i64>>,
}

impl Script {
    pub fn fail_then(&self, id: i64, results: &[bool]) {
        self.results
            .lock()
            .unwrap()
            .insert(id, results.iter().copied().collect());
    }

    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, id: i64) -> usize {
        self.calls().iter().filter(|c| **c == id).count()
    }
}

pub struct ScriptedNotifier {
    script: Arc<Script>,
    channel: DeliveryChannel,
}

#[async_trait]
impl Notifier for ScriptedNotifier {
    async fn send_notification(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.script.calls.lock().unwrap().push(notification.id);
        let ok = self
            .script
            .results
            .lock()
            .unwrap()
            .get_mut(&notification.id)
            .and_then(|q| q.pop_front())
            .unwrap_or(true);
        if ok {
            Ok(())
        } else {
            Err(DeliveryError::Rejected { status: 503 })
        }
    }

    fn channel(&self) -> DeliveryChannel {
        self.channel
    }
}

/// Factory handing out scripted notifiers for the channels it supports.
pub struct ScriptedFactory {
    pub script: Arc<Script>,
    pub supported: Vec<DeliveryChannel>,
}

impl ScriptedFactory {
    pub fn all_channels(script: Arc<Script>) -> Self {
        Self {
            script,
            supported: DeliveryChannel::ALL.to_vec(),
        }
    }
}

impl NotifierFactory for ScriptedFactory {
    fn create(&self, channel: DeliveryChannel) -> Result<Box<dyn Notifier>, UnsupportedChannel> {
        if !self.supported.contains(&channel) {
            return Err(UnsupportedChannel::new(channel.to_string()));
        }
        Ok(Box::new(ScriptedNotifier {
            script: self.script.clone(),
            channel,
        }))
    }
}

pub fn fast_settings() -> WorkerSettings {
    WorkerSettings {
        poll_interval: Duration::from_secs(3600),
        queue_capacity: 10,
        max_attempts: 3,
        delivery_timeout: Duration::from_secs(1),
    }
}

pub async fn seed(
    repo: &InMemoryNotificationRepository,
    channel: DeliveryChannel,
    count: usize,
) -> Vec<i64> {
    let mut ids = Vec::new();
    for i in 0..count {
        let created = repo
            .create(NewNotification {
                key: format!("key-{}", i),
                message: format!("message {}", i),
                delivery_channel: channel,
            })
            .await
            .unwrap();
        ids.push(created.id);
    }
    ids
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
