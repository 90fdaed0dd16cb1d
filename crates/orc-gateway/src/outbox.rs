// outbox.rs — Notifier that queues messages for the host to collect.
//
// The prompt host polls `GET /notifications` and shows whatever is queued as
// toasts. Delivery is fire-and-forget: when nobody polls, the oldest
// messages are dropped once the queue is full.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use orc_pipeline::{Notification, Notifier};

const DEFAULT_CAPACITY: usize = 64;

pub struct Outbox {
    queue: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl Outbox {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Take every queued notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for Outbox {
    fn notify(&self, notification: Notification) {
        tracing::info!(severity = ?notification.severity, "notification: {}", notification.message);
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.len() == self.capacity {
            queue.pop_front();
        }
        queue.push_back(notification);
    }
}
