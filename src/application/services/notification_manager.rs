//! Queue of user-facing notifications.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::domain::ports::NotificationPort;
use crate::domain::{Notification, NotificationLevel};

/// Queue of user-facing notifications, shown one at a time.
#[derive(Debug)]
pub struct NotificationManager {
    queue: Mutex<VecDeque<Notification>>,
    default_duration: Duration,
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl NotificationManager {
    /// Creates an empty queue; pushed notifications expire after `default_duration` on screen.
    #[must_use]
    pub fn new(default_duration: Duration) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default_duration,
        }
    }

    /// Queues a notification behind those already waiting.
    pub fn push(&self, level: NotificationLevel, text: impl Into<String>) {
        let notification = Notification::new(level, text).with_duration(self.default_duration);
        debug!(level = ?notification.level, text = %notification.text, "Queued notification");
        self.queue.lock().push_back(notification);
    }

    /// Marks the front notification displayed and drops it once expired.
    pub fn tick(&self) {
        let mut queue = self.queue.lock();
        if let Some(front) = queue.front_mut() {
            front.mark_displayed();
            if front.is_expired() {
                queue.pop_front();
                if let Some(next) = queue.front_mut() {
                    next.mark_displayed();
                }
            }
        }
    }

    /// Notification currently on screen.
    #[must_use]
    pub fn current_notification(&self) -> Option<Notification> {
        self.queue.lock().front().cloned()
    }

    /// Removes and returns every queued notification.
    pub fn drain(&self) -> Vec<Notification> {
        self.queue.lock().drain(..).collect()
    }

    /// True while anything is queued.
    #[must_use]
    pub fn has_notifications(&self) -> bool {
        !self.queue.lock().is_empty()
    }
}

impl NotificationPort for NotificationManager {
    fn notify(&self, text: &str, level: NotificationLevel) {
        self.push(level, text);
    }
}
