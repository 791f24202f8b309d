use std::time::{Duration, Instant};

/// Severity of a notification.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warn,
    Error,
}

/// Notification shown to the user.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Localized text.
    pub text: String,
    /// When it was queued.
    pub created_at: Instant,
    /// When it first reached the screen.
    pub displayed_at: Option<Instant>,
    /// How long it stays on screen.
    pub duration: Duration,
}

impl Notification {
    /// Notification with the default five second duration.
    #[must_use]
    pub fn new(level: NotificationLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            created_at: Instant::now(),
            displayed_at: None,
            duration: Duration::from_secs(5),
        }
    }

    /// Overrides the on-screen duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// True once it has been on screen longer than its duration.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.displayed_at
            .is_some_and(|start| start.elapsed() > self.duration)
    }

    /// Starts the on-screen timer; later calls are ignored.
    pub fn mark_displayed(&mut self) {
        if self.displayed_at.is_none() {
            self.displayed_at = Some(Instant::now());
        }
    }
}
