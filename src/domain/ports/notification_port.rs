use crate::domain::NotificationLevel;

/// Port for the generic user-facing notification channel.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationPort: Send + Sync {
    /// Shows an already localized notification.
    fn notify(&self, text: &str, level: NotificationLevel);
}

#[cfg(test)]
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every notification for later assertions.
    #[derive(Default, Clone)]
    pub struct RecordingNotifier {
        pub notifications: Arc<Mutex<Vec<(String, NotificationLevel)>>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn texts(&self) -> Vec<String> {
            self.notifications
                .lock()
                .iter()
                .map(|(text, _)| text.clone())
                .collect()
        }

        pub fn count(&self) -> usize {
            self.notifications.lock().len()
        }
    }

    impl NotificationPort for RecordingNotifier {
        fn notify(&self, text: &str, level: NotificationLevel) {
            self.notifications.lock().push((text.to_string(), level));
        }
    }
}
