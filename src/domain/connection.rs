use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared online flag, flipped by `connection.changed` events and read by
/// pagination before issuing queries.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    online: Arc<AtomicBool>,
}

impl ConnectionStatus {
    /// Status starting as `online`.
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    /// Last known connection state.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Records a connection change.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new(true)
    }
}
