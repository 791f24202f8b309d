use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

use super::{ChannelAction, ChannelRenderState, channel_reducer};

/// Shared handle over the channel render state.
///
/// Every mutation goes through [`ChannelStore::dispatch`]; observers follow
/// the state through [`ChannelStore::subscribe`].
#[derive(Clone)]
pub struct ChannelStore {
    sender: Arc<watch::Sender<ChannelRenderState>>,
}

impl Default for ChannelStore {
    fn default() -> Self {
        Self::new(ChannelRenderState::default())
    }
}

impl ChannelStore {
    /// Store seeded with `initial`.
    #[must_use]
    pub fn new(initial: ChannelRenderState) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Runs `action` through the reducer and notifies subscribers.
    pub fn dispatch(&self, action: ChannelAction) {
        trace!(action = action.kind(), "Dispatching channel action");
        self.sender.send_modify(|state| {
            let current = std::mem::take(state);
            *state = channel_reducer(current, action);
        });
    }

    /// Checks the state and dispatches the action `check` returns, under a
    /// single lock.
    ///
    /// Returns the value paired with the action, or `None` when `check`
    /// declined and nothing changed.
    pub fn dispatch_if<R>(
        &self,
        check: impl FnOnce(&ChannelRenderState) -> Option<(R, ChannelAction)>,
    ) -> Option<R> {
        let mut value = None;
        self.sender.send_if_modified(|state| {
            let Some((checked, action)) = check(state) else {
                return false;
            };
            trace!(action = action.kind(), "Dispatching channel action");
            let current = std::mem::take(state);
            *state = channel_reducer(current, action);
            value = Some(checked);
            true
        });
        value
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn state(&self) -> ChannelRenderState {
        self.sender.borrow().clone()
    }

    /// Reads the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&ChannelRenderState) -> R) -> R {
        f(&self.sender.borrow())
    }

    /// Receiver that wakes on every dispatched change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChannelRenderState> {
        self.sender.subscribe()
    }
}
