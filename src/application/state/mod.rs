//! Channel render state and its reducer.

mod action;
mod channel_state;
mod reducer;
mod store;

pub use action::ChannelAction;
pub use channel_state::ChannelRenderState;
pub use reducer::channel_reducer;
pub use store::ChannelStore;
