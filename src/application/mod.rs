//! Application layer with the channel reducer, pure services and controllers.

/// Pure list, reaction and throttling helpers.
pub mod services;
/// Render state, actions and the reducer.
pub mod state;
/// Controllers for channels and the channel list.
pub mod use_cases;

pub use state::{ChannelAction, ChannelRenderState, ChannelStore};
pub use use_cases::{
    AttachmentUploads, ChannelListController, ChannelSession, EventDispatcher, MessageActions,
    NewMessage, PaginationController,
};
