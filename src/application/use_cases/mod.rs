//! Controllers driving channel state.

mod attachment_uploads;
mod channel_list_controller;
mod channel_session;
mod event_dispatcher;
mod message_actions;
mod pagination;

pub use attachment_uploads::AttachmentUploads;
pub use channel_list_controller::{ChannelListController, ChannelListState};
pub use channel_session::{ChannelSession, MessageListView};
pub use event_dispatcher::{EventDispatcher, LatestMessageDates};
pub use message_actions::{MessageActions, NewMessage};
pub use pagination::PaginationController;
