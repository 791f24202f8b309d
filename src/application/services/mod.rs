pub mod channel_list;
pub mod message_list;
pub mod notification_manager;
pub mod reactions;
pub mod throttle;
pub mod typing;
pub mod watch_registry;

pub use channel_list::{ChannelHandle, ChannelListEntry, move_channel_up};
pub use message_list::{
    GroupStyle, ProcessMessagesOptions, ProcessedMessages, RenderedMessage, get_group_styles,
    get_read_states, group_styles, insert_intro, process_messages,
};
pub use notification_manager::NotificationManager;
pub use throttle::Throttle;
pub use watch_registry::{ChannelTarget, WatchRegistry};
