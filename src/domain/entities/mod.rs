//! Domain entity definitions.

mod channel;
mod local_attachment;
mod member;
mod message;
mod read_state;
mod user;
mod user_cache;

pub use channel::{
    CAPABILITY_SEND_REACTION, CAPABILITY_UPLOAD_FILE, ChannelCid, ChannelData, ChannelSnapshot,
    TypingEntry, temp_channel_key,
};
pub use local_attachment::{LocalAttachment, LocalFile, LocalMetadata, UploadState};
pub use member::Member;
pub use message::{
    Attachment, Message, MessageId, MessageKind, MessageStatus, Reaction, ReactionGroup,
};
pub use read_state::{ChannelUnreadState, ReadState};
pub use user::{User, UserId};
pub use user_cache::UserCache;
