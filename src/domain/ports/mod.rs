mod channel_port;
mod client_port;
mod i18n_port;
mod notification_port;
mod upload_port;

pub use channel_port::{
    ChannelPort, MarkReadResponse, MessageDraft, MessagePagination, QueryOptions, QueryResult,
};
pub use client_port::{ChannelQuery, ChatClientPort};
pub use i18n_port::I18nPort;
pub use notification_port::NotificationPort;
pub use upload_port::{UploadPort, UploadResponse};
