//! Domain layer with chat entities, events and port definitions.

/// Connection status shared between controllers.
pub mod connection;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Real-time event definitions.
pub mod events;
/// User-facing notifications.
pub mod notification;
/// Port definitions.
pub mod ports;

pub use connection::ConnectionStatus;
pub use entities::{ChannelCid, Message, MessageId, User, UserId};
pub use errors::ChatError;
pub use events::ChatEvent;
pub use notification::{Notification, NotificationLevel};
pub use ports::{ChannelPort, ChatClientPort, I18nPort, NotificationPort, UploadPort};
