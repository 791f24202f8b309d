//! Domain error types.

mod chat_error;

pub use chat_error::{ChatError, DUPLICATE_MESSAGE_CODE};
