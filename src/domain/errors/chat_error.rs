//! Chat operation error types.

use thiserror::Error;

/// Server error code the chat backend uses for input errors, including
/// "message already exists" on resend.
pub const DUPLICATE_MESSAGE_CODE: i32 = 4;

/// Errors raised by the external chat collaborator or by local guards.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ChatError {
    #[error("query failed: {message}")]
    QueryFailed { message: String },

    #[error("request rejected by server (code {code}): {message}")]
    Server { code: i32, message: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("client is offline")]
    Offline,

    #[error("permission denied: {capability}")]
    PermissionDenied { capability: String },

    #[error("{0}")]
    MissingIdentifier(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upload failed: {message}")]
    UploadFailed { message: String },
}

impl ChatError {
    /// Creates query failed error.
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self::QueryFailed {
            message: message.into(),
        }
    }

    /// Creates server error with code.
    #[must_use]
    pub fn server(code: i32, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            message: message.into(),
        }
    }

    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates permission denied error.
    #[must_use]
    pub fn permission_denied(capability: impl Into<String>) -> Self {
        Self::PermissionDenied {
            capability: capability.into(),
        }
    }

    /// Creates missing identifier error.
    #[must_use]
    pub fn missing_identifier(message: impl Into<String>) -> Self {
        Self::MissingIdentifier(message.into())
    }

    /// Creates upload failed error.
    #[must_use]
    pub fn upload(message: impl Into<String>) -> Self {
        Self::UploadFailed {
            message: message.into(),
        }
    }

    /// Returns whether a send failed only because the message already exists
    /// on the server, which means an earlier attempt went through.
    #[must_use]
    pub fn is_duplicate_message(&self) -> bool {
        matches!(
            self,
            Self::Server { code, message }
                if *code == DUPLICATE_MESSAGE_CODE && message.contains("already exists")
        )
    }

    /// Returns whether a user-triggered retry may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::QueryFailed { .. }
                | Self::Network { .. }
                | Self::Offline
                | Self::UploadFailed { .. }
        )
    }

    /// Returns the server error code, if any.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}
