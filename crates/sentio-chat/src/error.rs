//! Error types for the conversational core.

use sentio_core::error::SentioError;

/// Errors from the chat pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is disabled")]
    Disabled,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("user id cannot be empty")]
    MissingUser,
    #[error("no session for this user; call welcome first")]
    NoSession,
    #[error("generation service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("generation timed out after {0} ms")]
    Timeout(u128),
    #[error("emotion classification failed: {0}")]
    ClassificationFailure(String),
    #[error("invalid generator configuration: {0}")]
    Config(String),
    #[error("session state unavailable: {0}")]
    SessionState(String),
}

impl From<ChatError> for SentioError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Config(msg) => SentioError::Config(msg),
            other => SentioError::Generation(other.to_string()),
        }
    }
}
