//! Errors surfaced to the chat surface

use thiserror::Error;

/// Rejections from the chat session. The script engine itself never fails;
/// these only cover how the surface drives it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
    #[error("No channel selected")]
    NoActiveChannel,
    #[error("Messaging is disabled in this channel.")]
    MessagingDisabled { channel: String },
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Chat session has shut down")]
    SessionClosed,
}
