//! Use case for sending a message into a chat.
//!
//! Sending is fire-and-forget: the sink either accepts the emission or fails,
//! and nothing here waits for the far end to confirm delivery. The message
//! shows up in the transcript only when the push channel echoes it back.

use async_trait::async_trait;

/// Command to send a message to a specific chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub chat_id: String,
    pub recipient_id: String,
    pub text: String,
}

/// Errors reported by the outbound transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMessageSourceError {
    /// User is not authorized.
    Unauthorized,
    /// Target chat was not found or is not accessible.
    ChatNotFound,
    /// Transport is not connected.
    Unavailable,
}

/// Domain-level errors for the send operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendMessageError {
    /// Message text is empty after trimming whitespace.
    #[error("message text is empty")]
    EmptyMessage,
    #[error("not authorized to send messages")]
    Unauthorized,
    #[error("chat was not found")]
    ChatNotFound,
    #[error("message transport is temporarily unavailable")]
    TemporarilyUnavailable,
}

impl SendMessageError {
    pub fn code(self) -> &'static str {
        match self {
            Self::EmptyMessage => "SEND_EMPTY_MESSAGE",
            Self::Unauthorized => "SEND_UNAUTHORIZED",
            Self::ChatNotFound => "SEND_CHAT_NOT_FOUND",
            Self::TemporarilyUnavailable => "SEND_UNAVAILABLE",
        }
    }
}

/// Outbound half of the chat transport.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Emits `content` into `chat_id`, addressed to `recipient_id`.
    async fn send_message(
        &self,
        chat_id: &str,
        content: &str,
        recipient_id: &str,
    ) -> Result<(), SendMessageSourceError>;
}

/// Validates the text (must not be empty after trimming) and hands the
/// trimmed text to the sink.
pub async fn send_message(
    sink: &dyn MessageSink,
    command: SendMessageCommand,
) -> Result<(), SendMessageError> {
    let text = command.text.trim();
    if text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }

    sink.send_message(&command.chat_id, text, &command.recipient_id)
        .await
        .map_err(map_source_error)
}

fn map_source_error(error: SendMessageSourceError) -> SendMessageError {
    match error {
        SendMessageSourceError::Unauthorized => SendMessageError::Unauthorized,
        SendMessageSourceError::ChatNotFound => SendMessageError::ChatNotFound,
        SendMessageSourceError::Unavailable => SendMessageError::TemporarilyUnavailable,
    }
}
