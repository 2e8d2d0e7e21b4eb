use std::cmp::Ordering;

use thiserror::Error;

/// A validated chat message.
///
/// Everything except `opened` is fixed once the message exists; `opened` only
/// ever flips from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp_ms: i64,
    pub opened: bool,
}

impl Message {
    /// Transcript order: timestamp ascending, id as tie breaker.
    pub fn transcript_order(&self, other: &Self) -> Ordering {
        self.timestamp_ms
            .cmp(&other.timestamp_ms)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A message as delivered by an external source, before validation.
///
/// History pages and push events both arrive in this shape; only the
/// transcript store turns it into a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncomingMessage {
    pub id: Option<String>,
    pub chat_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp_ms: Option<i64>,
    pub opened: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MessageValidationError {
    #[error("message has no id")]
    MissingId,
    #[error("message has no timestamp")]
    MissingTimestamp,
}

impl MessageValidationError {
    pub fn code(self) -> &'static str {
        match self {
            Self::MissingId => "MESSAGE_MISSING_ID",
            Self::MissingTimestamp => "MESSAGE_MISSING_TIMESTAMP",
        }
    }
}

impl IncomingMessage {
    pub fn validate(self) -> Result<Message, MessageValidationError> {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or(MessageValidationError::MissingId)?;
        let timestamp_ms = self
            .timestamp_ms
            .ok_or(MessageValidationError::MissingTimestamp)?;

        Ok(Message {
            id,
            chat_id: self.chat_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            timestamp_ms,
            opened: self.opened,
        })
    }
}

impl From<Message> for IncomingMessage {
    fn from(message: Message) -> Self {
        Self {
            id: Some(message.id),
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content,
            timestamp_ms: Some(message.timestamp_ms),
            opened: message.opened,
        }
    }
}
