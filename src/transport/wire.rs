//! JSON shapes spoken by the chat server.
//!
//! Field names follow the server, including its `reciever` spelling. Decoding
//! is lenient about missing fields: validation of ids and timestamps belongs to
//! the transcript store, so a message without them still decodes.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{chat::ChatSummary, events::PushEvent, message::IncomingMessage};

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed push frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),
    #[error("malformed history page: {0}")]
    MalformedPage(#[source] serde_json::Error),
    #[error("failed to encode outbound frame: {0}")]
    Encode(#[source] serde_json::Error),
}

impl WireError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedFrame(_) => "WIRE_MALFORMED_FRAME",
            Self::MalformedPage(_) => "WIRE_MALFORMED_PAGE",
            Self::Encode(_) => "WIRE_ENCODE_FAILED",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
enum WireEvent {
    NewMessage(WireNewMessage),
    NewChat(WireNewChat),
    MessageOpened(WireMessageOpened),
}

#[derive(Debug, Deserialize)]
struct WireNewMessage {
    message: WireMessage,
    #[serde(default)]
    chat: Option<WireChat>,
    #[serde(rename = "recieverId", default)]
    receiver_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireNewChat {
    chat: WireChat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessageOpened {
    chat_id: String,
    message_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WireMessage {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "chatId", default)]
    pub chat_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<WireUserRef>,
    #[serde(rename = "reciever", default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<WireUserRef>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<WireTimestamp>,
    #[serde(default)]
    pub opened: bool,
}

/// A user either inlined as an object or referenced by id.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum WireUserRef {
    Id(String),
    User {
        #[serde(rename = "_id")]
        id: String,
    },
}

impl WireUserRef {
    pub fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::User { id } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum WireTimestamp {
    Millis(i64),
    Rfc3339(String),
}

impl WireTimestamp {
    /// Unix milliseconds, `None` when the text is not RFC 3339.
    pub fn to_millis(&self) -> Option<i64> {
        match self {
            Self::Millis(ms) => Some(*ms),
            Self::Rfc3339(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|parsed| parsed.timestamp_millis()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireChat {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default)]
    pub users: Vec<WireUserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<WireTimestamp>,
}

#[derive(Debug, Deserialize)]
struct WireHistoryPage {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WirePrivateMessage<'a> {
    event: &'static str,
    data: WirePrivateMessageData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePrivateMessageData<'a> {
    chat_id: &'a str,
    message: &'a str,
    #[serde(rename = "recieverId")]
    receiver_id: &'a str,
}

impl From<WireMessage> for IncomingMessage {
    fn from(wire: WireMessage) -> Self {
        Self {
            timestamp_ms: wire.timestamp.as_ref().and_then(WireTimestamp::to_millis),
            id: wire.id,
            chat_id: wire.chat_id,
            sender_id: wire.sender.map(WireUserRef::into_id).unwrap_or_default(),
            receiver_id: wire.receiver.map(WireUserRef::into_id).unwrap_or_default(),
            content: wire.content,
            opened: wire.opened,
        }
    }
}

impl From<WireChat> for ChatSummary {
    fn from(wire: WireChat) -> Self {
        Self {
            title: wire.chat_name.or(wire.room).unwrap_or_default(),
            participant_ids: wire.users.into_iter().map(WireUserRef::into_id).collect(),
            last_activity_ms: wire.last_activity.as_ref().and_then(WireTimestamp::to_millis),
            chat_id: wire.id,
        }
    }
}

impl WireEvent {
    fn into_push_event(self) -> PushEvent {
        match self {
            WireEvent::NewMessage(payload) => {
                let message = IncomingMessage::from(payload.message);
                let chat = payload.chat.map(ChatSummary::from).unwrap_or_else(|| ChatSummary {
                    chat_id: message.chat_id.clone(),
                    ..ChatSummary::default()
                });
                PushEvent::NewMessage {
                    message,
                    chat,
                    receiver_id: payload.receiver_id,
                }
            }
            WireEvent::NewChat(payload) => PushEvent::NewChat {
                chat: payload.chat.into(),
            },
            WireEvent::MessageOpened(payload) => PushEvent::MessageOpened {
                chat_id: payload.chat_id,
                message_id: payload.message_id,
            },
        }
    }
}

pub fn decode_push_event(frame: &str) -> Result<PushEvent, WireError> {
    serde_json::from_str::<WireEvent>(frame)
        .map(WireEvent::into_push_event)
        .map_err(WireError::MalformedFrame)
}

/// Decodes a `chatMessages` answer, either `{"messages": [...]}` or a bare
/// array.
pub fn decode_history_page(payload: &str) -> Result<Vec<IncomingMessage>, WireError> {
    let messages = match serde_json::from_str::<WireHistoryPage>(payload) {
        Ok(page) => page.messages,
        Err(_) => serde_json::from_str::<Vec<WireMessage>>(payload)
            .map_err(WireError::MalformedPage)?,
    };

    Ok(messages.into_iter().map(IncomingMessage::from).collect())
}

pub fn encode_private_message(
    chat_id: &str,
    content: &str,
    receiver_id: &str,
) -> Result<String, WireError> {
    serde_json::to_string(&WirePrivateMessage {
        event: "privateMessage",
        data: WirePrivateMessageData {
            chat_id,
            message: content,
            receiver_id,
        },
    })
    .map_err(WireError::Encode)
}
