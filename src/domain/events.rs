use super::{chat::ChatSummary, message::IncomingMessage, viewport::ScrollMetrics};

/// Server-initiated events delivered by the push channel, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    NewMessage {
        message: IncomingMessage,
        chat: ChatSummary,
        receiver_id: Option<String>,
    },
    NewChat {
        chat: ChatSummary,
    },
    MessageOpened {
        chat_id: String,
        message_id: String,
    },
}

impl PushEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewMessage { .. } => "new_message",
            Self::NewChat { .. } => "new_chat",
            Self::MessageOpened { .. } => "message_opened",
        }
    }
}

/// Inputs coming from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UiIntent {
    OpenChat { chat_id: String },
    Scrolled(ScrollMetrics),
    ContentResized { content_height: f64 },
    LoadMore,
    SendMessage { text: String },
    ScrollToBottom,
}
