use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    domain::{chat::ChatSummary, message::IncomingMessage},
    usecases::{
        list_chats::{ChatsSource, ListChatsSourceError},
        load_history::{HistorySource, HistorySourceError},
        send_message::{MessageSink, SendMessageSourceError},
    },
};

pub fn incoming(id: &str, chat_id: &str, timestamp_ms: i64) -> IncomingMessage {
    IncomingMessage {
        id: Some(id.to_owned()),
        chat_id: chat_id.to_owned(),
        sender_id: "alice".to_owned(),
        receiver_id: "bob".to_owned(),
        content: format!("content of {id}"),
        timestamp_ms: Some(timestamp_ms),
        opened: false,
    }
}

pub fn chat(chat_id: &str, last_activity_ms: Option<i64>) -> ChatSummary {
    ChatSummary {
        chat_id: chat_id.to_owned(),
        title: format!("Chat {chat_id}"),
        participant_ids: vec!["me".to_owned(), format!("peer-{chat_id}")],
        last_activity_ms,
    }
}

/// `count` messages for `chat_id` with timestamps `first * 1000` and up.
pub fn messages(chat_id: &str, first: i64, count: i64) -> Vec<IncomingMessage> {
    (first..first + count)
        .map(|i| incoming(&format!("{chat_id}-m{i}"), chat_id, i * 1_000))
        .collect()
}

/// History source answering from a fixed table of pages.
#[derive(Default)]
pub struct ScriptedHistory {
    pages: HashMap<(String, u32), Vec<IncomingMessage>>,
    delays: HashMap<String, Duration>,
    silent: HashSet<String>,
    requests: Mutex<Vec<(String, u32, usize)>>,
}

impl ScriptedHistory {
    pub fn with_page(mut self, chat_id: &str, page: u32, messages: Vec<IncomingMessage>) -> Self {
        self.pages.insert((chat_id.to_owned(), page), messages);
        self
    }

    pub fn with_delay(mut self, chat_id: &str, delay: Duration) -> Self {
        self.delays.insert(chat_id.to_owned(), delay);
        self
    }

    /// Requests for `chat_id` never complete.
    pub fn never_answering(mut self, chat_id: &str) -> Self {
        self.silent.insert(chat_id.to_owned());
        self
    }

    pub fn requests(&self) -> Vec<(String, u32, usize)> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl HistorySource for ScriptedHistory {
    async fn fetch_history(
        &self,
        chat_id: &str,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<IncomingMessage>, HistorySourceError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push((chat_id.to_owned(), page, page_size));

        if self.silent.contains(chat_id) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delays.get(chat_id) {
            tokio::time::sleep(*delay).await;
        }

        Ok(self
            .pages
            .get(&(chat_id.to_owned(), page))
            .cloned()
            .unwrap_or_default())
    }
}

pub struct StubChats {
    pub result: Result<Vec<ChatSummary>, ListChatsSourceError>,
}

#[async_trait]
impl ChatsSource for StubChats {
    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ListChatsSourceError> {
        self.result.clone()
    }
}

/// Sink forwarding every emission as `(chat_id, content, recipient_id)`.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(String, String, String)>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, String, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn send_message(
        &self,
        chat_id: &str,
        content: &str,
        recipient_id: &str,
    ) -> Result<(), SendMessageSourceError> {
        self.tx
            .send((
                chat_id.to_owned(),
                content.to_owned(),
                recipient_id.to_owned(),
            ))
            .map_err(|_| SendMessageSourceError::Unavailable)
    }
}
