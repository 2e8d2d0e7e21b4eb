//! JSON fixtures that stand in for the chat server.
//!
//! A fixture carries the local user, the initial chat list, the full history of
//! each chat and a script of steps. Histories are written as the server answers
//! `chatMessages`, newest first, either `{"messages": [...]}` or a bare array.

use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::Mutex,
};

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    domain::{chat::ChatSummary, message::IncomingMessage},
    infra::error::AppError,
    transport::wire::{decode_history_page, encode_private_message, WireChat, WireError},
    usecases::{
        list_chats::{ChatsSource, ListChatsSourceError},
        load_history::{HistorySource, HistorySourceError},
        send_message::{MessageSink, SendMessageSourceError},
    },
};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplayFixture {
    pub user_id: String,
    #[serde(default)]
    pub chats: Vec<WireChat>,
    /// Chat id to its `chatMessages` answer.
    #[serde(default)]
    pub history: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub steps: Vec<ReplayStep>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum ReplayStep {
    #[serde(rename_all = "camelCase")]
    Open { chat_id: String },
    #[serde(rename_all = "camelCase")]
    Scroll {
        offset: f64,
        content_height: f64,
        viewport_height: f64,
    },
    ContentHeight { height: f64 },
    LoadMore,
    Send { text: String },
    ScrollToBottom,
    /// A raw push frame, exactly as the server would send it.
    Push { frame: serde_json::Value },
}

pub fn load_fixture(path: &Path) -> Result<ReplayFixture, AppError> {
    let raw = fs::read_to_string(path).map_err(|source| AppError::FixtureRead {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|source| AppError::FixtureParse {
        path: path.to_path_buf(),
        source,
    })
}

/// History source paging the fixture's per-chat history.
#[derive(Debug, Default)]
pub struct FixtureHistory {
    newest_first: HashMap<String, Vec<IncomingMessage>>,
}

impl FixtureHistory {
    pub fn new(history: &HashMap<String, serde_json::Value>) -> Result<Self, WireError> {
        let mut newest_first = HashMap::with_capacity(history.len());
        for (chat_id, answer) in history {
            let mut messages = decode_history_page(&answer.to_string())?;
            for message in &mut messages {
                if message.chat_id.is_empty() {
                    message.chat_id = chat_id.clone();
                }
            }
            newest_first.insert(chat_id.clone(), messages);
        }

        Ok(Self { newest_first })
    }
}

#[async_trait]
impl HistorySource for FixtureHistory {
    async fn fetch_history(
        &self,
        chat_id: &str,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<IncomingMessage>, HistorySourceError> {
        let Some(messages) = self.newest_first.get(chat_id) else {
            return Err(HistorySourceError::ChatNotFound);
        };

        let start = (page.saturating_sub(1) as usize).saturating_mul(page_size);
        Ok(messages
            .iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect())
    }
}

#[derive(Debug)]
pub struct FixtureChats {
    chats: Vec<ChatSummary>,
}

impl FixtureChats {
    pub fn new(chats: &[WireChat]) -> Self {
        Self {
            chats: chats.iter().cloned().map(ChatSummary::from).collect(),
        }
    }
}

#[async_trait]
impl ChatsSource for FixtureChats {
    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ListChatsSourceError> {
        if self.chats.iter().any(|chat| chat.chat_id.is_empty()) {
            return Err(ListChatsSourceError::InvalidData);
        }
        Ok(self.chats.clone())
    }
}

/// Sink that keeps the `privateMessage` frames it would have emitted.
#[derive(Debug, Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn frames(&self) -> Vec<String> {
        self.frames
            .lock()
            .map(|frames| frames.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send_message(
        &self,
        chat_id: &str,
        content: &str,
        recipient_id: &str,
    ) -> Result<(), SendMessageSourceError> {
        let frame = encode_private_message(chat_id, content, recipient_id)
            .map_err(|_| SendMessageSourceError::Unavailable)?;
        let mut frames = self
            .frames
            .lock()
            .map_err(|_| SendMessageSourceError::Unavailable)?;
        frames.push(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "userId": "me",
        "chats": [{"_id": "c1", "chatName": "Bob", "users": ["me", "bob"]}],
        "history": {
            "c1": [
                {"_id": "m3", "timestamp": 3000},
                {"_id": "m2", "timestamp": 2000},
                {"_id": "m1", "timestamp": 1000}
            ]
        },
        "steps": [
            {"step": "open", "chatId": "c1"},
            {"step": "scroll", "offset": 10, "contentHeight": 900, "viewportHeight": 400},
            {"step": "loadMore"},
            {"step": "push", "frame": {"event": "newChat", "data": {"chat": {"_id": "c2"}}}}
        ]
    }"#;

    fn fixture() -> ReplayFixture {
        serde_json::from_str(FIXTURE).expect("fixture must parse")
    }

    #[test]
    fn parses_steps() {
        let fixture = fixture();

        assert_eq!(fixture.user_id, "me");
        assert_eq!(fixture.steps.len(), 4);
        assert_eq!(
            fixture.steps[0],
            ReplayStep::Open {
                chat_id: "c1".to_owned()
            }
        );
        assert_eq!(fixture.steps[2], ReplayStep::LoadMore);
    }

    #[test]
    fn load_fixture_reports_path_on_parse_error() {
        let temp_dir = tempfile::tempdir().expect("must create temp dir");
        let path = temp_dir.path().join("fixture.json");
        fs::write(&path, "{\"steps\": 3}").expect("must write fixture");

        let err = load_fixture(&path).expect_err("fixture must fail");

        assert!(matches!(err, AppError::FixtureParse { path: ref p, .. } if p == &path));
    }

    #[tokio::test]
    async fn history_pages_newest_first_and_fills_chat_id() {
        let history = FixtureHistory::new(&fixture().history).expect("history must decode");

        let first = history.fetch_history("c1", 1, 2).await.expect("page 1");
        let second = history.fetch_history("c1", 2, 2).await.expect("page 2");

        let ids = |page: &[IncomingMessage]| {
            page.iter()
                .filter_map(|message| message.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), vec!["m3", "m2"]);
        assert_eq!(ids(&second), vec!["m1"]);
        assert!(first.iter().all(|message| message.chat_id == "c1"));
        assert_eq!(
            history.fetch_history("nope", 1, 2).await,
            Err(HistorySourceError::ChatNotFound)
        );
    }

    #[tokio::test]
    async fn history_accepts_wrapped_answers() {
        let history: HashMap<String, serde_json::Value> = serde_json::from_str(
            r#"{"c1": {"messages": [{"_id": "m2", "timestamp": 2000}, {"_id": "m1", "timestamp": 1000}]}}"#,
        )
        .expect("history must parse");

        let history = FixtureHistory::new(&history).expect("history must decode");
        let page = history.fetch_history("c1", 1, 20).await.expect("page 1");

        assert_eq!(page.len(), 2);
        assert_eq!(page[0].timestamp_ms, Some(2_000));
    }

    #[test]
    fn malformed_history_is_rejected() {
        let history: HashMap<String, serde_json::Value> =
            serde_json::from_str(r#"{"c1": {"messages": "nope"}}"#).expect("history must parse");

        let err = FixtureHistory::new(&history).expect_err("history must fail");

        assert_eq!(err.code(), "WIRE_MALFORMED_PAGE");
    }

    #[tokio::test]
    async fn recording_sink_encodes_frames() {
        let sink = RecordingSink::default();

        sink.send_message("c1", "hi", "bob").await.expect("send");

        assert_eq!(
            sink.frames(),
            vec![r#"{"event":"privateMessage","data":{"chatId":"c1","message":"hi","recieverId":"bob"}}"#]
        );
    }
}
