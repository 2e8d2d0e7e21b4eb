//! Plain-text rendering of a replay outcome.
//!
//! Transcript lines group consecutive messages from the same sender and put a
//! date separator between days. Times are rendered in UTC so reports are
//! reproducible.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    domain::{chat_list_state::ChatListUiState, message::Message, viewport::ViewportAction},
    ui::replay::ReplayOutcome,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptLine {
    DateSeparator(String),
    Message {
        time: String,
        sender: Option<String>,
        content: String,
        opened: bool,
    },
}

pub fn build_transcript_lines(messages: &[Message]) -> Vec<TranscriptLine> {
    let mut lines = Vec::new();
    let mut prev_date: Option<NaiveDate> = None;
    let mut prev_sender: Option<&str> = None;

    for message in messages {
        let date = timestamp_to_datetime(message.timestamp_ms).date_naive();

        if prev_date != Some(date) {
            lines.push(TranscriptLine::DateSeparator(
                date.format("%d %b %Y").to_string(),
            ));
            prev_sender = None;
        }

        let sender = message.sender_id.as_str();
        lines.push(TranscriptLine::Message {
            time: timestamp_to_datetime(message.timestamp_ms)
                .format("%H:%M")
                .to_string(),
            sender: (prev_sender != Some(sender)).then(|| sender.to_owned()),
            content: message.content.clone(),
            opened: message.opened,
        });

        prev_date = Some(date);
        prev_sender = Some(sender);
    }

    lines
}

pub fn render(outcome: &ReplayOutcome) -> String {
    let view = &outcome.view;
    let mut out = Vec::new();

    out.push(format!(
        "chat list ({}):",
        chat_list_state_label(view.chat_list_state)
    ));
    for chat in &view.chats {
        let marker = if view.active_chat_id.as_deref() == Some(chat.chat_id.as_str()) {
            '>'
        } else {
            ' '
        };
        let title = if chat.title.is_empty() {
            chat.chat_id.as_str()
        } else {
            chat.title.as_str()
        };
        out.push(format!("{marker} {title} [{}]", chat.chat_id));
    }

    out.push(String::new());
    match view.active_chat_id.as_deref() {
        Some(chat_id) => out.push(format!("transcript {chat_id}:")),
        None => out.push("no open conversation".to_owned()),
    }
    for line in build_transcript_lines(&view.messages) {
        match line {
            TranscriptLine::DateSeparator(date) => out.push(format!("--- {date} ---")),
            TranscriptLine::Message {
                time,
                sender,
                content,
                opened,
            } => {
                let tick = if opened { " (opened)" } else { "" };
                match sender {
                    Some(sender) => {
                        out.push(format!("{time} {sender}:"));
                        out.push(format!("      {content}{tick}"));
                    }
                    None => out.push(format!("{time} {content}{tick}")),
                }
            }
        }
    }

    out.push(String::new());
    out.push(format!(
        "page={} has_more={} loading={} at_bottom={} unread={}",
        view.page, view.has_more, view.loading, view.is_at_bottom, view.unread_count
    ));
    if !outcome.viewport_actions.is_empty() {
        let actions: Vec<String> = outcome
            .viewport_actions
            .iter()
            .map(viewport_action_label)
            .collect();
        out.push(format!("viewport: {}", actions.join(", ")));
    }
    for frame in &outcome.sent_frames {
        out.push(format!("sent: {frame}"));
    }

    out.join("\n")
}

fn timestamp_to_datetime(timestamp_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_default()
}

fn chat_list_state_label(state: ChatListUiState) -> &'static str {
    match state {
        ChatListUiState::Loading => "loading",
        ChatListUiState::Ready => "ready",
        ChatListUiState::Empty => "empty",
        ChatListUiState::Error => "error",
    }
}

fn viewport_action_label(action: &ViewportAction) -> String {
    match action {
        ViewportAction::ScrollToBottom => "scroll-to-bottom".to_owned(),
        ViewportAction::JumpToBottom => "jump-to-bottom".to_owned(),
        ViewportAction::RestoreOffset(offset) => format!("restore-offset({offset})"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        test_support::{chat, incoming},
        usecases::sync_engine::SessionView,
    };

    const DAY_MS: i64 = 86_400_000;

    fn message(id: &str, sender: &str, timestamp_ms: i64) -> Message {
        let mut incoming = incoming(id, "c1", timestamp_ms);
        incoming.sender_id = sender.to_owned();
        incoming.validate().expect("valid message")
    }

    #[test]
    fn groups_senders_and_separates_days() {
        let messages = vec![
            message("m1", "alice", 60_000),
            message("m2", "alice", 120_000),
            message("m3", "bob", 180_000),
            message("m4", "bob", DAY_MS + 60_000),
        ];

        let lines = build_transcript_lines(&messages);

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], TranscriptLine::DateSeparator("01 Jan 1970".to_owned()));
        assert!(matches!(&lines[1], TranscriptLine::Message { sender: Some(s), time, .. } if s == "alice" && time == "00:01"));
        assert!(matches!(&lines[2], TranscriptLine::Message { sender: None, .. }));
        assert!(matches!(&lines[3], TranscriptLine::Message { sender: Some(s), .. } if s == "bob"));
        assert_eq!(lines[4], TranscriptLine::DateSeparator("02 Jan 1970".to_owned()));
        assert!(matches!(&lines[5], TranscriptLine::Message { sender: Some(s), .. } if s == "bob"));
    }

    #[test]
    fn renders_chat_list_transcript_and_flags() {
        let outcome = ReplayOutcome {
            view: SessionView {
                active_chat_id: Some("c1".to_owned()),
                messages: Arc::from(vec![message("m1", "alice", 60_000)]),
                page: 1,
                chats: vec![chat("c1", Some(1)), chat("c2", None)],
                chat_list_state: ChatListUiState::Ready,
                ..SessionView::default()
            },
            viewport_actions: vec![ViewportAction::JumpToBottom, ViewportAction::RestoreOffset(12.5)],
            sent_frames: vec!["{}".to_owned()],
            steps_run: 1,
        };

        let report = render(&outcome);

        assert!(report.contains("chat list (ready):\n> Chat c1 [c1]\n  Chat c2 [c2]"));
        assert!(report.contains("00:01 alice:\n      content of m1"));
        assert!(report.contains("page=1 has_more=false loading=false at_bottom=true unread=0"));
        assert!(report.contains("viewport: jump-to-bottom, restore-offset(12.5)"));
        assert!(report.contains("sent: {}"));
    }
}
