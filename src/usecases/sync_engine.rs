//! Single serialization point for every mutation of the session state.
//!
//! The engine is synchronous: it takes one input at a time (UI intent, push
//! event, fetch outcome) and returns the [`Effect`]s the async session has to
//! carry out. Nothing in here awaits.

use std::{sync::Arc, time::Duration};

use crate::domain::{
    chat::ChatSummary,
    chat_list_state::{ChatListState, ChatListUiState},
    events::{PushEvent, UiIntent},
    message::Message,
    pagination::{HistoryPage, HistoryTicket, PageOutcome},
    transcript_state::{TranscriptRegistry, TranscriptState},
    viewport::{ScrollMetrics, ViewportAction, ViewportThresholds},
};

use super::{
    list_chats::{ListChatsError, ListChatsOutput},
    live_updates::{LiveOutcome, LiveUpdateListener},
    load_history::{normalize_page_size, LoadHistoryError},
    send_message::SendMessageCommand,
};

const HISTORY_FETCH_FAILED: &str = "SYNC_HISTORY_FETCH_FAILED";
const HISTORY_STALE_RESPONSE: &str = "SYNC_HISTORY_STALE_RESPONSE";
const SEND_WITHOUT_ACTIVE_CHAT: &str = "SYNC_SEND_WITHOUT_ACTIVE_CHAT";
const SEND_WITHOUT_RECIPIENT: &str = "SYNC_SEND_WITHOUT_RECIPIENT";
const CHAT_LIST_LOAD_FAILED: &str = "SYNC_CHAT_LIST_LOAD_FAILED";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub local_user_id: String,
    pub page_size: usize,
    pub fetch_timeout: Duration,
    pub thresholds: ViewportThresholds,
}

impl SessionSettings {
    pub fn new(local_user_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            page_size: normalize_page_size(0),
            fetch_timeout: Duration::from_secs(10),
            thresholds: ViewportThresholds::default(),
        }
    }
}

/// Work the async session performs on behalf of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch(HistoryTicket),
    Send(SendMessageCommand),
    Viewport(ViewportAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded(HistoryPage),
    Failed {
        ticket: HistoryTicket,
        error: LoadHistoryError,
    },
}

/// Everything the presentation layer may read.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub active_chat_id: Option<String>,
    pub messages: Arc<[Message]>,
    pub is_at_bottom: bool,
    pub unread_count: u32,
    pub has_more: bool,
    pub loading: bool,
    pub page: u32,
    pub chats: Vec<ChatSummary>,
    pub chat_list_state: ChatListUiState,
    pub scroll: Option<ScrollMetrics>,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            active_chat_id: None,
            messages: Arc::from(Vec::new()),
            is_at_bottom: true,
            unread_count: 0,
            has_more: false,
            loading: false,
            page: 0,
            chats: Vec::new(),
            chat_list_state: ChatListUiState::Loading,
            scroll: None,
        }
    }
}

#[derive(Debug)]
pub struct SyncEngine {
    settings: SessionSettings,
    transcripts: TranscriptRegistry,
    chat_list: ChatListState,
    listener: LiveUpdateListener,
}

impl SyncEngine {
    pub fn new(settings: SessionSettings) -> Self {
        let page_size = normalize_page_size(settings.page_size);
        Self {
            transcripts: TranscriptRegistry::new(page_size, settings.thresholds),
            chat_list: ChatListState::default(),
            listener: LiveUpdateListener::default(),
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn active(&self) -> Option<&TranscriptState> {
        self.transcripts.active()
    }

    pub fn chat_list(&self) -> &ChatListState {
        &self.chat_list
    }

    pub fn handle_intent(&mut self, intent: UiIntent) -> Vec<Effect> {
        match intent {
            UiIntent::OpenChat { chat_id } => self.open_chat(&chat_id),
            UiIntent::Scrolled(metrics) => {
                let Some(state) = self.transcripts.active_mut() else {
                    return Vec::new();
                };
                if state.viewport_mut().on_scroll(metrics) {
                    self.load_more()
                } else {
                    Vec::new()
                }
            }
            UiIntent::ContentResized { content_height } => self
                .transcripts
                .active_mut()
                .and_then(|state| state.viewport_mut().on_content_resized(content_height))
                .map(Effect::Viewport)
                .into_iter()
                .collect(),
            UiIntent::LoadMore => self.load_more(),
            UiIntent::SendMessage { text } => self.send(text),
            UiIntent::ScrollToBottom => self
                .transcripts
                .active_mut()
                .map(|state| Effect::Viewport(state.viewport_mut().scroll_to_bottom()))
                .into_iter()
                .collect(),
        }
    }

    pub fn handle_push(&mut self, event: PushEvent) -> Vec<Effect> {
        let outcome = self
            .listener
            .apply(event, &mut self.transcripts, &mut self.chat_list);

        if outcome != LiveOutcome::Inserted {
            return Vec::new();
        }

        self.transcripts
            .active_mut()
            .and_then(|state| state.viewport_mut().on_message_inserted())
            .map(Effect::Viewport)
            .into_iter()
            .collect()
    }

    pub fn handle_fetch_outcome(&mut self, outcome: FetchOutcome) -> Vec<Effect> {
        match outcome {
            FetchOutcome::Loaded(page) => self.apply_page(page),
            FetchOutcome::Failed { ticket, error } => {
                let reverted = self
                    .transcripts
                    .get_mut(&ticket.chat_id)
                    .is_some_and(|state| state.pagination_mut().fail(&ticket));

                if reverted {
                    tracing::warn!(
                        code = HISTORY_FETCH_FAILED,
                        reason = error.code(),
                        chat_id = %ticket.chat_id,
                        page = ticket.page,
                        "history fetch failed; pagination is idle again"
                    );
                } else {
                    tracing::debug!(
                        code = HISTORY_STALE_RESPONSE,
                        reason = error.code(),
                        chat_id = %ticket.chat_id,
                        page = ticket.page,
                        "ignoring failure of a superseded history fetch"
                    );
                }
                Vec::new()
            }
        }
    }

    pub fn handle_chats_loaded(&mut self, result: Result<ListChatsOutput, ListChatsError>) {
        match result {
            Ok(output) => self.chat_list.set_ready(output.chats),
            Err(error) => {
                tracing::warn!(
                    code = CHAT_LIST_LOAD_FAILED,
                    error = %error,
                    "initial chat list load failed"
                );
                self.chat_list.set_error();
            }
        }
    }

    pub fn view(&self) -> SessionView {
        let chats = self.chat_list.chats().to_vec();
        let chat_list_state = self.chat_list.ui_state();

        let Some(state) = self.transcripts.active() else {
            return SessionView {
                chats,
                chat_list_state,
                ..SessionView::default()
            };
        };

        let flags = state.flags();
        SessionView {
            active_chat_id: Some(state.chat_id().to_owned()),
            messages: state.store().snapshot(),
            is_at_bottom: flags.is_at_bottom,
            unread_count: flags.unread_count,
            has_more: flags.has_more,
            loading: flags.loading,
            page: state.cursor().page,
            chats,
            chat_list_state,
            scroll: state.viewport().metrics(),
        }
    }

    fn open_chat(&mut self, chat_id: &str) -> Vec<Effect> {
        let Some(state) = self.transcripts.activate(chat_id) else {
            return Vec::new();
        };

        let mut effects = vec![Effect::Viewport(state.viewport_mut().reset())];
        if let Some(ticket) = state.pagination_mut().load_next_page() {
            effects.push(Effect::Fetch(ticket));
        }
        self.chat_list.select_chat(chat_id);

        tracing::info!(chat_id, epoch = self.transcripts.epoch(), "conversation opened");
        effects
    }

    fn load_more(&mut self) -> Vec<Effect> {
        self.transcripts
            .active_mut()
            .and_then(|state| state.pagination_mut().load_next_page())
            .map(Effect::Fetch)
            .into_iter()
            .collect()
    }

    fn apply_page(&mut self, page: HistoryPage) -> Vec<Effect> {
        let ticket = page.ticket.clone();
        let Some(state) = self
            .transcripts
            .get_mut(&ticket.chat_id)
            .filter(|state| state.epoch() == ticket.epoch)
        else {
            tracing::debug!(
                code = HISTORY_STALE_RESPONSE,
                chat_id = %ticket.chat_id,
                page = ticket.page,
                epoch = ticket.epoch,
                "discarding history page for an inactive conversation"
            );
            return Vec::new();
        };

        let (pagination, store) = state.pagination_and_store_mut();
        let PageOutcome::Applied { summary, page, has_more } = pagination.complete(page, store)
        else {
            return Vec::new();
        };

        tracing::debug!(
            chat_id = %ticket.chat_id,
            page,
            inserted = summary.inserted,
            rejected = summary.rejected,
            has_more,
            "history page applied"
        );

        if summary.inserted == 0 {
            return Vec::new();
        }

        if page == 1 {
            vec![Effect::Viewport(state.viewport_mut().on_initial_page())]
        } else {
            state.viewport_mut().on_prepend_committed();
            Vec::new()
        }
    }

    fn send(&mut self, text: String) -> Vec<Effect> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("ignoring blank message");
            return Vec::new();
        }

        let Some(chat_id) = self.transcripts.active_chat_id().map(str::to_owned) else {
            tracing::warn!(
                code = SEND_WITHOUT_ACTIVE_CHAT,
                "send requested without an open conversation"
            );
            return Vec::new();
        };

        let recipient = self
            .chat_list
            .chat(&chat_id)
            .and_then(|chat| chat.counterpart_of(&self.settings.local_user_id))
            .map(str::to_owned);
        let Some(recipient_id) = recipient else {
            tracing::warn!(
                code = SEND_WITHOUT_RECIPIENT,
                chat_id = %chat_id,
                "send requested for a chat without a known recipient"
            );
            return Vec::new();
        };

        vec![Effect::Send(SendMessageCommand {
            chat_id,
            recipient_id,
            text: text.to_owned(),
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{chat, incoming};

    fn engine() -> SyncEngine {
        let mut engine = SyncEngine::new(SessionSettings::new("me"));
        engine.handle_chats_loaded(Ok(ListChatsOutput {
            chats: vec![chat("a", Some(20)), chat("b", Some(10))],
        }));
        engine
    }

    fn fetch_ticket(effects: &[Effect]) -> HistoryTicket {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Fetch(ticket) => Some(ticket.clone()),
                _ => None,
            })
            .expect("a fetch effect")
    }

    fn page(ticket: HistoryTicket, ids: std::ops::RangeInclusive<i64>) -> FetchOutcome {
        let messages = ids
            .map(|i| incoming(&format!("m{i}"), &ticket.chat_id, i * 1_000))
            .collect();
        FetchOutcome::Loaded(HistoryPage { ticket, messages })
    }

    fn live(chat_id: &str, id: &str, timestamp_ms: i64) -> PushEvent {
        PushEvent::NewMessage {
            message: incoming(id, chat_id, timestamp_ms),
            chat: chat(chat_id, None),
            receiver_id: Some("me".to_owned()),
        }
    }

    fn scroll(offset: f64) -> UiIntent {
        UiIntent::Scrolled(ScrollMetrics {
            offset,
            content_height: 2_000.0,
            viewport_height: 500.0,
        })
    }

    fn open(engine: &mut SyncEngine, chat_id: &str) -> HistoryTicket {
        let effects = engine.handle_intent(UiIntent::OpenChat {
            chat_id: chat_id.to_owned(),
        });
        assert_eq!(
            effects.first(),
            Some(&Effect::Viewport(ViewportAction::JumpToBottom))
        );
        fetch_ticket(&effects)
    }

    #[test]
    fn opening_chat_resets_viewport_and_requests_first_page() {
        let mut engine = engine();

        let ticket = open(&mut engine, "a");

        assert_eq!(ticket.page, 1);
        assert_eq!(ticket.page_size, 20);
        let view = engine.view();
        assert_eq!(view.active_chat_id.as_deref(), Some("a"));
        assert!(view.loading);
        assert!(view.is_at_bottom);
    }

    #[test]
    fn reopening_active_chat_does_nothing() {
        let mut engine = engine();
        open(&mut engine, "a");

        let effects = engine.handle_intent(UiIntent::OpenChat {
            chat_id: "a".to_owned(),
        });

        assert!(effects.is_empty());
    }

    #[test]
    fn two_page_scenario_reaches_exhaustion() {
        let mut engine = engine();
        let first = open(&mut engine, "a");

        let effects = engine.handle_fetch_outcome(page(first, 1..=20));
        assert_eq!(
            effects,
            vec![Effect::Viewport(ViewportAction::JumpToBottom)]
        );
        let view = engine.view();
        assert!(view.has_more);
        assert_eq!(view.page, 1);
        assert_eq!(view.messages.len(), 20);

        let second = fetch_ticket(&engine.handle_intent(UiIntent::LoadMore));
        assert_eq!(second.page, 2);
        engine.handle_fetch_outcome(page(second, 21..=35));

        let view = engine.view();
        assert!(!view.has_more);
        assert!(!view.loading);
        assert_eq!(view.messages.len(), 35);
        assert!(view
            .messages
            .windows(2)
            .all(|pair| pair[0].timestamp_ms < pair[1].timestamp_ms));
        assert!(engine.handle_intent(UiIntent::LoadMore).is_empty());
    }

    #[test]
    fn load_more_while_loading_issues_single_fetch() {
        let mut engine = engine();
        open(&mut engine, "a");

        assert!(engine.handle_intent(UiIntent::LoadMore).is_empty());
        assert!(engine.handle_intent(UiIntent::LoadMore).is_empty());
    }

    #[test]
    fn upward_scroll_to_top_triggers_next_page() {
        let mut engine = engine();
        let first = open(&mut engine, "a");
        engine.handle_fetch_outcome(page(first, 1..=20));

        assert!(engine.handle_intent(scroll(1_500.0)).is_empty());
        let effects = engine.handle_intent(scroll(10.0));

        assert_eq!(fetch_ticket(&effects).page, 2);
    }

    #[test]
    fn prepend_restores_scroll_offset_on_resize() {
        let mut engine = engine();
        let first = open(&mut engine, "a");
        engine.handle_fetch_outcome(page(first, 21..=40));
        engine.handle_intent(scroll(1_500.0));
        let second = fetch_ticket(&engine.handle_intent(scroll(30.0)));

        assert!(engine.handle_fetch_outcome(page(second, 1..=20)).is_empty());
        let effects = engine.handle_intent(UiIntent::ContentResized {
            content_height: 3_800.0,
        });

        assert_eq!(
            effects,
            vec![Effect::Viewport(ViewportAction::RestoreOffset(1_830.0))]
        );
    }

    #[test]
    fn failed_fetch_reverts_to_idle_for_retry() {
        let mut engine = engine();
        let first = open(&mut engine, "a");

        engine.handle_fetch_outcome(FetchOutcome::Failed {
            ticket: first.clone(),
            error: LoadHistoryError::TimedOut,
        });

        let view = engine.view();
        assert!(!view.loading);
        assert!(view.has_more);
        assert_eq!(fetch_ticket(&engine.handle_intent(UiIntent::LoadMore)), first);
    }

    #[test]
    fn page_for_previous_conversation_is_discarded() {
        let mut engine = engine();
        let stale = open(&mut engine, "a");
        open(&mut engine, "b");

        assert!(engine.handle_fetch_outcome(page(stale, 1..=20)).is_empty());

        let view = engine.view();
        assert_eq!(view.active_chat_id.as_deref(), Some("b"));
        assert!(view.messages.is_empty());
        assert!(view.loading);
    }

    #[test]
    fn page_from_before_switching_back_is_discarded() {
        let mut engine = engine();
        let stale = open(&mut engine, "a");
        open(&mut engine, "b");
        let fresh = open(&mut engine, "a");
        assert_eq!(stale.page, fresh.page);

        assert!(engine.handle_fetch_outcome(page(stale, 1..=20)).is_empty());
        assert!(engine.view().messages.is_empty());

        engine.handle_fetch_outcome(page(fresh, 1..=5));
        assert_eq!(engine.view().messages.len(), 5);
    }

    #[test]
    fn live_message_at_bottom_auto_scrolls() {
        let mut engine = engine();
        let first = open(&mut engine, "a");
        engine.handle_fetch_outcome(page(first, 1..=3));

        let effects = engine.handle_push(live("a", "new", 99_000));

        assert_eq!(
            effects,
            vec![Effect::Viewport(ViewportAction::ScrollToBottom)]
        );
        let view = engine.view();
        assert_eq!(view.unread_count, 0);
        assert_eq!(view.messages.last().map(|m| m.id.as_str()), Some("new"));
    }

    #[test]
    fn live_messages_away_from_bottom_count_unread_until_scroll_to_bottom() {
        let mut engine = engine();
        let first = open(&mut engine, "a");
        engine.handle_fetch_outcome(page(first, 1..=20));
        engine.handle_intent(scroll(1_500.0));
        engine.handle_intent(scroll(700.0));

        for i in 0..3 {
            assert!(engine
                .handle_push(live("a", &format!("live{i}"), 100_000 + i))
                .is_empty());
        }
        assert_eq!(engine.view().unread_count, 3);

        let effects = engine.handle_intent(UiIntent::ScrollToBottom);

        assert_eq!(
            effects,
            vec![Effect::Viewport(ViewportAction::ScrollToBottom)]
        );
        let view = engine.view();
        assert_eq!(view.unread_count, 0);
        assert!(view.is_at_bottom);
    }

    #[test]
    fn duplicate_live_message_does_not_count_unread() {
        let mut engine = engine();
        let first = open(&mut engine, "a");
        engine.handle_fetch_outcome(page(first, 1..=20));
        engine.handle_intent(scroll(1_500.0));
        engine.handle_intent(scroll(700.0));

        engine.handle_push(live("a", "m20", 20_000));

        assert_eq!(engine.view().unread_count, 0);
        assert_eq!(engine.view().messages.len(), 20);
    }

    #[test]
    fn background_message_reorders_chat_list_only() {
        let mut engine = engine();
        open(&mut engine, "a");

        assert!(engine.handle_push(live("b", "x", 50)).is_empty());

        let view = engine.view();
        assert!(view.messages.is_empty());
        assert_eq!(
            view.chats.first().map(|chat| chat.chat_id.as_str()),
            Some("b")
        );
    }

    #[test]
    fn send_targets_counterpart_of_active_chat() {
        let mut engine = engine();
        open(&mut engine, "a");

        let effects = engine.handle_intent(UiIntent::SendMessage {
            text: "hi".to_owned(),
        });

        assert_eq!(
            effects,
            vec![Effect::Send(SendMessageCommand {
                chat_id: "a".to_owned(),
                recipient_id: "peer-a".to_owned(),
                text: "hi".to_owned(),
            })]
        );
    }

    #[test]
    fn blank_send_produces_no_effect() {
        let mut engine = engine();
        open(&mut engine, "a");

        let effects = engine.handle_intent(UiIntent::SendMessage {
            text: " \t\n ".to_owned(),
        });

        assert!(effects.is_empty());
    }

    #[test]
    fn send_trims_text() {
        let mut engine = engine();
        open(&mut engine, "a");

        let effects = engine.handle_intent(UiIntent::SendMessage {
            text: "  hi  ".to_owned(),
        });

        assert!(matches!(&effects[..], [Effect::Send(command)] if command.text == "hi"));
    }

    #[test]
    fn send_without_open_chat_is_dropped() {
        let mut engine = engine();

        let effects = engine.handle_intent(UiIntent::SendMessage {
            text: "hi".to_owned(),
        });

        assert!(effects.is_empty());
    }

    #[test]
    fn chat_list_failure_is_reported_in_view() {
        let mut engine = SyncEngine::new(SessionSettings::new("me"));

        engine.handle_chats_loaded(Err(ListChatsError::TemporarilyUnavailable));

        assert_eq!(engine.view().chat_list_state, ChatListUiState::Error);
    }
}
