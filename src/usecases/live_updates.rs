use crate::domain::{
    chat::ChatSummary,
    chat_list_state::ChatListState,
    events::PushEvent,
    transcript_state::TranscriptRegistry,
    transcript_store::UpsertOutcome,
};

const LIVE_EVENT_REJECTED: &str = "SYNC_LIVE_EVENT_REJECTED";

/// What a push event did to the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveOutcome {
    /// A new message landed in the active transcript.
    Inserted,
    /// The active transcript already had the message.
    Duplicate,
    /// Only the chat list changed.
    ChatListOnly,
    /// A stored message was marked opened.
    Opened,
    /// The event failed validation and was dropped.
    Rejected,
    Ignored,
}

/// Sequential consumer of push events for the whole session.
///
/// Events are applied one at a time in delivery order; deduplication is left
/// to the transcript store.
#[derive(Debug, Default)]
pub struct LiveUpdateListener {
    delivered: u64,
}

impl LiveUpdateListener {
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn apply(
        &mut self,
        event: PushEvent,
        transcripts: &mut TranscriptRegistry,
        chat_list: &mut ChatListState,
    ) -> LiveOutcome {
        self.delivered += 1;
        let sequence = self.delivered;
        let kind = event.kind();

        let outcome = match event {
            PushEvent::NewMessage { message, chat, .. } => {
                let (Some(_), Some(timestamp_ms)) = (message.id.as_ref(), message.timestamp_ms)
                else {
                    tracing::warn!(
                        code = LIVE_EVENT_REJECTED,
                        sequence,
                        "dropping new message event without id or timestamp"
                    );
                    return LiveOutcome::Rejected;
                };

                let chat_id = if message.chat_id.is_empty() {
                    chat.chat_id.clone()
                } else {
                    message.chat_id.clone()
                };
                let chat = ChatSummary {
                    chat_id: chat_id.clone(),
                    ..chat
                };

                let outcome = match transcripts.get_mut(&chat_id) {
                    Some(state) => match state.store_mut().upsert(message) {
                        UpsertOutcome::Inserted => LiveOutcome::Inserted,
                        UpsertOutcome::Rejected(_) => LiveOutcome::Rejected,
                        UpsertOutcome::Merged | UpsertOutcome::Unchanged => {
                            LiveOutcome::Duplicate
                        }
                    },
                    None => LiveOutcome::ChatListOnly,
                };

                if outcome != LiveOutcome::Rejected {
                    chat_list.record_activity(chat, Some(timestamp_ms));
                }
                outcome
            }
            PushEvent::NewChat { chat } => {
                if chat.chat_id.is_empty() {
                    tracing::warn!(
                        code = LIVE_EVENT_REJECTED,
                        sequence,
                        "dropping new chat event without chat id"
                    );
                    return LiveOutcome::Rejected;
                }
                chat_list.record_activity(chat, None);
                LiveOutcome::ChatListOnly
            }
            PushEvent::MessageOpened {
                chat_id,
                message_id,
            } => match transcripts.get_mut(&chat_id) {
                Some(state) => {
                    if state.store_mut().mark_opened(&message_id) {
                        LiveOutcome::Opened
                    } else {
                        LiveOutcome::Ignored
                    }
                }
                None => LiveOutcome::Ignored,
            },
        };

        tracing::debug!(
            sequence,
            event_kind = kind,
            outcome = ?outcome,
            "push event applied"
        );
        outcome
    }
}
