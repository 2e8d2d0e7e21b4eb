use std::collections::HashMap;

use super::{
    pagination::{Cursor, PaginationController},
    transcript_store::TranscriptStore,
    viewport::{ViewportCoordinator, ViewportThresholds},
};

/// Read-only flags exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscriptFlags {
    pub is_at_bottom: bool,
    pub unread_count: u32,
    pub has_more: bool,
    pub loading: bool,
}

/// Everything the session tracks for one open conversation.
#[derive(Debug)]
pub struct TranscriptState {
    chat_id: String,
    epoch: u64,
    store: TranscriptStore,
    pagination: PaginationController,
    viewport: ViewportCoordinator,
}

impl TranscriptState {
    pub fn new(
        chat_id: impl Into<String>,
        epoch: u64,
        page_size: usize,
        thresholds: ViewportThresholds,
    ) -> Self {
        let chat_id = chat_id.into();
        Self {
            pagination: PaginationController::new(chat_id.clone(), epoch, page_size),
            chat_id,
            epoch,
            store: TranscriptStore::default(),
            viewport: ViewportCoordinator::new(thresholds),
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn store(&self) -> &TranscriptStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TranscriptStore {
        &mut self.store
    }

    pub fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    pub fn pagination_mut(&mut self) -> &mut PaginationController {
        &mut self.pagination
    }

    /// Split borrow for applying a page: the controller writes into the store.
    pub fn pagination_and_store_mut(&mut self) -> (&mut PaginationController, &mut TranscriptStore) {
        (&mut self.pagination, &mut self.store)
    }

    pub fn viewport(&self) -> &ViewportCoordinator {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportCoordinator {
        &mut self.viewport
    }

    pub fn cursor(&self) -> Cursor {
        self.pagination.cursor()
    }

    pub fn flags(&self) -> TranscriptFlags {
        let cursor = self.pagination.cursor();
        TranscriptFlags {
            is_at_bottom: self.viewport.is_at_bottom(),
            unread_count: self.viewport.unread_count(),
            has_more: cursor.has_more,
            loading: cursor.loading,
        }
    }
}

/// Per-conversation transcript states keyed by chat id.
///
/// Only the active conversation has an entry: activating another chat drops
/// every other state wholesale and bumps the epoch.
#[derive(Debug)]
pub struct TranscriptRegistry {
    states: HashMap<String, TranscriptState>,
    active_chat_id: Option<String>,
    epoch: u64,
    page_size: usize,
    thresholds: ViewportThresholds,
}

impl TranscriptRegistry {
    pub fn new(page_size: usize, thresholds: ViewportThresholds) -> Self {
        Self {
            states: HashMap::new(),
            active_chat_id: None,
            epoch: 0,
            page_size,
            thresholds,
        }
    }

    pub fn active_chat_id(&self) -> Option<&str> {
        self.active_chat_id.as_deref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_active(&self, chat_id: &str) -> bool {
        self.active_chat_id.as_deref() == Some(chat_id)
    }

    /// Makes `chat_id` the active conversation. Returns `None` when it already
    /// was, so callers can skip the switch side effects.
    pub fn activate(&mut self, chat_id: &str) -> Option<&mut TranscriptState> {
        if self.is_active(chat_id) {
            return None;
        }

        self.states.clear();
        self.epoch += 1;
        self.active_chat_id = Some(chat_id.to_owned());

        let state = TranscriptState::new(chat_id, self.epoch, self.page_size, self.thresholds);
        Some(self.states.entry(chat_id.to_owned()).or_insert(state))
    }

    pub fn get(&self, chat_id: &str) -> Option<&TranscriptState> {
        self.states.get(chat_id)
    }

    pub fn get_mut(&mut self, chat_id: &str) -> Option<&mut TranscriptState> {
        self.states.get_mut(chat_id)
    }

    pub fn active(&self) -> Option<&TranscriptState> {
        self.active_chat_id
            .as_deref()
            .and_then(|chat_id| self.states.get(chat_id))
    }

    pub fn active_mut(&mut self) -> Option<&mut TranscriptState> {
        let chat_id = self.active_chat_id.as_deref()?;
        self.states.get_mut(chat_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
