use super::{
    message::IncomingMessage,
    transcript_store::{BulkUpsertSummary, TranscriptStore},
};

const PAGINATION_STALE_RESPONSE: &str = "SYNC_PAGINATION_STALE_RESPONSE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    Idle,
    Loading,
    /// Terminal until the conversation is reset.
    Exhausted,
}

/// Read-only view of the pagination position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Number of pages applied so far.
    pub page: u32,
    pub page_size: usize,
    pub has_more: bool,
    pub loading: bool,
}

/// Identifies one outbound history request.
///
/// `page` is 1-based, `epoch` is the activation counter of the conversation
/// the request was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryTicket {
    pub chat_id: String,
    pub page: u32,
    pub page_size: usize,
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    pub ticket: HistoryTicket,
    pub messages: Vec<IncomingMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Applied {
        summary: BulkUpsertSummary,
        /// Page number that was applied (1 for the newest page).
        page: u32,
        has_more: bool,
    },
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationController {
    chat_id: String,
    epoch: u64,
    page_size: usize,
    pages_loaded: u32,
    has_more: bool,
    state: PaginationState,
    in_flight: Option<HistoryTicket>,
}

impl PaginationController {
    pub fn new(chat_id: impl Into<String>, epoch: u64, page_size: usize) -> Self {
        Self {
            chat_id: chat_id.into(),
            epoch,
            page_size: page_size.max(1),
            pages_loaded: 0,
            has_more: true,
            state: PaginationState::Idle,
            in_flight: None,
        }
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.state == PaginationState::Loading
    }

    pub fn can_load(&self) -> bool {
        self.state == PaginationState::Idle && self.has_more
    }

    pub fn cursor(&self) -> Cursor {
        Cursor {
            page: self.pages_loaded,
            page_size: self.page_size,
            has_more: self.has_more,
            loading: self.is_loading(),
        }
    }

    /// Starts the next backward fetch. Returns `None` while a fetch is in
    /// flight or once history is exhausted.
    pub fn load_next_page(&mut self) -> Option<HistoryTicket> {
        if !self.can_load() {
            return None;
        }

        let ticket = HistoryTicket {
            chat_id: self.chat_id.clone(),
            page: self.pages_loaded + 1,
            page_size: self.page_size,
            epoch: self.epoch,
        };
        self.state = PaginationState::Loading;
        self.in_flight = Some(ticket.clone());
        Some(ticket)
    }

    /// Applies a fetched page. Responses that do not match the in-flight
    /// ticket are dropped without touching the store.
    pub fn complete(&mut self, page: HistoryPage, store: &mut TranscriptStore) -> PageOutcome {
        if !self.is_in_flight(&page.ticket) {
            tracing::debug!(
                code = PAGINATION_STALE_RESPONSE,
                chat_id = %page.ticket.chat_id,
                page = page.ticket.page,
                epoch = page.ticket.epoch,
                "discarding history page that no longer matches the cursor"
            );
            return PageOutcome::Stale;
        }

        let returned = page.messages.len();
        let summary = store.bulk_upsert(page.messages);

        self.in_flight = None;
        self.pages_loaded = page.ticket.page;
        // A short page is taken as the end of history.
        self.has_more = returned >= self.page_size;
        self.state = if self.has_more {
            PaginationState::Idle
        } else {
            PaginationState::Exhausted
        };

        PageOutcome::Applied {
            summary,
            page: page.ticket.page,
            has_more: self.has_more,
        }
    }

    /// Reverts a failed fetch to `Idle`, leaving `has_more` untouched.
    /// Returns `false` when the ticket is not the one in flight.
    pub fn fail(&mut self, ticket: &HistoryTicket) -> bool {
        if !self.is_in_flight(ticket) {
            return false;
        }

        self.in_flight = None;
        self.state = PaginationState::Idle;
        true
    }

    fn is_in_flight(&self, ticket: &HistoryTicket) -> bool {
        self.state == PaginationState::Loading && self.in_flight.as_ref() == Some(ticket)
    }
}
