use super::chat::ChatSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatListUiState {
    Loading,
    Ready,
    Empty,
    Error,
}

/// Conversation list ordered by most recent activity, one entry per chat id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListState {
    ui_state: ChatListUiState,
    chats: Vec<ChatSummary>,
    selected_index: Option<usize>,
}

impl Default for ChatListState {
    fn default() -> Self {
        Self {
            ui_state: ChatListUiState::Loading,
            chats: Vec::new(),
            selected_index: None,
        }
    }
}

impl ChatListState {
    pub fn ui_state(&self) -> ChatListUiState {
        self.ui_state
    }

    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    pub fn chat(&self, chat_id: &str) -> Option<&ChatSummary> {
        self.chats.iter().find(|chat| chat.chat_id == chat_id)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn selected_chat(&self) -> Option<&ChatSummary> {
        self.selected_index.and_then(|index| self.chats.get(index))
    }

    /// Replaces the list with a freshly loaded one. Entries pushed before the
    /// load finished are kept; duplicates collapse onto the newest activity.
    pub fn set_ready(&mut self, chats: Vec<ChatSummary>) {
        let previous_selected_chat_id = self.selected_chat_id();
        let pushed = std::mem::take(&mut self.chats);

        for chat in chats.into_iter().chain(pushed) {
            self.merge_entry(chat);
        }

        if self.chats.is_empty() {
            self.set_empty();
            return;
        }

        self.ui_state = ChatListUiState::Ready;
        self.selected_index = resolve_selection_index(&self.chats, previous_selected_chat_id);
    }

    pub fn set_empty(&mut self) {
        self.ui_state = ChatListUiState::Empty;
        self.chats.clear();
        self.selected_index = None;
    }

    /// Marks the initial load as failed. Chats already delivered by push
    /// events stay listed.
    pub fn set_error(&mut self) {
        if self.chats.is_empty() {
            self.ui_state = ChatListUiState::Error;
            self.selected_index = None;
        }
    }

    /// Upserts `chat` by id and puts it at the front of the list.
    ///
    /// The entry's activity is raised to the current head's when it would
    /// otherwise sort behind it, so the list stays in activity order.
    pub fn record_activity(&mut self, mut chat: ChatSummary, activity_ms: Option<i64>) {
        let previous_selected_chat_id = self.selected_chat_id();

        if let Some(position) = self.position(&chat.chat_id) {
            absorb_existing(&mut chat, self.chats.remove(position));
        }
        chat.last_activity_ms = chat.last_activity_ms.max(activity_ms);

        if let Some(head) = self.chats.first() {
            if chat.activity_order(head).is_gt() {
                chat.last_activity_ms = chat.last_activity_ms.max(head.last_activity_ms);
            }
            // Equal activity but the id sorts later: step past the head.
            if chat.activity_order(head).is_gt() {
                chat.last_activity_ms =
                    Some(head.last_activity_ms.map_or(0, |ms| ms.saturating_add(1)));
            }
        }
        self.chats.insert(0, chat);

        self.ui_state = ChatListUiState::Ready;
        self.selected_index = resolve_selection_index(&self.chats, previous_selected_chat_id);
    }

    pub fn select_chat(&mut self, chat_id: &str) -> bool {
        match self.position(chat_id) {
            Some(index) => {
                self.selected_index = Some(index);
                true
            }
            None => false,
        }
    }

    fn selected_chat_id(&self) -> Option<String> {
        self.selected_chat().map(|chat| chat.chat_id.clone())
    }

    fn position(&self, chat_id: &str) -> Option<usize> {
        self.chats.iter().position(|chat| chat.chat_id == chat_id)
    }

    fn merge_entry(&mut self, mut chat: ChatSummary) {
        if let Some(position) = self.position(&chat.chat_id) {
            absorb_existing(&mut chat, self.chats.remove(position));
        }

        let index = self
            .chats
            .partition_point(|other| other.activity_order(&chat).is_lt());
        self.chats.insert(index, chat);
    }
}

/// Fills what `chat` lacks from the entry it replaces; activity never goes
/// backwards.
fn absorb_existing(chat: &mut ChatSummary, existing: ChatSummary) {
    if chat.title.is_empty() {
        chat.title = existing.title;
    }
    if chat.participant_ids.is_empty() {
        chat.participant_ids = existing.participant_ids;
    }
    chat.last_activity_ms = chat.last_activity_ms.max(existing.last_activity_ms);
}

fn resolve_selection_index(
    chats: &[ChatSummary],
    previous_selected_chat_id: Option<String>,
) -> Option<usize> {
    if chats.is_empty() {
        return None;
    }

    previous_selected_chat_id
        .and_then(|chat_id| chats.iter().position(|chat| chat.chat_id == chat_id))
        .or(Some(0))
}
