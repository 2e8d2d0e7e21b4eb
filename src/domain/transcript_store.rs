//! Ordered, deduplicated message collection for one conversation.
//!
//! Messages are kept in an id-keyed map; the ordered view is derived on demand
//! and memoized against a revision counter that is bumped on every change.

use std::{cell::RefCell, collections::HashMap, sync::Arc};

use super::message::{IncomingMessage, Message, MessageValidationError};

const STORE_MESSAGE_REJECTED: &str = "SYNC_STORE_MESSAGE_REJECTED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// The id was already present and a mutable field was merged.
    Merged,
    Unchanged,
    Rejected(MessageValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkUpsertSummary {
    pub inserted: usize,
    pub merged: usize,
    pub unchanged: usize,
    pub rejected: usize,
}

impl BulkUpsertSummary {
    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Merged => self.merged += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
            UpsertOutcome::Rejected(_) => self.rejected += 1,
        }
    }
}

#[derive(Debug)]
struct CachedSnapshot {
    revision: u64,
    messages: Arc<[Message]>,
}

#[derive(Debug, Default)]
pub struct TranscriptStore {
    messages: HashMap<String, Message>,
    revision: u64,
    cache: RefCell<Option<CachedSnapshot>>,
}

impl TranscriptStore {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, message_id: &str) -> Option<&Message> {
        self.messages.get(message_id)
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.messages.contains_key(message_id)
    }

    /// Inserts the message when its id is new. An existing entry stays
    /// authoritative; only `opened` is merged, and only towards `true`.
    pub fn upsert(&mut self, incoming: IncomingMessage) -> UpsertOutcome {
        let message = match incoming.validate() {
            Ok(message) => message,
            Err(reason) => {
                tracing::warn!(
                    code = STORE_MESSAGE_REJECTED,
                    reason = reason.code(),
                    "dropping message that failed validation"
                );
                return UpsertOutcome::Rejected(reason);
            }
        };

        if let Some(existing) = self.messages.get_mut(&message.id) {
            if message.opened && !existing.opened {
                existing.opened = true;
                self.revision += 1;
                return UpsertOutcome::Merged;
            }
            return UpsertOutcome::Unchanged;
        }

        self.messages.insert(message.id.clone(), message);
        self.revision += 1;
        UpsertOutcome::Inserted
    }

    pub fn bulk_upsert<I>(&mut self, batch: I) -> BulkUpsertSummary
    where
        I: IntoIterator<Item = IncomingMessage>,
    {
        let mut summary = BulkUpsertSummary::default();
        for incoming in batch {
            summary.record(self.upsert(incoming));
        }
        summary
    }

    /// Marks a stored message as opened. Returns `true` when something changed.
    pub fn mark_opened(&mut self, message_id: &str) -> bool {
        match self.messages.get_mut(message_id) {
            Some(message) if !message.opened => {
                message.opened = true;
                self.revision += 1;
                true
            }
            _ => false,
        }
    }

    /// All messages in transcript order. Recomputed only when the store has
    /// changed since the previous call.
    pub fn snapshot(&self) -> Arc<[Message]> {
        let mut cache = self.cache.borrow_mut();
        if let Some(cached) = cache.as_ref() {
            if cached.revision == self.revision {
                return Arc::clone(&cached.messages);
            }
        }

        let mut ordered: Vec<Message> = self.messages.values().cloned().collect();
        ordered.sort_by(Message::transcript_order);
        let messages: Arc<[Message]> = ordered.into();

        *cache = Some(CachedSnapshot {
            revision: self.revision,
            messages: Arc::clone(&messages),
        });
        messages
    }
}
