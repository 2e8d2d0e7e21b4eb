//! Domain layer: core entities and synchronization rules.

pub mod chat;
pub mod chat_list_state;
pub mod events;
pub mod message;
pub mod pagination;
pub mod transcript_state;
pub mod transcript_store;
pub mod viewport;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
