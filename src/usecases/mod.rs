//! Use case layer: application workflows and orchestration.

pub mod bootstrap;
pub mod context;
pub mod list_chats;
pub mod live_updates;
pub mod load_history;
pub mod send_message;
pub mod session;
pub mod sync_engine;
