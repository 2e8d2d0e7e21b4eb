//! Chat transcript synchronization engine.
//!
//! Reconciles paginated history with a live push stream for the open
//! conversation, keeps the chat list ordered by activity and tells the
//! presentation layer how to move its viewport.

pub mod domain;
pub mod infra;
#[cfg(test)]
mod test_support;
pub mod transport;
pub mod ui;
pub mod usecases;
