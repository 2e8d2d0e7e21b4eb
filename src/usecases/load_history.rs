use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{message::IncomingMessage, pagination::HistoryTicket};

pub const DEFAULT_HISTORY_PAGE_SIZE: usize = 20;
const MAX_HISTORY_PAGE_SIZE: usize = 200;

/// Clamps a configured page size into the range the history endpoint accepts.
pub fn normalize_page_size(page_size: usize) -> usize {
    match page_size {
        0 => DEFAULT_HISTORY_PAGE_SIZE,
        value if value > MAX_HISTORY_PAGE_SIZE => MAX_HISTORY_PAGE_SIZE,
        value => value,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadHistoryQuery {
    pub chat_id: String,
    /// 1-based, newest page first.
    pub page: u32,
    pub limit: usize,
}

impl From<&HistoryTicket> for LoadHistoryQuery {
    fn from(ticket: &HistoryTicket) -> Self {
        Self {
            chat_id: ticket.chat_id.clone(),
            page: ticket.page,
            limit: ticket.page_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HistorySourceError {
    #[error("history source rejected the credentials")]
    Unauthorized,
    #[error("history source is unavailable")]
    Unavailable,
    #[error("history source returned malformed data")]
    InvalidData,
    #[error("chat was not found")]
    ChatNotFound,
}

#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_history(
        &self,
        chat_id: &str,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<IncomingMessage>, HistorySourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoadHistoryError {
    #[error("not authorized to read history")]
    Unauthorized,
    #[error("history is temporarily unavailable")]
    TemporarilyUnavailable,
    #[error("history payload violated the data contract")]
    DataContractViolation,
    #[error("chat was not found")]
    ChatNotFound,
    #[error("history fetch timed out")]
    TimedOut,
}

impl LoadHistoryError {
    pub fn code(self) -> &'static str {
        match self {
            Self::Unauthorized => "HISTORY_UNAUTHORIZED",
            Self::TemporarilyUnavailable => "HISTORY_UNAVAILABLE",
            Self::DataContractViolation => "HISTORY_INVALID_DATA",
            Self::ChatNotFound => "HISTORY_CHAT_NOT_FOUND",
            Self::TimedOut => "HISTORY_TIMEOUT",
        }
    }
}

/// Fetches one history page, giving up after `timeout`.
pub async fn load_history(
    source: &dyn HistorySource,
    query: LoadHistoryQuery,
    timeout: Duration,
) -> Result<Vec<IncomingMessage>, LoadHistoryError> {
    let limit = normalize_page_size(query.limit);
    let fetch = source.fetch_history(&query.chat_id, query.page, limit);

    match tokio::time::timeout(timeout, fetch).await {
        Ok(result) => result.map_err(map_source_error),
        Err(_) => Err(LoadHistoryError::TimedOut),
    }
}

fn map_source_error(error: HistorySourceError) -> LoadHistoryError {
    match error {
        HistorySourceError::Unauthorized => LoadHistoryError::Unauthorized,
        HistorySourceError::Unavailable => LoadHistoryError::TemporarilyUnavailable,
        HistorySourceError::InvalidData => LoadHistoryError::DataContractViolation,
        HistorySourceError::ChatNotFound => LoadHistoryError::ChatNotFound,
    }
}
