use async_trait::async_trait;

use crate::domain::chat::ChatSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChatsOutput {
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChatsSourceError {
    Unauthorized,
    Unavailable,
    InvalidData,
    Unknown,
}

#[async_trait]
pub trait ChatsSource: Send + Sync {
    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ListChatsSourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ListChatsError {
    #[error("not authorized to list chats")]
    Unauthorized,
    #[error("chat list is temporarily unavailable")]
    TemporarilyUnavailable,
    #[error("chat list payload violated the data contract")]
    DataContractViolation,
}

pub async fn list_chats(source: &dyn ChatsSource) -> Result<ListChatsOutput, ListChatsError> {
    let chats = source.list_chats().await.map_err(map_source_error)?;

    Ok(ListChatsOutput { chats })
}

fn map_source_error(error: ListChatsSourceError) -> ListChatsError {
    match error {
        ListChatsSourceError::Unauthorized => ListChatsError::Unauthorized,
        ListChatsSourceError::Unavailable | ListChatsSourceError::Unknown => {
            ListChatsError::TemporarilyUnavailable
        }
        ListChatsSourceError::InvalidData => ListChatsError::DataContractViolation,
    }
}
