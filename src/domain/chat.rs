use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatSummary {
    pub chat_id: String,
    /// Display name of the conversation.
    pub title: String,
    pub participant_ids: Vec<String>,
    /// Timestamp of the most recent message seen for this chat.
    pub last_activity_ms: Option<i64>,
}

impl ChatSummary {
    /// Returns the first participant that is not `local_user_id`.
    pub fn counterpart_of(&self, local_user_id: &str) -> Option<&str> {
        self.participant_ids
            .iter()
            .map(String::as_str)
            .find(|id| *id != local_user_id)
    }

    /// Chat list order: most recent activity first, chats without activity
    /// last, chat id as tie breaker.
    pub fn activity_order(&self, other: &Self) -> Ordering {
        other
            .last_activity_ms
            .cmp(&self.last_activity_ms)
            .then_with(|| self.chat_id.cmp(&other.chat_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(chat_id: &str, last_activity_ms: Option<i64>) -> ChatSummary {
        ChatSummary {
            chat_id: chat_id.to_owned(),
            title: chat_id.to_uppercase(),
            participant_ids: vec!["me".to_owned(), "you".to_owned()],
            last_activity_ms,
        }
    }

    #[test]
    fn counterpart_skips_local_user() {
        assert_eq!(chat("c1", None).counterpart_of("me"), Some("you"));
        assert_eq!(chat("c1", None).counterpart_of("you"), Some("me"));
    }

    #[test]
    fn counterpart_is_none_for_self_only_chat() {
        let mut solo = chat("c1", None);
        solo.participant_ids = vec!["me".to_owned()];

        assert_eq!(solo.counterpart_of("me"), None);
    }

    #[test]
    fn activity_order_puts_newest_first_and_idle_chats_last() {
        let newer = chat("b", Some(20));
        let older = chat("a", Some(10));
        let idle = chat("0", None);

        assert_eq!(newer.activity_order(&older), Ordering::Less);
        assert_eq!(older.activity_order(&idle), Ordering::Less);
    }

    #[test]
    fn activity_order_breaks_ties_by_chat_id() {
        assert_eq!(
            chat("a", Some(10)).activity_order(&chat("b", Some(10))),
            Ordering::Less
        );
    }
}
