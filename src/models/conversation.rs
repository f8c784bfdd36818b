use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

/// An ordered chat history with a derived display title. Message order is
/// conversation chronology and survives serialization exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub name: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: String::new(),
            messages: Vec::new(),
        }
    }

    /// Drop messages from the tail back through the one matching
    /// `message_id` (inclusive) and return that message's content for
    /// re-editing. When no message matches, the entire list is drained and
    /// an empty string is returned; callers relying on the persisted-data
    /// compatibility of that behavior get it unchanged.
    pub fn revert_to_message(&mut self, message_id: &str) -> String {
        while let Some(message) = self.messages.pop() {
            if message.id == message_id {
                return message.content;
            }
        }
        String::new()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// The full set of conversations known to the client, unique by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversations {
    pub conversations: Vec<Conversation>,
}

impl Conversations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Linear lookup by id.
    pub fn load_conversation(&self, conversation_id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == conversation_id)
    }

    pub fn load_conversation_mut(&mut self, conversation_id: &str) -> Option<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
    }

    /// A fresh empty conversation. The caller decides whether and where to
    /// insert it into the collection.
    pub fn create_conversation(&self) -> Conversation {
        Conversation::new()
    }

    /// Remove the conversation with the given id; no-op when absent.
    pub fn delete_conversation(&mut self, conversation_id: &str) {
        if let Some(index) = self
            .conversations
            .iter()
            .position(|c| c.id == conversation_id)
        {
            self.conversations.remove(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn sample_conversation() -> Conversation {
        let mut conv = Conversation::new();
        conv.name = "greetings".to_string();
        conv.messages.push(Message::new(Role::User, "hi"));
        conv.messages.push(Message::new(Role::Assistant, "hello"));
        conv.messages.push(Message::new(Role::User, "bye"));
        conv
    }

    #[test]
    fn serde_round_trip_preserves_order_and_name() {
        let conv = sample_conversation();
        let json = serde_json::to_string(&conv).unwrap();
        let back: Conversation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, conv);
        let contents: Vec<&str> = back.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "hello", "bye"]);
    }

    #[test]
    fn revert_removes_tail_through_match_and_returns_content() {
        let mut conv = sample_conversation();
        let target_id = conv.messages[1].id.clone();

        let content = conv.revert_to_message(&target_id);

        assert_eq!(content, "hello");
        assert_eq!(conv.messages.len(), 1);
        assert_eq!(conv.messages[0].content, "hi");
    }

    #[test]
    fn revert_on_missing_id_drains_everything() {
        let mut conv = sample_conversation();
        let content = conv.revert_to_message("no-such-id");
        assert_eq!(content, "");
        assert!(conv.messages.is_empty());
    }

    #[test]
    fn delete_conversation_is_idempotent() {
        let mut all = Conversations::new();
        let conv = sample_conversation();
        let id = conv.id.clone();
        all.conversations.push(conv);
        all.conversations.push(Conversation::new());

        all.delete_conversation(&id);
        let after_first = all.clone();
        all.delete_conversation(&id);

        assert_eq!(all, after_first);
        assert_eq!(all.conversations.len(), 1);
    }

    #[test]
    fn load_conversation_finds_by_id() {
        let mut all = Conversations::new();
        let conv = sample_conversation();
        let id = conv.id.clone();
        all.conversations.push(conv);

        assert!(all.load_conversation(&id).is_some());
        assert!(all.load_conversation("absent").is_none());
    }

    #[test]
    fn create_conversation_is_empty_and_unowned() {
        let all = Conversations::new();
        let conv = all.create_conversation();
        assert!(conv.name.is_empty());
        assert!(conv.messages.is_empty());
        assert!(all.conversations.is_empty());
    }
}
