use super::storage::{KeyValueStore, StorageError, CONVERSATIONS_KEY};
use crate::models::Conversations;

/// The derived display title for a conversation: the first 30 characters
/// of the seed text, trimmed, with newlines and tabs stripped.
pub fn derive_title(text: &str) -> String {
    let head: String = text.chars().take(30).collect();
    head.trim()
        .chars()
        .filter(|c| *c != '\n' && *c != '\t')
        .collect()
}

pub struct ConversationService;

impl ConversationService {
    /// Restore the conversation collection from the store. An absent
    /// record yields an empty collection; a present but malformed record
    /// is a fatal error with no partial recovery.
    pub fn load(store: &dyn KeyValueStore) -> Result<Conversations, StorageError> {
        match store.get(CONVERSATIONS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Conversations::new()),
        }
    }

    /// Serialize and overwrite the stored record. Full overwrite, no merge.
    pub fn save(
        store: &mut dyn KeyValueStore,
        conversations: &Conversations,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(conversations)?;
        store.set(CONVERSATIONS_KEY, &json)
    }

    pub fn clear(store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        store.remove(CONVERSATIONS_KEY)
    }
}
