use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a chat turn. `Loading` is the transient role of a
/// placeholder message standing in for an assistant response that has
/// not resolved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Loading,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Loading => "loading",
        }
    }
}

/// A single chat turn. `id` and `date` are set at construction and never
/// change afterwards; streaming updates replace the whole message while
/// carrying both forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub date: DateTime<Utc>,
}

impl Message {
    /// New message with a generated id and the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            date: Utc::now(),
        }
    }

    /// Rebuild a message with explicit identity, used when a streamed or
    /// finalized response must keep the placeholder's id and date.
    pub fn with_identity(
        id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            date,
        }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new(Role::User, "")
    }
}
