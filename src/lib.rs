//! Headless core of a chat client: the conversation/message data model,
//! its synchronization with an OpenAI-compatible chat-completion endpoint
//! (streamed or batched), and persistence of conversations and settings
//! through an injected key-value store.

pub mod models;
pub mod providers;
pub mod services;

pub use models::{Conversation, Conversations, Message, Role};
pub use providers::{CompletionClient, OpenAiClient, ProviderError};
pub use services::{
    ChatError, ConversationService, FileStore, KeyValueStore, MemoryStore, Settings,
    SettingsService, StorageError,
};
