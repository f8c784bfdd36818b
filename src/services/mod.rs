pub mod chat;
pub mod conversation;
pub mod settings;
pub mod storage;

pub use chat::ChatError;
pub use conversation::ConversationService;
pub use settings::{Settings, SettingsService};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
