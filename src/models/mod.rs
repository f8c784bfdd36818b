pub mod conversation;
pub mod message;

pub use conversation::{Conversation, Conversations};
pub use message::{Message, Role};
