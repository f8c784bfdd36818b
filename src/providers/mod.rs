pub mod openai;
pub mod traits;
pub mod types;

pub use openai::OpenAiClient;
pub use traits::CompletionClient;
pub use types::{
    ChatMessage, CompletionRequest, CompletionResponse, ProviderError, StopSequences, StreamEvent,
};
