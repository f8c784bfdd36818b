use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{CompletionRequest, CompletionResponse, ProviderError, StreamEvent};

/// A remote chat-completion endpoint. Implementations turn an ordered
/// message history into generated text, either as one response body or as
/// an incremental stream of deltas pushed through the given channel.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Single blocking request; resolves with the first choice's content.
    async fn create_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Streaming request. Text deltas arrive as `StreamEvent::Token`,
    /// terminated by `StreamEvent::Done`. Errors detected after the stream
    /// opened are reported as `StreamEvent::Error`; errors before any byte
    /// arrives are returned directly.
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError>;
}
