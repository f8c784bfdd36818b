use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Role;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// One `{role, content}` pair of the history sent as model context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Stop sequences accept either a single string or a list, matching the
/// completion API's own schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    One(String),
    Many(Vec<String>),
}

/// Everything a completion call needs: credentials, the full message
/// history in order, and the request parameters passed through from
/// user settings. Fields left `None` are omitted on the wire.
#[derive(Clone)]
pub struct CompletionRequest {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub max_tokens: Option<u32>,
    pub stop: Option<StopSequences>,
    pub seed: Option<i64>,
    pub response_format: Option<serde_json::Value>,
    pub tools: Option<Vec<serde_json::Value>>,
    pub tool_choice: Option<serde_json::Value>,
    pub user: Option<String>,
    pub logit_bias: Option<HashMap<String, serde_json::Value>>,
}

impl std::fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("messages", &format!("[{} messages]", self.messages.len()))
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("stop", &self.stop)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

/// A finished non-streaming completion. Only the first choice of the
/// upstream response is surfaced.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
}

/// Incremental output of a streaming completion call.
#[derive(Debug)]
pub enum StreamEvent {
    /// One text delta to append to the response so far.
    Token(String),
    /// Upstream signalled the end of the stream.
    Done,
    /// The stream broke; no further events follow.
    Error(ProviderError),
}
