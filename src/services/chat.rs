use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{Conversation, Message, Role};
use crate::providers::{
    ChatMessage, CompletionClient, CompletionRequest, ProviderError, StreamEvent,
};
use crate::services::conversation::derive_title;
use crate::services::settings::Settings;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Request cancelled")]
    Cancelled,
}

/// Build a completion request from a projected history and the user's
/// settings. Every API parameter passes through verbatim, except the
/// sample count `n`: only the first choice is ever consumed, so the
/// request always leaves the server at its single-sample default.
pub fn build_request(messages: Vec<ChatMessage>, settings: &Settings) -> CompletionRequest {
    CompletionRequest {
        api_key: settings.api_key.clone().unwrap_or_default(),
        base_url: None,
        model: settings.model.clone(),
        messages,
        temperature: settings.temperature,
        top_p: settings.top_p,
        frequency_penalty: settings.frequency_penalty,
        presence_penalty: settings.presence_penalty,
        max_tokens: settings.max_tokens,
        stop: settings.stop.clone(),
        seed: settings.seed,
        response_format: settings.response_format.clone(),
        tools: settings.tools.clone(),
        tool_choice: settings.tool_choice.clone(),
        user: settings.user.clone(),
        logit_bias: settings.logit_bias.clone(),
    }
}

/// Project the full message history, in order, to the `{role, content}`
/// pairs sent as model context. A configured system message is prepended.
/// No truncation or windowing.
fn project_history(conversation: &Conversation, settings: &Settings) -> Vec<ChatMessage> {
    let mut history = Vec::with_capacity(conversation.messages.len() + 1);

    if let Some(system) = settings.system_message.as_deref() {
        if !system.is_empty() {
            history.push(ChatMessage {
                role: Role::System,
                content: system.to_string(),
            });
        }
    }

    history.extend(conversation.messages.iter().map(|m| ChatMessage {
        role: m.role,
        content: m.content.clone(),
    }));

    history
}

impl Conversation {
    /// Send the accumulated history to the completion client and resolve
    /// the response into `messages`.
    ///
    /// A `Loading` placeholder is appended before the network call and
    /// later replaced, keeping its id and date, by the assistant response
    /// (incrementally on the streaming path, once on the batch path).
    /// `on_update` fires for the placeholder insert and for every content
    /// update, so observers need no identity tricks to notice changes.
    ///
    /// Taking `&mut self` makes one in-flight `send` per conversation a
    /// compile-time guarantee rather than a caller convention.
    ///
    /// On a provider error the placeholder is left in the `loading` state
    /// and the error propagates; the caller decides whether to revert or
    /// retry it. On cancellation the placeholder is removed when nothing
    /// has arrived, or finalized with the partial content when it has, and
    /// `ChatError::Cancelled` is returned either way.
    pub async fn send<F>(
        &mut self,
        client: Arc<dyn CompletionClient>,
        settings: &Settings,
        cancel: CancellationToken,
        mut on_update: F,
    ) -> Result<(), ChatError>
    where
        F: FnMut(&Message) + Send,
    {
        let history = project_history(self, settings);

        // Derive the title from the latest turn if none is set yet.
        if self.name.is_empty() {
            if let Some(last) = self.messages.last() {
                self.name = derive_title(&last.content);
            }
        }

        let placeholder = Message::new(Role::Loading, "");
        let placeholder_id = placeholder.id.clone();
        let placeholder_date = placeholder.date;
        self.messages.push(placeholder);
        if let Some(last) = self.messages.last() {
            on_update(last);
        }

        let request = build_request(history, settings);

        if settings.streaming_enabled() {
            self.stream_response(
                client,
                request,
                cancel,
                &placeholder_id,
                placeholder_date,
                &mut on_update,
            )
            .await
        } else {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.drop_placeholder(&placeholder_id);
                    Err(ChatError::Cancelled)
                }
                result = client.create_completion(request) => {
                    let response = result?;
                    self.replace_last(
                        Message::with_identity(
                            &placeholder_id,
                            Role::Assistant,
                            response.content,
                            placeholder_date,
                        ),
                        &mut on_update,
                    );
                    Ok(())
                }
            }
        }
    }

    async fn stream_response<F>(
        &mut self,
        client: Arc<dyn CompletionClient>,
        request: CompletionRequest,
        cancel: CancellationToken,
        placeholder_id: &str,
        placeholder_date: chrono::DateTime<chrono::Utc>,
        on_update: &mut F,
    ) -> Result<(), ChatError>
    where
        F: FnMut(&Message) + Send,
    {
        let (tx, mut rx) = mpsc::channel::<StreamEvent>(64);

        tokio::spawn(async move {
            if let Err(e) = client.stream_completion(request, tx.clone()).await {
                let _ = tx.send(StreamEvent::Error(e)).await;
            }
        });

        let mut accumulated = String::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if accumulated.is_empty() {
                        self.drop_placeholder(placeholder_id);
                    } else {
                        self.replace_last(
                            Message::with_identity(
                                placeholder_id,
                                Role::Assistant,
                                std::mem::take(&mut accumulated),
                                placeholder_date,
                            ),
                            on_update,
                        );
                    }
                    return Err(ChatError::Cancelled);
                }
                event = rx.recv() => match event {
                    Some(StreamEvent::Token(delta)) => {
                        accumulated.push_str(&delta);
                        self.replace_last(
                            Message::with_identity(
                                placeholder_id,
                                Role::Assistant,
                                accumulated.clone(),
                                placeholder_date,
                            ),
                            on_update,
                        );
                    }
                    Some(StreamEvent::Done) => {
                        // Covers the zero-delta stream: the placeholder
                        // still resolves to an (empty) assistant message.
                        self.replace_last(
                            Message::with_identity(
                                placeholder_id,
                                Role::Assistant,
                                std::mem::take(&mut accumulated),
                                placeholder_date,
                            ),
                            on_update,
                        );
                        return Ok(());
                    }
                    Some(StreamEvent::Error(e)) => return Err(ChatError::Provider(e)),
                    None => {
                        if accumulated.is_empty() {
                            return Err(ChatError::Provider(ProviderError::InvalidResponse(
                                "Stream ended unexpectedly".to_string(),
                            )));
                        }
                        return Ok(());
                    }
                }
            }
        }
    }

    fn replace_last<F>(&mut self, message: Message, on_update: &mut F)
    where
        F: FnMut(&Message),
    {
        if let Some(last) = self.messages.last_mut() {
            *last = message;
        }
        if let Some(last) = self.messages.last() {
            on_update(last);
        }
    }

    fn drop_placeholder(&mut self, placeholder_id: &str) {
        if self
            .messages
            .last()
            .is_some_and(|m| m.id == placeholder_id)
        {
            self.messages.pop();
        }
    }
}
