use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;

use super::models::{OpenAiErrorResponse, OpenAiMessage, OpenAiRequest, OpenAiResponse};
use super::stream::parse_sse_stream;
use crate::providers::traits::CompletionClient;
use crate::providers::types::{
    CompletionRequest, CompletionResponse, ProviderError, StreamEvent,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Adapter for OpenAI-compatible `/v1/chat/completions` endpoints.
pub struct OpenAiClient {
    client: Client,
}

impl OpenAiClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    fn endpoint(request: &CompletionRequest) -> String {
        let base = request.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/v1/chat/completions", base.trim_end_matches('/'))
    }

    fn build_wire_request(request: &CompletionRequest, stream: bool) -> OpenAiRequest {
        let messages = request
            .messages
            .iter()
            .map(|m| OpenAiMessage {
                role: m.role.as_str().to_string(),
                content: Some(m.content.clone()),
            })
            .collect();

        OpenAiRequest {
            model: request.model.clone(),
            messages,
            stream,
            temperature: request.temperature,
            top_p: request.top_p,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
            max_tokens: request.max_tokens,
            stop: request.stop.clone(),
            seed: request.seed,
            response_format: request.response_format.clone(),
            tools: request.tools.clone(),
            tool_choice: request.tool_choice.clone(),
            user: request.user.clone(),
            logit_bias: request.logit_bias.clone(),
        }
    }

    fn build_auth_header(api_key: &str) -> Option<String> {
        if api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", api_key))
        }
    }

    fn parse_error_message(status: reqwest::StatusCode, body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            return format!("HTTP {}: {}", status.as_u16(), parsed.error.message);
        }
        format!("HTTP {}: Request failed", status.as_u16())
    }

    /// Issue the POST and map error statuses before the body is consumed.
    async fn post_completion(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = Self::endpoint(request);
        let wire_request = Self::build_wire_request(request, stream);

        tracing::debug!(model = %request.model, stream, "dispatching completion request");

        let mut req = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&wire_request);

        if let Some(auth) = Self::build_auth_header(&request.api_key) {
            req = req.header("Authorization", auth);
        }

        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProviderError::Auth("Invalid API key".to_string()));
        }

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(Self::parse_error_message(
                status, &body,
            )));
        }

        Ok(response)
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn create_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let response = self.post_completion(&request, false).await?;

        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = openai_response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("No content in response".to_string())
            })?;

        let model = openai_response.model.unwrap_or(request.model);

        Ok(CompletionResponse { content, model })
    }

    async fn stream_completion(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError> {
        let response = self.post_completion(&request, true).await?;
        parse_sse_stream(response, tx).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::providers::types::ChatMessage;

    fn request_with(messages: Vec<ChatMessage>) -> CompletionRequest {
        CompletionRequest {
            api_key: String::new(),
            base_url: None,
            model: "gpt-3.5-turbo".to_string(),
            messages,
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            max_tokens: None,
            stop: None,
            seed: None,
            response_format: None,
            tools: None,
            tool_choice: None,
            user: None,
            logit_bias: None,
        }
    }

    #[test]
    fn endpoint_defaults_and_trims_trailing_slash() {
        let mut request = request_with(Vec::new());
        assert_eq!(
            OpenAiClient::endpoint(&request),
            "https://api.openai.com/v1/chat/completions"
        );

        request.base_url = Some("http://localhost:8080/".to_string());
        assert_eq!(
            OpenAiClient::endpoint(&request),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn unset_parameters_are_omitted_on_the_wire() {
        let request = request_with(vec![ChatMessage {
            role: Role::User,
            content: "hi".to_string(),
        }]);
        let wire = OpenAiClient::build_wire_request(&request, false);
        let value = serde_json::to_value(&wire).unwrap();

        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["stream"], false);
        assert!(value.get("temperature").is_none());
        assert!(value.get("logit_bias").is_none());
    }

    #[test]
    fn empty_api_key_sends_no_auth_header() {
        assert!(OpenAiClient::build_auth_header("").is_none());
        assert_eq!(
            OpenAiClient::build_auth_header("sk-x").as_deref(),
            Some("Bearer sk-x")
        );
    }

    #[test]
    fn error_body_message_is_extracted() {
        let body = r#"{"error":{"message":"model not found"}}"#;
        let rendered =
            OpenAiClient::parse_error_message(reqwest::StatusCode::NOT_FOUND, body);
        assert_eq!(rendered, "HTTP 404: model not found");
    }
}
