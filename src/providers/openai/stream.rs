use futures::StreamExt;
use tokio::sync::mpsc;

use super::models::OpenAiStreamChunk;
use crate::providers::types::{ProviderError, StreamEvent};

/// Drain an SSE response body, forwarding each text delta as a
/// `StreamEvent::Token` and terminating with `Done` on the `[DONE]`
/// sentinel (or on end of body, for servers that omit it).
pub async fn parse_sse_stream(response: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
    let mut stream = response.bytes_stream();
    let mut byte_buf: Vec<u8> = Vec::new();
    let mut buffer = String::new();

    while let Some(chunk_result) = stream.next().await {
        let bytes = match chunk_result {
            Ok(b) => b,
            Err(e) => {
                let _ = tx
                    .send(StreamEvent::Error(ProviderError::Network(format!(
                        "Stream error: {}",
                        e
                    ))))
                    .await;
                return;
            }
        };

        byte_buf.extend_from_slice(&bytes);

        // Decode as much valid UTF-8 as possible; a multi-byte character
        // split across network chunks stays buffered until complete.
        let decoded = match std::str::from_utf8(&byte_buf) {
            Ok(s) => {
                let decoded = s.to_string();
                byte_buf.clear();
                decoded
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                if valid_up_to == 0 {
                    continue;
                }
                let decoded = String::from_utf8_lossy(&byte_buf[..valid_up_to]).into_owned();
                byte_buf.drain(..valid_up_to);
                decoded
            }
        };

        // Normalize CRLF to LF
        let chunk = decoded.replace("\r\n", "\n");
        buffer.push_str(&chunk);

        // Process complete SSE events (delimited by double newline)
        while let Some(event_end) = buffer.find("\n\n") {
            let event_text = buffer[..event_end].to_string();
            buffer.drain(..event_end + 2);

            for line in event_text.lines() {
                let payload = if let Some(p) = line.strip_prefix("data: ") {
                    p
                } else if let Some(p) = line.strip_prefix("data:") {
                    p
                } else {
                    continue;
                };

                // OpenAI signals end of stream with [DONE]
                if payload.trim() == "[DONE]" {
                    let _ = tx.send(StreamEvent::Done).await;
                    return;
                }

                match serde_json::from_str::<OpenAiStreamChunk>(payload) {
                    Ok(chunk) => {
                        if let Some(content) =
                            chunk.choices.first().and_then(|c| c.delta.content.as_ref())
                        {
                            if !content.is_empty()
                                && tx.send(StreamEvent::Token(content.clone())).await.is_err()
                            {
                                return; // receiver dropped
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse SSE data payload: {}", e);
                    }
                }
            }
        }
    }

    // Stream ended without a [DONE] signal; report completion anyway.
    let _ = tx.send(StreamEvent::Done).await;
}
