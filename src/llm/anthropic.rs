//! Anthropic Messages API client.
//!
//! Implements [`GenerationProvider`] over the `/v1/messages` endpoint, with
//! SSE parsing for the streaming path (`content_block_delta` events carry the
//! text fragments).

use super::client::GenerationProvider;
use crate::types::{AppError, ChatTurn, Result};
use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: String, api_base: String, model: String, max_tokens: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            api_base,
            model,
            max_tokens,
        }
    }

    fn build_messages(history: &[ChatTurn], question: &str) -> Vec<WireMessage> {
        let mut messages: Vec<WireMessage> = history
            .iter()
            .map(|(role, content)| WireMessage {
                role: role.as_str(),
                content: content.clone(),
            })
            .collect();
        messages.push(WireMessage {
            role: "user",
            content: question.to_string(),
        });
        messages
    }

    async fn send(&self, system: &str, history: &[ChatTurn], question: &str, streaming: bool) -> Result<reqwest::Response> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: Self::build_messages(history, question),
            stream: streaming,
        };

        self.http
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Generation request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Provider(format!("Generation provider error: {}", e)))
    }
}

/// Extract text fragments from one SSE event block.
fn parse_sse_event(block: &str) -> Option<String> {
    for line in block.lines() {
        let Some(data) = line.strip_prefix("data: ") else {
            continue;
        };
        let Ok(event) = serde_json::from_str::<StreamEvent>(data) else {
            continue;
        };
        if event.event_type == "content_block_delta" {
            if let Some(text) = event.delta.and_then(|d| d.text) {
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

#[async_trait]
impl GenerationProvider for AnthropicClient {
    async fn generate(
        &self,
        system: &str,
        history: &[ChatTurn],
        question: &str,
    ) -> Result<String> {
        let response = self.send(system, history, question, false).await?;
        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Invalid generation response: {}", e)))?;

        body.content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| AppError::Provider("Generation provider returned no content".to_string()))
    }

    async fn stream(
        &self,
        system: &str,
        history: &[ChatTurn],
        question: &str,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let response = self.send(system, history, question, true).await?;
        let mut bytes = response.bytes_stream();

        let output = stream! {
            let mut buffer = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(AppError::Provider(format!("Stream read failed: {}", e)));
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // SSE events are separated by a blank line.
                while let Some(boundary) = buffer.find("\n\n") {
                    let block = buffer[..boundary].to_string();
                    buffer.drain(..boundary + 2);
                    if let Some(text) = parse_sse_event(&block) {
                        yield Ok(text);
                    }
                }
            }
        };

        Ok(output.boxed())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
