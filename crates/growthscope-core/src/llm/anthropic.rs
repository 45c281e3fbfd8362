//! Anthropic Messages API completion backend

use crate::config::CompletionServiceConfig;
use crate::error::Result;
use crate::llm::backend::{
    synthetic_chunks, synthetic_result, CompletionBackend, CompletionStream,
};
use crate::llm::types::{ChatMessage, CompletionOptions, CompletionResult, FinishReason, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Backend for the Anthropic Messages API
pub struct AnthropicBackend {
    http_client: reqwest::Client,
    config: CompletionServiceConfig,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
    stream: bool,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: StreamDelta },
    MessageStop,
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamDelta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

/// Split system messages into the dedicated `system` field, as the
/// Messages API does not accept a system role in the message list.
fn convert_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<WireMessage<'_>>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let wire = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| WireMessage {
            role: match m.role {
                Role::Assistant => "assistant",
                _ => "user",
            },
            content: &m.content,
        })
        .collect();

    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, wire)
}

impl AnthropicBackend {
    /// Create new backend from configuration
    pub fn new(config: CompletionServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(CompletionServiceConfig::default())
    }

    async fn request_completion(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<CompletionResult> {
        let (system, wire_messages) = convert_messages(messages);
        let request = MessagesRequest {
            model: &self.config.model,
            messages: wire_messages,
            system,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stop_sequences: options.stop_sequences.as_deref(),
            stream: false,
        };

        let url = format!("{}/v1/messages", self.config.url);
        let mut req = self
            .http_client
            .post(&url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(crate::error::GrowthScopeError::ExternalError(format!(
                "completion service error (HTTP {}): {}",
                status, body
            )));
        }

        let messages_response: MessagesResponse = response.json().await?;
        let content: String = messages_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect();

        Ok(CompletionResult {
            content,
            tokens_used: messages_response.usage.input_tokens
                + messages_response.usage.output_tokens,
            finish_reason: messages_response
                .stop_reason
                .as_deref()
                .map(FinishReason::from_tag)
                .unwrap_or(FinishReason::Stop),
            model: self.config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<CompletionResult> {
        if !self.config.has_credential() {
            tracing::debug!("no completion credential configured, returning synthetic result");
            return Ok(synthetic_result(&self.config.model, messages));
        }

        match self.request_completion(messages, options).await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::warn!("completion call failed, returning synthetic result: {}", e);
                Ok(synthetic_result(&self.config.model, messages))
            }
        }
    }

    fn stream_complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> CompletionStream {
        let messages = messages.to_vec();
        let options = options.clone();
        let config = self.config.clone();
        let client = self.http_client.clone();

        Box::pin(async_stream::stream! {
            if !config.has_credential() {
                tracing::debug!("no completion credential configured, streaming synthetic result");
                for chunk in synthetic_chunks(&config.model, &messages) {
                    yield Ok(chunk);
                }
                return;
            }

            let (system, wire_messages) = convert_messages(&messages);
            let request = MessagesRequest {
                model: &config.model,
                messages: wire_messages,
                system,
                max_tokens: options.max_tokens,
                temperature: options.temperature,
                stop_sequences: options.stop_sequences.as_deref(),
                stream: true,
            };

            let url = format!("{}/v1/messages", config.url);
            let mut req = client
                .post(&url)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&request);
            if let Some(ref api_key) = config.api_key {
                req = req.header("x-api-key", api_key);
            }

            let response = match req.send().await {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    tracing::warn!(
                        "completion stream rejected (HTTP {}), streaming synthetic result",
                        r.status()
                    );
                    for chunk in synthetic_chunks(&config.model, &messages) {
                        yield Ok(chunk);
                    }
                    return;
                }
                Err(e) => {
                    tracing::warn!("completion stream failed, streaming synthetic result: {}", e);
                    for chunk in synthetic_chunks(&config.model, &messages) {
                        yield Ok(chunk);
                    }
                    return;
                }
            };

            let mut bytes_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = futures::StreamExt::next(&mut bytes_stream).await {
                let bytes = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(crate::error::GrowthScopeError::from(e));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // SSE frames arrive as "event: <type>" / "data: {...}" line pairs;
                // the data lines carry everything needed.
                while let Some(newline_pos) = buffer.find('\n') {
                    let line = buffer[..newline_pos].trim().to_string();
                    buffer.drain(..=newline_pos);

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };

                    match serde_json::from_str::<StreamEvent>(data) {
                        Ok(StreamEvent::ContentBlockDelta {
                            delta: StreamDelta::TextDelta { text },
                        }) => {
                            if !text.is_empty() {
                                yield Ok(text);
                            }
                        }
                        Ok(StreamEvent::MessageStop) => return,
                        Ok(_) => {}
                        Err(e) => {
                            tracing::debug!("skipping unparseable stream frame: {}", e);
                        }
                    }
                }
            }
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
