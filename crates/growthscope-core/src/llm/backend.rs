//! Completion backend abstraction
//!
//! A completion backend turns an ordered conversation into generated text,
//! either as one result or as an incremental stream of chunks. Variants are
//! selected through [`create_backend`]; an unknown kind is a configuration
//! error, never a silent default.

use crate::config::CompletionServiceConfig;
use crate::error::{GrowthScopeError, Result};
use crate::llm::types::{ChatMessage, CompletionOptions, CompletionResult, FinishReason, Role};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::str::FromStr;
use std::sync::Arc;

/// Finite, pull-based sequence of completion text chunks
pub type CompletionStream = BoxStream<'static, Result<String>>;

/// Trait for completion service backends
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generate a single completion for an ordered conversation
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<CompletionResult>;

    /// Generate a completion as a stream of text chunks
    ///
    /// Each item corresponds to one inbound frame; nothing is read from the
    /// connection until the consumer polls. Dropping the stream releases the
    /// underlying connection.
    fn stream_complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> CompletionStream;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Marker prefixed to every synthetic completion
///
/// When no credential is configured, or the service call fails, backends
/// return a deterministic stand-in instead of an error. The prefix lets
/// callers and log scrapers recognize the stand-in.
pub const SYNTHETIC_RESPONSE_PREFIX: &str = "[synthetic response]";

/// Fixed token count reported by synthetic completions
pub const SYNTHETIC_TOKENS_USED: u32 = 150;

/// Character length of each synthetic stream chunk
const SYNTHETIC_CHUNK_CHARS: usize = 16;

/// Build the deterministic stand-in result for an unreachable service
pub(crate) fn synthetic_result(model: &str, messages: &[ChatMessage]) -> CompletionResult {
    let request = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("");

    CompletionResult {
        content: format!(
            "{} The completion service is not reachable. Request was: {}",
            SYNTHETIC_RESPONSE_PREFIX, request
        ),
        tokens_used: SYNTHETIC_TOKENS_USED,
        finish_reason: FinishReason::Stop,
        model: model.to_string(),
    }
}

/// Split the stand-in content into stream chunks
///
/// Concatenating the chunks reconstitutes the content of
/// [`synthetic_result`] for the same inputs.
pub(crate) fn synthetic_chunks(model: &str, messages: &[ChatMessage]) -> Vec<String> {
    let content = synthetic_result(model, messages).content;
    let chars: Vec<char> = content.chars().collect();
    chars
        .chunks(SYNTHETIC_CHUNK_CHARS)
        .map(|c| c.iter().collect())
        .collect()
}

/// Backend kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// OpenAI-compatible chat completions (OpenAI, vLLM, ...)
    OpenAi,
    /// Anthropic Messages API
    Anthropic,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl FromStr for BackendKind {
    type Err = GrowthScopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(GrowthScopeError::Config(format!(
                "unsupported completion backend: {}",
                other
            ))),
        }
    }
}

/// Create a completion backend for the configured kind
pub fn create_backend(
    kind: &str,
    config: &CompletionServiceConfig,
) -> Result<Arc<dyn CompletionBackend>> {
    match kind.parse::<BackendKind>()? {
        BackendKind::OpenAi => Ok(Arc::new(super::OpenAiBackend::new(config.clone())?)),
        BackendKind::Anthropic => Ok(Arc::new(super::AnthropicBackend::new(config.clone())?)),
    }
}
