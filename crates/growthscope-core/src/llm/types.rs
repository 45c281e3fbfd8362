//! Message and completion value types shared across the pipeline

use serde::{Deserialize, Serialize};

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Options for a completion request
///
/// All fields have defaults; backends fall back to these when the caller
/// passes `CompletionOptions::default()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sequences that truncate generation
    #[serde(default)]
    pub stop_sequences: Option<Vec<String>>,

    /// Whether output is requested incrementally
    #[serde(default)]
    pub stream: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            stop_sequences: None,
            stream: false,
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

/// Why the backend stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// Map a backend-reported stop tag onto the shared taxonomy
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "stop" | "end_turn" | "stop_sequence" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Result of a non-streaming completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    /// Generated text
    pub content: String,

    /// Backend-reported token usage
    pub tokens_used: u32,

    /// Why generation stopped
    pub finish_reason: FinishReason,

    /// Model that produced the completion
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = CompletionOptions::default();
        assert_eq!(options.temperature, 0.7);
        assert_eq!(options.max_tokens, 2000);
        assert!(options.stop_sequences.is_none());
        assert!(!options.stream);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let message = ChatMessage::user("hello");
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hello"}"#);
    }

    #[test]
    fn test_finish_reason_from_tag() {
        assert_eq!(FinishReason::from_tag("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from_tag("end_turn"), FinishReason::Stop);
        assert_eq!(FinishReason::from_tag("max_tokens"), FinishReason::Length);
        assert_eq!(
            FinishReason::from_tag("tool_use"),
            FinishReason::Other("tool_use".to_string())
        );
    }
}
