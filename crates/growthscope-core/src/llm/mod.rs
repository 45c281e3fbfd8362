//! Completion backend integration
//!
//! Provides traits and implementations for:
//! - Chat completions via external services (OpenAI-compatible, Anthropic)
//! - Pull-based completion streaming
//! - Embedding generation for semantic retrieval

mod anthropic;
mod backend;
mod cache;
mod embedder;
mod openai;
mod types;

pub use anthropic::AnthropicBackend;
pub use backend::{
    create_backend, BackendKind, CompletionBackend, CompletionStream,
    SYNTHETIC_RESPONSE_PREFIX, SYNTHETIC_TOKENS_USED,
};
pub use embedder::{Embedder, HttpEmbedder};
pub use openai::OpenAiBackend;
pub use types::{ChatMessage, CompletionOptions, CompletionResult, FinishReason, Role};
