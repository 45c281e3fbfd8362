//! GrowthScope Core Library
//!
//! AI orchestration for the growthscope growth-analytics platform.
//!
//! # Features
//! - Intent classification over natural-language requests
//! - Intent-scoped data retrieval with provenance references
//! - Prompt assembly from reusable `{{variable}}` templates
//! - Pluggable completion backends (OpenAI-compatible, Anthropic) with
//!   pull-based streaming
//! - Semantic store abstraction over embedded documents

pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod retrieval;
pub mod templates;
pub mod vector;

pub use config::{CompletionServiceConfig, Config, VectorServiceConfig};
pub use error::{Error, GrowthScopeError, Result};
pub use llm::{
    create_backend, AnthropicBackend, BackendKind, ChatMessage, CompletionBackend,
    CompletionOptions, CompletionResult, CompletionStream, Embedder, FinishReason, HttpEmbedder,
    OpenAiBackend, Role, SYNTHETIC_RESPONSE_PREFIX, SYNTHETIC_TOKENS_USED,
};
pub use orchestrator::{OrchestrationResult, PromptOrchestrator};
pub use retrieval::{
    analyze_intent, DataReference, DataRetriever, Intent, PromptContext, StaticDataRetriever,
};
pub use templates::{fill_template, PromptTemplate, TemplateRegistry};
pub use vector::{
    create_store, HttpVectorStore, InMemoryVectorStore, StoreKind, VectorDocument,
    VectorSearchResult, VectorStore,
};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "growthscope";
