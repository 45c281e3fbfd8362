//! Error types for growthscope

use thiserror::Error;

/// Result type alias using GrowthScopeError
pub type Result<T> = std::result::Result<T, GrowthScopeError>;

/// Error type alias for convenience
pub type Error = GrowthScopeError;

/// Main error type for growthscope
#[derive(Debug, Error)]
pub enum GrowthScopeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
