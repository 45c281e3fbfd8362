//! Configuration management

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Completion service configuration
    #[serde(default)]
    pub completion: CompletionServiceConfig,

    /// Vector store configuration
    #[serde(default)]
    pub vector: VectorServiceConfig,
}

/// Completion service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionServiceConfig {
    /// Backend kind ("openai" for OpenAI-compatible services, "anthropic")
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Base URL of the completion service
    pub url: String,

    /// Model name for chat completions
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from completion URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensions (falls back to 384 if not specified)
    #[serde(default)]
    pub embedding_dimensions: Option<usize>,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl CompletionServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }

    /// Whether a credential is configured for the service
    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl Default for CompletionServiceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: std::env::var("GROWTHSCOPE_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_chat_model(),
            embedding_url: std::env::var("GROWTHSCOPE_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: std::env::var("GROWTHSCOPE_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok()),
            api_key: std::env::var("GROWTHSCOPE_LLM_API_KEY").ok(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_backend() -> String {
    std::env::var("GROWTHSCOPE_LLM_BACKEND").unwrap_or_else(|_| "openai".to_string())
}

fn default_chat_model() -> String {
    std::env::var("GROWTHSCOPE_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("GROWTHSCOPE_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "text-embedding-3-small".to_string())
}

fn default_timeout() -> u64 {
    30
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorServiceConfig {
    /// Store kind ("memory", "http")
    #[serde(default = "default_store")]
    pub store: String,

    /// Base URL of the remote vector service (http store only)
    pub url: String,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for VectorServiceConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            url: std::env::var("GROWTHSCOPE_VECTOR_URL")
                .unwrap_or_else(|_| "http://localhost:6333".to_string()),
            api_key: std::env::var("GROWTHSCOPE_VECTOR_API_KEY").ok(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_store() -> String {
    std::env::var("GROWTHSCOPE_VECTOR_STORE").unwrap_or_else(|_| "memory".to_string())
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path (missing file yields defaults)
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }
}
