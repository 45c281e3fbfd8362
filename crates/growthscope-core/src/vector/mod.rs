//! Semantic store abstraction
//!
//! Similarity search over embedded documents with interchangeable backend
//! variants. The abstraction owns no state; documents belong to whichever
//! store holds them.

mod http;
mod memory;

pub use http::HttpVectorStore;
pub use memory::InMemoryVectorStore;

use crate::config::VectorServiceConfig;
use crate::error::{GrowthScopeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// Document held by a semantic store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDocument {
    /// Unique identifier (upsert key)
    pub id: String,

    /// Document text
    pub content: String,

    /// Arbitrary key/value metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Embedding vector, if already computed
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl VectorDocument {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: HashMap::new(),
            embedding: None,
        }
    }

    /// Add metadata to the document
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach a precomputed embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Search hit with a bounded similarity score (higher = more relevant)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchResult {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Similarity in [0, 1]
    pub score: f32,
}

/// Trait for semantic store backends
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite documents, keyed by id
    async fn upsert(&self, documents: Vec<VectorDocument>) -> Result<()>;

    /// Return at most `top_k` results, ordered by descending score
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<VectorSearchResult>>;

    /// Remove documents; unknown ids are a no-op
    async fn delete(&self, ids: &[String]) -> Result<()>;
}

/// Store kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Http,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Http => "http",
        }
    }
}

impl FromStr for StoreKind {
    type Err = GrowthScopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(Self::Memory),
            "http" => Ok(Self::Http),
            other => Err(GrowthScopeError::Config(format!(
                "unsupported vector store: {}",
                other
            ))),
        }
    }
}

/// Create a vector store for the configured kind
pub fn create_store(kind: &str, config: &VectorServiceConfig) -> Result<Arc<dyn VectorStore>> {
    match kind.parse::<StoreKind>()? {
        StoreKind::Memory => Ok(Arc::new(InMemoryVectorStore::new())),
        StoreKind::Http => Ok(Arc::new(HttpVectorStore::new(config.clone())?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind_parsing() {
        assert_eq!("memory".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert_eq!("http".parse::<StoreKind>().unwrap(), StoreKind::Http);
    }

    #[test]
    fn test_unknown_store_kind_fails() {
        let err = "pinecone".parse::<StoreKind>().unwrap_err();
        assert!(matches!(err, GrowthScopeError::Config(_)));
    }

    #[test]
    fn test_create_store_unknown_kind_fails() {
        let config = VectorServiceConfig::default();
        assert!(create_store("mystery", &config).is_err());
    }
}
