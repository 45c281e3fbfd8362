//! Remote vector service store

use super::{VectorDocument, VectorSearchResult, VectorStore};
use crate::config::VectorServiceConfig;
use crate::error::{GrowthScopeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Store backed by a remote vector service over JSON endpoints
pub struct HttpVectorStore {
    http_client: reqwest::Client,
    config: VectorServiceConfig,
}

#[derive(Serialize)]
struct UpsertRequest {
    documents: Vec<VectorDocument>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<VectorSearchResult>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
}

impl HttpVectorStore {
    /// Create new store from configuration
    pub fn new(config: VectorServiceConfig) -> Result<Self> {
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
        Self::new(VectorServiceConfig::default())
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.url, path);
        let mut req = self.http_client.post(url);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }
        req
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(GrowthScopeError::VectorStore(format!(
            "vector service error (HTTP {}): {}",
            status, body
        )))
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn upsert(&self, documents: Vec<VectorDocument>) -> Result<()> {
        let response = self
            .request("/documents/upsert")
            .json(&UpsertRequest { documents })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let response = self
            .request("/documents/search")
            .json(&SearchRequest { query, top_k })
            .send()
            .await?;
        let response = Self::check(response).await?;
        let search_response: SearchResponse = response.json().await?;

        // Enforce the contract locally even if the service misbehaves.
        let mut results = search_response.results;
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);
        Ok(results)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let response = self
            .request("/documents/delete")
            .json(&DeleteRequest { ids })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_service_errors() {
        let store = HttpVectorStore::new(VectorServiceConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();

        assert!(store.search("anything", 5).await.is_err());
        assert!(store.delete(&["a".to_string()]).await.is_err());
    }
}
