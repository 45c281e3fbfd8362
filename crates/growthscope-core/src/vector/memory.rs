//! In-memory vector store
//!
//! Scores with cosine similarity when an embedder is attached, otherwise
//! with lexical query-token coverage. Both scores live in [0, 1].

use super::{VectorDocument, VectorSearchResult, VectorStore};
use crate::error::Result;
use crate::llm::Embedder;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Process-local store, useful for tests and single-node deployments
#[derive(Default)]
pub struct InMemoryVectorStore {
    documents: RwLock<HashMap<String, VectorDocument>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl InMemoryVectorStore {
    /// Create a store with lexical scoring
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            embedder: None,
        }
    }

    /// Create a store that embeds queries and documents for cosine scoring
    pub fn with_embedder(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            embedder: Some(embedder),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, mut documents: Vec<VectorDocument>) -> Result<()> {
        // Embed before taking the lock; the lock is never held across await.
        if let Some(ref embedder) = self.embedder {
            let missing: Vec<usize> = documents
                .iter()
                .enumerate()
                .filter(|(_, d)| d.embedding.is_none())
                .map(|(i, _)| i)
                .collect();

            if !missing.is_empty() {
                let texts: Vec<String> =
                    missing.iter().map(|&i| documents[i].content.clone()).collect();
                let embeddings = embedder.embed_batch(&texts).await?;
                for (&i, embedding) in missing.iter().zip(embeddings) {
                    documents[i].embedding = Some(embedding);
                }
            }
        }

        if let Ok(mut held) = self.documents.write() {
            for document in documents {
                held.insert(document.id.clone(), document);
            }
        }
        Ok(())
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let query_embedding = match self.embedder {
            Some(ref embedder) => Some(embedder.embed(query).await?),
            None => None,
        };

        let documents = self
            .documents
            .read()
            .map_err(|_| crate::error::GrowthScopeError::VectorStore("lock poisoned".into()))?;

        let mut scored: Vec<VectorSearchResult> = documents
            .values()
            .map(|document| {
                let score = match (&query_embedding, &document.embedding) {
                    (Some(query_vec), Some(doc_vec)) => {
                        cosine_similarity(query_vec, doc_vec).clamp(0.0, 1.0)
                    }
                    _ => lexical_coverage(query, &document.content),
                };
                VectorSearchResult {
                    id: document.id.clone(),
                    content: document.content.clone(),
                    metadata: document.metadata.clone(),
                    score,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        if let Ok(mut held) = self.documents.write() {
            for id in ids {
                held.remove(id);
            }
        }
        Ok(())
    }
}

/// Cosine similarity between two vectors (0.0 on dimension mismatch)
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Fraction of query tokens present in the document, in [0, 1]
fn lexical_coverage(query: &str, content: &str) -> f32 {
    let query_tokens: HashSet<String> = tokenize(query).collect();
    if query_tokens.is_empty() {
        return 0.0;
    }
    let content_tokens: HashSet<String> = tokenize(content).collect();
    let hits = query_tokens
        .iter()
        .filter(|t| content_tokens.contains(*t))
        .count();
    hits as f32 / query_tokens.len() as f32
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            // Deterministic 3-dim embedding keyed on topic words.
            let text = text.to_lowercase();
            Ok(vec![
                text.contains("seo") as u8 as f32,
                text.contains("pricing") as u8 as f32,
                text.contains("churn") as u8 as f32,
            ])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn seed() -> Vec<VectorDocument> {
        vec![
            VectorDocument::new("a", "improving seo rankings with internal links"),
            VectorDocument::new("b", "pricing page redesign experiments"),
            VectorDocument::new("c", "reducing churn through onboarding emails"),
            VectorDocument::new("d", "seo audit checklist for new sites"),
        ]
    }

    #[tokio::test]
    async fn test_search_respects_top_k_and_ordering() {
        let store = InMemoryVectorStore::new();
        store.upsert(seed()).await.unwrap();

        let results = store.search("seo checklist", 2).await.unwrap();
        assert!(results.len() <= 2);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for result in &results {
            assert!((0.0..=1.0).contains(&result.score));
        }
        assert_eq!(results[0].id, "d");
    }

    #[tokio::test]
    async fn test_search_top_k_zero_is_empty() {
        let store = InMemoryVectorStore::new();
        store.upsert(seed()).await.unwrap();
        assert!(store.search("anything", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_by_id() {
        let store = InMemoryVectorStore::new();
        store.upsert(seed()).await.unwrap();
        assert_eq!(store.len(), 4);

        store
            .upsert(vec![VectorDocument::new("a", "replacement content")])
            .await
            .unwrap();
        assert_eq!(store.len(), 4);

        let results = store.search("replacement content", 4).await.unwrap();
        assert_eq!(results[0].id, "a");
        assert_eq!(results[0].content, "replacement content");
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_noop() {
        let store = InMemoryVectorStore::new();
        store.upsert(seed()).await.unwrap();

        store
            .delete(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_embedder_backed_search() {
        let store = InMemoryVectorStore::with_embedder(Arc::new(StubEmbedder));
        store.upsert(seed()).await.unwrap();

        let results = store.search("help with seo", 4).await.unwrap();
        assert!(["a", "d"].contains(&results[0].id.as_str()));
        for result in &results {
            assert!((0.0..=1.0).contains(&result.score));
        }
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
