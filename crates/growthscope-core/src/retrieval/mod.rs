//! Intent classification and data retrieval
//!
//! Classifies a user request into a coarse intent, then asks a
//! [`DataRetriever`] collaborator for the structured data relevant to that
//! intent. Retrieved references travel with the orchestration result as
//! provenance.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Coarse category describing what kind of data a request is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    KeywordAnalysis,
    CompetitorAnalysis,
    SeoAnalysis,
    CroAnalysis,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeywordAnalysis => "keyword_analysis",
            Self::CompetitorAnalysis => "competitor_analysis",
            Self::SeoAnalysis => "seo_analysis",
            Self::CroAnalysis => "cro_analysis",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a user message into an intent
///
/// Pure function of the lower-cased message. Checks run in a fixed order;
/// a message matching several categories resolves to the first match.
pub fn analyze_intent(message: &str) -> Intent {
    let message = message.to_lowercase();
    if message.contains("keyword") || message.contains("rank") {
        Intent::KeywordAnalysis
    } else if message.contains("competitor") {
        Intent::CompetitorAnalysis
    } else if message.contains("seo") || message.contains("audit") {
        Intent::SeoAnalysis
    } else if message.contains("conversion") || message.contains("cro") {
        Intent::CroAnalysis
    } else {
        Intent::General
    }
}

/// Tenant and project scope for one orchestration call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptContext {
    /// Workspace (tenant) the request runs under
    pub workspace_id: String,

    /// Active project, if one is selected
    #[serde(default)]
    pub project_id: Option<String>,

    /// Requesting user
    pub user_id: String,

    /// Labels of the data sources connected to this workspace
    #[serde(default)]
    pub data_sources_available: Vec<String>,
}

/// Provenance record naming the collaborator data behind an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataReference {
    /// Which store the data came from
    pub source: String,

    /// Human-readable summary for UI display
    pub summary: String,

    /// Structured payload (schema owned by the source)
    pub data: serde_json::Value,
}

/// Collaborator that resolves an intent into relevant structured data
#[async_trait]
pub trait DataRetriever: Send + Sync {
    /// Fetch data references for an intent, scoped by the prompt context
    async fn retrieve(&self, intent: Intent, context: &PromptContext)
        -> Result<Vec<DataReference>>;
}

/// Retriever returning canned per-intent examples
///
/// Stands in for the real per-intent stores until they are wired up; real
/// implementations query by `workspace_id`/`project_id`.
#[derive(Debug, Default)]
pub struct StaticDataRetriever;

impl StaticDataRetriever {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DataRetriever for StaticDataRetriever {
    async fn retrieve(
        &self,
        intent: Intent,
        context: &PromptContext,
    ) -> Result<Vec<DataReference>> {
        let scope = context
            .project_id
            .as_deref()
            .unwrap_or(&context.workspace_id);

        let references = match intent {
            Intent::KeywordAnalysis => vec![DataReference {
                source: "keyword_db".to_string(),
                summary: format!("Top tracked keywords for {}", scope),
                data: json!([
                    { "keyword": "seo tools", "position": 4, "search_volume": 2900 },
                    { "keyword": "rank tracker", "position": 7, "search_volume": 1600 },
                    { "keyword": "site audit software", "position": 12, "search_volume": 880 },
                ]),
            }],
            Intent::CompetitorAnalysis => vec![DataReference {
                source: "competitor_db".to_string(),
                summary: format!("Tracked competitors for {}", scope),
                data: json!([
                    { "domain": "rival.io", "shared_keywords": 143, "visibility": 0.62 },
                    { "domain": "contender.com", "shared_keywords": 87, "visibility": 0.41 },
                ]),
            }],
            Intent::SeoAnalysis => vec![DataReference {
                source: "seo_audits".to_string(),
                summary: format!("Latest site audit for {}", scope),
                data: json!({
                    "score": 78,
                    "issues": {
                        "critical": ["missing meta descriptions on 14 pages"],
                        "warning": ["34 images without alt text", "slow LCP on /pricing"],
                    },
                }),
            }],
            Intent::CroAnalysis => vec![DataReference {
                source: "analytics".to_string(),
                summary: format!("Conversion funnel for {}", scope),
                data: json!({
                    "sessions": 48210,
                    "signups": 1205,
                    "conversion_rate": 0.025,
                    "top_drop_off": "/signup/step-2",
                }),
            }],
            Intent::General => vec![],
        };

        Ok(references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> PromptContext {
        PromptContext {
            workspace_id: "ws_1".to_string(),
            project_id: Some("proj_9".to_string()),
            user_id: "user_3".to_string(),
            data_sources_available: vec!["keyword_db".to_string(), "analytics".to_string()],
        }
    }

    #[test]
    fn test_intent_classification() {
        assert_eq!(
            analyze_intent("What are my top ranking keywords?"),
            Intent::KeywordAnalysis
        );
        assert_eq!(
            analyze_intent("show me competitor gaps"),
            Intent::CompetitorAnalysis
        );
        assert_eq!(analyze_intent("run an SEO audit"), Intent::SeoAnalysis);
        assert_eq!(
            analyze_intent("improve my conversion funnel"),
            Intent::CroAnalysis
        );
        assert_eq!(analyze_intent("hello there"), Intent::General);
    }

    #[test]
    fn test_intent_classification_is_case_insensitive() {
        assert_eq!(analyze_intent("KEYWORD ideas"), Intent::KeywordAnalysis);
        assert_eq!(analyze_intent("CRO wins"), Intent::CroAnalysis);
    }

    #[test]
    fn test_intent_first_match_precedence() {
        // The keyword rule runs before the competitor rule.
        assert_eq!(
            analyze_intent("which keywords do my competitors rank for"),
            Intent::KeywordAnalysis
        );
        // The competitor rule runs before the seo rule.
        assert_eq!(
            analyze_intent("competitor seo strategy"),
            Intent::CompetitorAnalysis
        );
    }

    #[test]
    fn test_intent_is_deterministic() {
        let message = "audit my conversion keywords";
        let first = analyze_intent(message);
        for _ in 0..10 {
            assert_eq!(analyze_intent(message), first);
        }
    }

    #[tokio::test]
    async fn test_static_retriever_competitor_source() {
        let retriever = StaticDataRetriever::new();
        let references = retriever
            .retrieve(Intent::CompetitorAnalysis, &context())
            .await
            .unwrap();

        assert_eq!(references.len(), 1);
        assert_eq!(references[0].source, "competitor_db");
        assert!(references[0].data.is_array());
    }

    #[tokio::test]
    async fn test_static_retriever_general_is_empty() {
        let retriever = StaticDataRetriever::new();
        let references = retriever
            .retrieve(Intent::General, &context())
            .await
            .unwrap();
        assert!(references.is_empty());
    }

    #[tokio::test]
    async fn test_static_retriever_scopes_to_project() {
        let retriever = StaticDataRetriever::new();
        let references = retriever
            .retrieve(Intent::KeywordAnalysis, &context())
            .await
            .unwrap();
        assert!(references[0].summary.contains("proj_9"));
    }
}
