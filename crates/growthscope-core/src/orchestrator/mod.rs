//! Prompt orchestration pipeline
//!
//! Turns a natural-language request into a grounded completion: classify
//! the intent, retrieve intent-relevant data, assemble a bounded message
//! sequence, and invoke the completion backend. Stages run strictly in
//! order within one call; failures propagate to the caller without retry.

use crate::error::Result;
use crate::llm::{ChatMessage, CompletionBackend, CompletionOptions};
use crate::retrieval::{analyze_intent, DataReference, DataRetriever, PromptContext};
use crate::templates::{fill_template, PromptTemplate, TemplateRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

const ROLE_DESCRIPTION: &str = "You are an AI growth assistant for a marketing analytics \
platform. You help users understand their SEO performance, competitor landscape and \
conversion funnels. Ground every answer in the data provided below and say so when the \
data does not cover the question.";

/// Result of one orchestration call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    /// Generated answer text
    pub response: String,

    /// Provenance records for the data behind the answer
    pub data_references: Vec<DataReference>,

    /// Token usage reported by the backend for this call
    pub tokens_used: u32,

    /// Wall-clock pipeline duration in milliseconds
    pub processing_time_ms: u64,
}

/// The orchestration pipeline
pub struct PromptOrchestrator {
    backend: Arc<dyn CompletionBackend>,
    retriever: Arc<dyn DataRetriever>,
    templates: Arc<TemplateRegistry>,
}

impl PromptOrchestrator {
    /// Create an orchestrator from its collaborators
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        retriever: Arc<dyn DataRetriever>,
        templates: Arc<TemplateRegistry>,
    ) -> Self {
        Self {
            backend,
            retriever,
            templates,
        }
    }

    /// Create from environment variables, with the built-in template set
    /// and the canned retriever
    pub fn from_env() -> Result<Self> {
        let config = crate::config::CompletionServiceConfig::default();
        let backend = crate::llm::create_backend(&config.backend, &config)?;
        Ok(Self::new(
            backend,
            Arc::new(crate::retrieval::StaticDataRetriever::new()),
            Arc::new(TemplateRegistry::builtin()),
        ))
    }

    /// The injected template registry
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Run the pipeline for a user message
    pub async fn execute(
        &self,
        user_message: &str,
        context: &PromptContext,
        history: &[ChatMessage],
    ) -> Result<OrchestrationResult> {
        let started = Instant::now();

        let intent = analyze_intent(user_message);
        tracing::debug!(intent = intent.as_str(), "classified request intent");

        let references = self.retriever.retrieve(intent, context).await?;
        tracing::debug!(count = references.len(), "retrieved data references");

        let messages = assemble_messages(user_message, context, history, &references);
        let completion = self
            .backend
            .complete(&messages, &CompletionOptions::default())
            .await?;

        Ok(OrchestrationResult {
            response: completion.content,
            data_references: references,
            tokens_used: completion.tokens_used,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Fill a template and run the pipeline on the result
    pub async fn apply_template(
        &self,
        template: &PromptTemplate,
        variables: &HashMap<String, String>,
        context: &PromptContext,
    ) -> Result<OrchestrationResult> {
        let filled = fill_template(template, variables);
        self.execute(&filled, context, &[]).await
    }

    /// Resolve a template by id, fill it, and run the pipeline
    pub async fn apply_template_by_id(
        &self,
        template_id: &str,
        variables: &HashMap<String, String>,
        context: &PromptContext,
    ) -> Result<OrchestrationResult> {
        let filled = fill_template(self.templates.get_by_id(template_id)?, variables);
        self.execute(&filled, context, &[]).await
    }
}

/// Assemble the message sequence: system first, history in original order,
/// the new user message last
fn assemble_messages(
    user_message: &str,
    context: &PromptContext,
    history: &[ChatMessage],
    references: &[DataReference],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(build_system_prompt(
        context, references,
    )));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(user_message));
    messages
}

fn build_system_prompt(context: &PromptContext, references: &[DataReference]) -> String {
    use std::fmt::Write;

    let mut prompt = String::from(ROLE_DESCRIPTION);

    let sources = if context.data_sources_available.is_empty() {
        "none".to_string()
    } else {
        context.data_sources_available.join(", ")
    };
    let _ = write!(prompt, "\n\nAvailable data sources: {}", sources);

    match context.project_id.as_deref() {
        Some(project) => {
            let _ = write!(prompt, "\nActive project: {}", project);
        }
        None => prompt.push_str("\nActive project: not selected"),
    }
    let _ = write!(
        prompt,
        "\nWorkspace: {} (user {})",
        context.workspace_id, context.user_id
    );

    if !references.is_empty() {
        prompt.push_str("\n\nRelevant data:");
        for reference in references {
            let payload = serde_json::to_string_pretty(&reference.data)
                .unwrap_or_else(|_| reference.data.to_string());
            let _ = write!(
                prompt,
                "\n- {}: {}\n{}",
                reference.source, reference.summary, payload
            );
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrowthScopeError;
    use crate::llm::{CompletionResult, CompletionStream, FinishReason, Role};
    use crate::retrieval::StaticDataRetriever;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Deterministic backend capturing the messages it receives
    struct RecordingBackend {
        captured: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self {
                captured: Mutex::new(Vec::new()),
            }
        }

        fn last_messages(&self) -> Vec<ChatMessage> {
            self.captured.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CompletionBackend for RecordingBackend {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> crate::error::Result<CompletionResult> {
            self.captured.lock().unwrap().push(messages.to_vec());
            let user = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(CompletionResult {
                content: format!("echo: {}", user),
                tokens_used: 42,
                finish_reason: FinishReason::Stop,
                model: "recording".to_string(),
            })
        }

        fn stream_complete(
            &self,
            _messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> CompletionStream {
            Box::pin(futures::stream::empty())
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    /// Retriever that always fails, for propagation tests
    struct FailingRetriever;

    #[async_trait]
    impl crate::retrieval::DataRetriever for FailingRetriever {
        async fn retrieve(
            &self,
            _intent: crate::retrieval::Intent,
            _context: &PromptContext,
        ) -> crate::error::Result<Vec<DataReference>> {
            Err(GrowthScopeError::Retrieval("store offline".to_string()))
        }
    }

    fn context() -> PromptContext {
        PromptContext {
            workspace_id: "ws_1".to_string(),
            project_id: None,
            user_id: "user_3".to_string(),
            data_sources_available: vec!["keyword_db".to_string()],
        }
    }

    fn orchestrator(backend: Arc<RecordingBackend>) -> PromptOrchestrator {
        PromptOrchestrator::new(
            backend,
            Arc::new(StaticDataRetriever::new()),
            Arc::new(TemplateRegistry::builtin()),
        )
    }

    #[tokio::test]
    async fn test_execute_message_ordering() {
        let backend = Arc::new(RecordingBackend::new());
        let orchestrator = orchestrator(backend.clone());

        let history = vec![
            ChatMessage::user("earlier question"),
            ChatMessage::assistant("earlier answer"),
        ];
        orchestrator
            .execute("hello there", &context(), &history)
            .await
            .unwrap();

        let messages = backend.last_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].content, "earlier answer");
        assert_eq!(messages[3].role, Role::User);
        assert_eq!(messages[3].content, "hello there");
    }

    #[tokio::test]
    async fn test_execute_attaches_references_and_tokens() {
        let backend = Arc::new(RecordingBackend::new());
        let orchestrator = orchestrator(backend);

        let result = orchestrator
            .execute("show me competitor gaps", &context(), &[])
            .await
            .unwrap();

        assert_eq!(result.tokens_used, 42);
        assert_eq!(result.data_references.len(), 1);
        assert_eq!(result.data_references[0].source, "competitor_db");
    }

    #[tokio::test]
    async fn test_system_prompt_embeds_context_and_data() {
        let backend = Arc::new(RecordingBackend::new());
        let orchestrator = orchestrator(backend.clone());

        orchestrator
            .execute("what are my top keywords", &context(), &[])
            .await
            .unwrap();

        let system = &backend.last_messages()[0].content;
        assert!(system.contains("Available data sources: keyword_db"));
        assert!(system.contains("Active project: not selected"));
        assert!(system.contains("- keyword_db:"));
    }

    #[tokio::test]
    async fn test_retriever_failure_propagates() {
        let orchestrator = PromptOrchestrator::new(
            Arc::new(RecordingBackend::new()),
            Arc::new(FailingRetriever),
            Arc::new(TemplateRegistry::builtin()),
        );

        let err = orchestrator
            .execute("what are my top keywords", &context(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GrowthScopeError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_apply_template_matches_manual_fill() {
        let backend = Arc::new(RecordingBackend::new());
        let orchestrator = orchestrator(backend);

        let template = TemplateRegistry::builtin();
        let template = template.get_by_id("competitor_gap").unwrap().clone();
        let mut variables = HashMap::new();
        variables.insert("domain".to_string(), "example.com".to_string());
        variables.insert("competitor".to_string(), "rival.io".to_string());

        let via_template = orchestrator
            .apply_template(&template, &variables, &context())
            .await
            .unwrap();

        let filled = fill_template(&template, &variables);
        let via_execute = orchestrator.execute(&filled, &context(), &[]).await.unwrap();

        assert_eq!(via_template.response, via_execute.response);
        assert_eq!(via_template.data_references, via_execute.data_references);
        assert_eq!(via_template.tokens_used, via_execute.tokens_used);
    }

    #[tokio::test]
    async fn test_apply_template_by_id_unknown_fails() {
        let orchestrator = orchestrator(Arc::new(RecordingBackend::new()));

        let err = orchestrator
            .apply_template_by_id("missing", &HashMap::new(), &context())
            .await
            .unwrap_err();
        assert!(matches!(err, GrowthScopeError::TemplateNotFound(_)));
    }
}
