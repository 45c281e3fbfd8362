//! Reusable prompt templates
//!
//! Templates are text skeletons with `{{variable}}` slots, registered once
//! at startup in an immutable [`TemplateRegistry`] and filled per use with
//! [`fill_template`]. Missing variables render as an explicit placeholder
//! instead of failing, so partially-filled templates stay legible.

use crate::error::{GrowthScopeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A registered prompt template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Unique identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Grouping category (e.g. "seo", "competitive", "conversion")
    pub category: String,

    /// Template text with `{{variable}}` slots
    pub template: String,

    /// Declared variable names, in first-appearance order
    pub variables: Vec<String>,

    /// What the template is for
    pub description: String,
}

impl PromptTemplate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        template: impl Into<String>,
        variables: &[&str],
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            template: template.into(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            description: description.into(),
        }
    }
}

/// Immutable lookup table of prompt templates
///
/// Constructed explicitly and injected where needed, so tests can run with
/// custom template sets.
pub struct TemplateRegistry {
    templates: Vec<PromptTemplate>,
    by_id: HashMap<String, usize>,
}

impl TemplateRegistry {
    /// Create a registry from a template list (registration order preserved)
    pub fn new(templates: Vec<PromptTemplate>) -> Self {
        let by_id = templates
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        Self { templates, by_id }
    }

    /// Create a registry with the built-in growth-analytics templates
    pub fn builtin() -> Self {
        Self::new(builtin_templates())
    }

    /// Get a template by id
    pub fn get_by_id(&self, id: &str) -> Result<&PromptTemplate> {
        self.by_id
            .get(id)
            .map(|&i| &self.templates[i])
            .ok_or_else(|| GrowthScopeError::TemplateNotFound(id.to_string()))
    }

    /// Get all templates in a category, in registration order
    pub fn get_by_category(&self, category: &str) -> Vec<&PromptTemplate> {
        self.templates
            .iter()
            .filter(|t| t.category == category)
            .collect()
    }

    /// All registered templates, in registration order
    pub fn all(&self) -> &[PromptTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Fill a template's declared `{{variable}}` slots
///
/// Every declared variable is replaced at all occurrences: by its supplied
/// value, or by `[name not provided]` when absent. Supplied variables the
/// template does not declare have no effect. Pure and total.
pub fn fill_template(template: &PromptTemplate, variables: &HashMap<String, String>) -> String {
    let mut filled = template.template.clone();
    for name in &template.variables {
        let slot = format!("{{{{{}}}}}", name);
        let value = match variables.get(name) {
            Some(value) => value.clone(),
            None => format!("[{} not provided]", name),
        };
        filled = filled.replace(&slot, &value);
    }
    filled
}

fn builtin_templates() -> Vec<PromptTemplate> {
    vec![
        PromptTemplate::new(
            "keyword_opportunity",
            "Keyword Opportunity Analysis",
            "seo",
            "Analyze the ranking opportunity for the keyword \"{{keyword}}\" on {{domain}}.\n\
             Current position: {{current_rank}}. Monthly search volume: {{search_volume}}.\n\
             Estimate the traffic upside of reaching the top 3 positions and list the\n\
             on-page and off-page changes most likely to get there.",
            &["keyword", "domain", "current_rank", "search_volume"],
            "Sizes the upside of pushing a tracked keyword into the top positions",
        ),
        PromptTemplate::new(
            "competitor_gap",
            "Competitor Gap Analysis",
            "competitive",
            "Compare {{domain}} against {{competitor}}.\n\
             Identify keywords and content topics where {{competitor}} ranks but\n\
             {{domain}} does not, and rank the gaps by expected traffic value.",
            &["domain", "competitor"],
            "Finds keyword and content gaps against a named competitor",
        ),
        PromptTemplate::new(
            "seo_audit_summary",
            "SEO Audit Summary",
            "seo",
            "Summarize the latest SEO audit for {{domain}} (overall score {{audit_score}}).\n\
             Key issues found:\n{{issues}}\n\
             Group the issues by severity and propose a fix order that front-loads\n\
             the highest-impact items.",
            &["domain", "audit_score", "issues"],
            "Turns raw audit findings into a prioritized fix plan",
        ),
        PromptTemplate::new(
            "cro_recommendations",
            "Conversion Optimization Recommendations",
            "conversion",
            "The page {{page_url}} converts at {{conversion_rate}} from {{traffic}}\n\
             monthly visits. Diagnose the most likely conversion blockers and propose\n\
             concrete A/B test ideas, ordered by expected lift.",
            &["page_url", "conversion_rate", "traffic"],
            "Proposes prioritized conversion experiments for a landing page",
        ),
        PromptTemplate::new(
            "content_brief",
            "Content Brief",
            "content",
            "Write a content brief for an article about {{topic}} targeting the\n\
             keyword \"{{target_keyword}}\" for an audience of {{audience}}.\n\
             Include a suggested outline, internal linking targets and a meta\n\
             description under 160 characters.",
            &["topic", "target_keyword", "audience"],
            "Briefs a writer on a new article for a target keyword",
        ),
    ]
}
