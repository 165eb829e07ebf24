//! Capability traits and their request types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::LlmResult;

/// What a generation or judgment call is for.
///
/// Clients may route tasks to different models; fakes key their scripts on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTask {
    VisualDescription,
    ConceptualCaption,
    RefusalQueries,
    IdentificationStrength,
    Transliteration,
    PrecedentQueries,
    PrecedentGrading,
    ReportDrafting,
    ReportEvaluation,
}

impl PromptTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptTask::VisualDescription => "visual_description",
            PromptTask::ConceptualCaption => "conceptual_caption",
            PromptTask::RefusalQueries => "refusal_queries",
            PromptTask::IdentificationStrength => "identification_strength",
            PromptTask::Transliteration => "transliteration",
            PromptTask::PrecedentQueries => "precedent_queries",
            PromptTask::PrecedentGrading => "precedent_grading",
            PromptTask::ReportDrafting => "report_drafting",
            PromptTask::ReportEvaluation => "report_evaluation",
        }
    }
}

impl std::fmt::Display for PromptTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image fidelity requested from a vision-capable model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detail {
    Low,
    High,
    #[default]
    Auto,
}

impl Detail {
    pub fn as_str(&self) -> &'static str {
        match self {
            Detail::Low => "low",
            Detail::High => "high",
            Detail::Auto => "auto",
        }
    }
}

/// One free-text generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub task: PromptTask,
    pub system_prompt: String,
    pub user_prompt: String,
    pub image: Option<Vec<u8>>,
    pub detail: Detail,
}

impl GenerationRequest {
    pub fn new(
        task: PromptTask,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            task,
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            image: None,
            detail: Detail::Auto,
        }
    }

    pub fn with_image(mut self, image: Vec<u8>, detail: Detail) -> Self {
        self.image = Some(image);
        self.detail = detail;
        self
    }
}

/// One structured judgment call. `schema` is a JSON Schema object the
/// answer must satisfy.
#[derive(Debug, Clone)]
pub struct JudgmentRequest {
    pub task: PromptTask,
    pub system_prompt: String,
    pub user_prompt: String,
    pub schema_name: String,
    pub schema: serde_json::Value,
}

impl JudgmentRequest {
    pub fn new(
        task: PromptTask,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        schema_name: impl Into<String>,
        schema: serde_json::Value,
    ) -> Self {
        Self {
            task,
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            schema_name: schema_name.into(),
            schema,
        }
    }
}

/// A court decision fetched from the public case-law service, with every
/// HTML-bearing field already reduced to plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub serial_no: String,
    pub case_number: Option<String>,
    pub case_name: Option<String>,
    pub holding_summary: Option<String>,
    pub issues: Option<String>,
    pub full_text: Option<String>,
}

impl CaseRecord {
    /// Body text by priority: holding summary, then issues, then full text.
    pub fn body(&self) -> Option<&str> {
        [&self.holding_summary, &self.issues, &self.full_text]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|text| !text.trim().is_empty())
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> LlmResult<String>;
}

#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, request: JudgmentRequest) -> LlmResult<serde_json::Value>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>>;
}

#[async_trait]
pub trait CaseLawSearch: Send + Sync {
    /// Serial numbers of decisions matching every keyword.
    async fn search_ids(&self, keywords: &[String], display: usize) -> LlmResult<Vec<String>>;

    /// Detail of one decision; `None` when the service has nothing for `serial_no`.
    async fn fetch_case(&self, serial_no: &str) -> LlmResult<Option<CaseRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(summary: Option<&str>, issues: Option<&str>, full: Option<&str>) -> CaseRecord {
        CaseRecord {
            serial_no: "1".into(),
            case_number: None,
            case_name: None,
            holding_summary: summary.map(String::from),
            issues: issues.map(String::from),
            full_text: full.map(String::from),
        }
    }

    #[test]
    fn body_prefers_summary_then_issues_then_full_text() {
        assert_eq!(record(Some("a"), Some("b"), Some("c")).body(), Some("a"));
        assert_eq!(record(Some("  "), Some("b"), Some("c")).body(), Some("b"));
        assert_eq!(record(None, None, Some("c")).body(), Some("c"));
        assert_eq!(record(None, Some(""), None).body(), None);
    }
}
