//! OpenAI-compatible chat, structured-output and embedding client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::capability::{
    Embedder, GenerationRequest, Generator, Judge, JudgmentRequest, PromptTask,
};
use crate::error::LlmError;
use crate::image::data_url;
use crate::LlmResult;

/// Endpoint and model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Model for captions, judgments and reports
    pub chat_model: String,
    /// Lighter model for refusal search queries
    pub query_model: String,
    pub embed_model: String,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let chat_model =
            std::env::var("MARKGUARD_LLM_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        LlmConfig {
            endpoint: std::env::var("MARKGUARD_LLM_ENDPOINT")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: std::env::var("MARKGUARD_LLM_API_KEY").ok(),
            query_model: std::env::var("MARKGUARD_LLM_QUERY_MODEL")
                .unwrap_or_else(|_| chat_model.clone()),
            chat_model,
            embed_model: std::env::var("MARKGUARD_LLM_EMBED_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-large".to_string()),
            temperature: 0.0,
        }
    }
}

impl LlmConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    fn model_for(&self, task: PromptTask) -> &str {
        match task {
            PromptTask::RefusalQueries => &self.query_model,
            _ => &self.chat_model,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// HTTP client implementing [`Generator`], [`Judge`] and [`Embedder`].
pub struct OpenAiClient {
    config: LlmConfig,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("markguard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(OpenAiClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> LlmResult<Self> {
        Self::new(LlmConfig::from_env())
    }

    fn user_content(user_prompt: &str, image: Option<&[u8]>, detail: &str) -> Value {
        match image {
            Some(bytes) => json!([
                { "type": "text", "text": user_prompt },
                { "type": "image_url", "image_url": { "url": data_url(bytes), "detail": detail } }
            ]),
            None => Value::String(user_prompt.to_string()),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> LlmResult<reqwest::Response> {
        let url = format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path);
        let mut request = self.http_client.post(&url).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn chat(&self, body: Value) -> LlmResult<String> {
        let response: ChatResponse = self.post("chat/completions", &body).await?.json().await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::UnexpectedResponse("chat completion without content".into()))
    }
}

#[async_trait]
impl Generator for OpenAiClient {
    #[instrument(skip(self, request), fields(task = %request.task))]
    async fn generate(&self, request: GenerationRequest) -> LlmResult<String> {
        let body = json!({
            "model": self.config.model_for(request.task),
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                {
                    "role": "user",
                    "content": Self::user_content(
                        &request.user_prompt,
                        request.image.as_deref(),
                        request.detail.as_str(),
                    ),
                },
            ],
        });
        let text = self.chat(body).await?;
        debug!(chars = text.len(), "generation complete");
        Ok(text)
    }
}

/// Parsed judgment payload. A reply that is not strict JSON (fenced,
/// prose-wrapped, single-quoted) is passed on as a string for the caller's
/// recovery chain.
fn judgment_value(text: String) -> Value {
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "judgment reply is not strict JSON, passing text through");
            Value::String(text)
        }
    }
}

#[async_trait]
impl Judge for OpenAiClient {
    #[instrument(skip(self, request), fields(task = %request.task, schema = %request.schema_name))]
    async fn judge(&self, request: JudgmentRequest) -> LlmResult<Value> {
        let body = json!({
            "model": self.config.model_for(request.task),
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": { "name": request.schema_name, "schema": request.schema },
            },
        });
        let text = self.chat(body).await?;
        Ok(judgment_value(text))
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
        let body = json!({ "model": self.config.embed_model, "input": text });
        let response: EmbeddingResponse = self.post("embeddings", &body).await?.json().await?;
        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::UnexpectedResponse("embedding response without data".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_task_uses_query_model() {
        let config = LlmConfig {
            endpoint: "http://localhost".into(),
            api_key: None,
            chat_model: "big".into(),
            query_model: "small".into(),
            embed_model: "embed".into(),
            temperature: 0.0,
        };
        assert_eq!(config.model_for(PromptTask::RefusalQueries), "small");
        assert_eq!(config.model_for(PromptTask::ReportDrafting), "big");
    }

    #[test]
    fn non_strict_judgment_reply_is_kept_as_text() {
        let fenced = "```json\n{\"decision\": \"approve\"}\n```".to_string();
        assert_eq!(judgment_value(fenced.clone()), Value::String(fenced));
        assert_eq!(
            judgment_value("{\"decision\": \"approve\"}".into()),
            json!({ "decision": "approve" })
        );
    }

    #[test]
    fn image_requests_become_content_parts() {
        let parts = OpenAiClient::user_content("describe", Some(&[0xFF, 0xD8, 0xFF]), "high");
        assert_eq!(parts[0]["text"], "describe");
        assert_eq!(parts[1]["image_url"]["detail"], "high");
        assert!(parts[1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
        assert_eq!(OpenAiClient::user_content("plain", None, "auto"), json!("plain"));
    }
}
