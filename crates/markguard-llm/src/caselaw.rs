//! Client for the public case-law open API.
//!
//! Two calls: a list search returning decision serial numbers, and a detail
//! lookup per serial number. Detail fields arrive as HTML fragments and are
//! reduced to plain text here.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::capability::{CaseLawSearch, CaseRecord};
use crate::error::LlmError;
use crate::LlmResult;

static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());
static LINE_BREAK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").ok());
static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Reduce an HTML fragment to single-spaced plain text.
pub fn strip_html(raw: &str) -> String {
    let mut text = raw.to_string();
    if let Some(re) = LINE_BREAK.as_ref() {
        text = re.replace_all(&text, "\n").into_owned();
    }
    if let Some(re) = TAG.as_ref() {
        text = re.replace_all(&text, "").into_owned();
    }
    text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&");
    if let Some(re) = WHITESPACE.as_ref() {
        text = re.replace_all(&text, " ").into_owned();
    }
    text.trim().to_string()
}

/// Case-law API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseLawConfig {
    /// Registered API user id (`OC` parameter)
    pub user_id: Option<String>,
    pub search_url: String,
    pub service_url: String,
}

impl Default for CaseLawConfig {
    fn default() -> Self {
        CaseLawConfig {
            user_id: std::env::var("MARKGUARD_CASELAW_USER").ok(),
            search_url: std::env::var("MARKGUARD_CASELAW_SEARCH_URL")
                .unwrap_or_else(|_| "https://www.law.go.kr/DRF/lawSearch.do".to_string()),
            service_url: std::env::var("MARKGUARD_CASELAW_SERVICE_URL")
                .unwrap_or_else(|_| "https://www.law.go.kr/DRF/lawService.do".to_string()),
        }
    }
}

impl CaseLawConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// HTTP implementation of [`CaseLawSearch`].
pub struct LawApiClient {
    config: CaseLawConfig,
    http_client: reqwest::Client,
}

impl LawApiClient {
    pub fn new(config: CaseLawConfig) -> LlmResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("markguard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(LawApiClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> LlmResult<Self> {
        Self::new(CaseLawConfig::from_env())
    }

    fn user_id(&self) -> LlmResult<&str> {
        self.config
            .user_id
            .as_deref()
            .ok_or_else(|| LlmError::NotConfigured("MARKGUARD_CASELAW_USER".into()))
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> LlmResult<Value> {
        let response = self.http_client.get(url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }
}

/// Serial numbers from a list response; `prec` is an object for one hit
/// and an array for several.
pub(crate) fn serial_numbers(data: &Value) -> Vec<String> {
    let items = match data.get("PrecSearch").and_then(|s| s.get("prec")) {
        Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => return Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| match item.get("판례일련번호")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

/// Case record from a detail response.
pub(crate) fn case_record(serial_no: &str, data: &Value) -> Option<CaseRecord> {
    let info = data.get("PrecService")?.as_object()?;
    if info.is_empty() {
        return None;
    }
    let text = |key: &str| {
        info.get(key)
            .and_then(Value::as_str)
            .map(strip_html)
            .filter(|s| !s.is_empty())
    };
    Some(CaseRecord {
        serial_no: serial_no.to_string(),
        case_number: text("사건번호"),
        case_name: text("사건명"),
        holding_summary: text("판결요지"),
        issues: text("판시사항"),
        full_text: text("판결내용"),
    })
}

#[async_trait]
impl CaseLawSearch for LawApiClient {
    #[instrument(skip(self), fields(keywords = keywords.len()))]
    async fn search_ids(&self, keywords: &[String], display_count: usize) -> LlmResult<Vec<String>> {
        let mut params = vec![
            ("OC", self.user_id()?.to_string()),
            ("target", "prec".to_string()),
            ("type", "JSON".to_string()),
            ("search", "2".to_string()),
            ("display", display_count.to_string()),
            ("page", "1".to_string()),
        ];
        params.extend(keywords.iter().map(|k| ("query", k.clone())));

        let data = self.get_json(&self.config.search_url, &params).await?;
        let ids = serial_numbers(&data);
        debug!(hits = ids.len(), "case-law search complete");
        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn fetch_case(&self, serial_no: &str) -> LlmResult<Option<CaseRecord>> {
        let params = [
            ("OC", self.user_id()?.to_string()),
            ("target", "prec".to_string()),
            ("ID", serial_no.to_string()),
            ("type", "JSON".to_string()),
        ];
        let data = self.get_json(&self.config.service_url, &params).await?;
        Ok(case_record(serial_no, &data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_tags_entities_and_whitespace() {
        let raw = "【판시사항】<br/>상표의&nbsp;유사 <b>여부</b><br>&lt;참조&gt; A &amp; B\n\n  끝";
        assert_eq!(strip_html(raw), "【판시사항】 상표의 유사 여부 <참조> A & B 끝");
    }

    #[test]
    fn serial_numbers_accept_object_or_array() {
        let one = json!({"PrecSearch": {"prec": {"판례일련번호": "123"}}});
        let many = json!({"PrecSearch": {"prec": [{"판례일련번호": 1}, {"x": 2}, {"판례일련번호": "3"}]}});
        let none = json!({"PrecSearch": {}});
        assert_eq!(serial_numbers(&one), vec!["123"]);
        assert_eq!(serial_numbers(&many), vec!["1", "3"]);
        assert!(serial_numbers(&none).is_empty());
    }

    #[test]
    fn case_record_cleans_fields() {
        let data = json!({"PrecService": {
            "사건번호": "2019후1234",
            "사건명": "등록무효(상)",
            "판결요지": "",
            "판시사항": "<p>요부가 유사</p>",
        }});
        let record = case_record("77", &data).unwrap();
        assert_eq!(record.case_number.as_deref(), Some("2019후1234"));
        assert_eq!(record.holding_summary, None);
        assert_eq!(record.body(), Some("요부가 유사"));
        assert!(case_record("77", &json!({"PrecService": {}})).is_none());
    }
}
