//! Korean transcription of brand names through the generation capability.

use markguard_llm::{GenerationRequest, Generator, PromptTask};
use serde_json::Value;
use tracing::{debug, warn};

use super::hangul::hangul_only;
use crate::prompts;
use crate::recovery::RecoveryChain;

const FIELDS: &[&str] = &["korean_a", "korean_b"];

/// Candidate pronunciations for both names.
#[derive(Debug, Clone, PartialEq)]
pub struct Transliteration {
    pub korean_a: Vec<String>,
    pub korean_b: Vec<String>,
    /// False when the reply could not be parsed and the raw names are used.
    pub parsed: bool,
}

impl Transliteration {
    /// Raw names, used when the capability is unavailable or unparseable.
    pub fn verbatim(a: &str, b: &str) -> Self {
        Self {
            korean_a: vec![a.trim().to_string()],
            korean_b: vec![b.trim().to_string()],
            parsed: false,
        }
    }
}

/// Hangul-only candidates, empties dropped, first occurrence kept.
fn clean_candidates(value: Option<&Value>) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    };

    let mut seen = Vec::new();
    for item in items {
        let cleaned = hangul_only(&item);
        if !cleaned.is_empty() && !seen.contains(&cleaned) {
            seen.push(cleaned);
        }
    }
    seen
}

/// Parse a transliteration reply of the form
/// `{"korean_a": [...], "korean_b": [...]}`.
pub fn parse_transliteration(reply: &str, a: &str, b: &str) -> Transliteration {
    match RecoveryChain::with_list_fields(FIELDS).recover(reply) {
        Some(value) => Transliteration {
            korean_a: clean_candidates(value.get("korean_a")),
            korean_b: clean_candidates(value.get("korean_b")),
            parsed: true,
        },
        None => {
            let preview: String = reply.chars().take(50).collect();
            warn!(reply = %preview, "transliteration reply unparseable, using raw names");
            Transliteration::verbatim(a, b)
        }
    }
}

pub async fn transliterate(generator: &dyn Generator, a: &str, b: &str) -> Transliteration {
    let (a, b) = (a.trim(), b.trim());
    let request = GenerationRequest::new(
        PromptTask::Transliteration,
        prompts::TRANSLITERATION_SYSTEM,
        prompts::transliteration_user(a, b),
    );
    match generator.generate(request).await {
        Ok(reply) => {
            let result = parse_transliteration(&reply, a, b);
            debug!(korean_a = ?result.korean_a, korean_b = ?result.korean_b, "transliterated");
            result
        }
        Err(err) => {
            warn!(error = %err, "transliteration failed, using raw names");
            Transliteration::verbatim(a, b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_are_reduced_to_hangul_and_deduplicated() {
        let reply = r#"{"korean_a": ["나이키 (Nike)", "나이키", "  "], "korean_b": "나이끼!"}"#;
        let t = parse_transliteration(reply, "Nike", "Naikki");
        assert!(t.parsed);
        assert_eq!(t.korean_a, vec!["나이키"]);
        assert_eq!(t.korean_b, vec!["나이끼"]);
    }

    #[test]
    fn unparseable_reply_falls_back_to_names() {
        let t = parse_transliteration("I cannot help with that.", " Nike ", "Naikki");
        assert!(!t.parsed);
        assert_eq!(t.korean_a, vec!["Nike"]);
        assert_eq!(t.korean_b, vec!["Naikki"]);
    }
}
