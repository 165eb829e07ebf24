//! Best-effort recovery of JSON objects from model output.
//!
//! Model replies often wrap JSON in code fences, surround it with prose, or
//! use the wrong quote characters. A [`RecoveryChain`] tries an ordered list
//! of [`Strategy`] values against the brace-delimited span of the reply and
//! returns the first object that parses.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

static CODE_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"```json\s*|```\s*").ok());

static QUOTED_ITEM: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).ok());

/// One parsing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `serde_json` on the span as-is.
    Strict,
    /// Unescape `\"` and turn single quotes into double quotes, then parse.
    QuoteNormalized,
    /// Pull each named array of quoted strings out with a regex. Succeeds
    /// only when every field is found.
    ListFields(&'static [&'static str]),
}

impl Strategy {
    fn apply(&self, span: &str) -> Option<Value> {
        match self {
            Strategy::Strict => parse_object(span),
            Strategy::QuoteNormalized => {
                let fixed = span.replace("\\\"", "\"").replace('\'', "\"");
                parse_object(&fixed)
            }
            Strategy::ListFields(fields) => extract_list_fields(span, fields),
        }
    }
}

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn extract_list_fields(span: &str, fields: &[&str]) -> Option<Value> {
    let item = QUOTED_ITEM.as_ref()?;
    let mut object = Map::new();
    for field in fields {
        let pattern = format!(r#""{}"\s*:\s*\[([^\]]+)\]"#, regex::escape(field));
        let list = Regex::new(&pattern).ok()?;
        let body = list.captures(span)?.get(1)?.as_str();
        let items: Vec<Value> = item
            .captures_iter(body)
            .filter_map(|c| c.get(1))
            .map(|m| Value::String(m.as_str().to_string()))
            .collect();
        object.insert((*field).to_string(), Value::Array(items));
    }
    Some(Value::Object(object))
}

/// Remove markdown code fences.
pub fn strip_fences(text: &str) -> String {
    match CODE_FENCE.as_ref() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

/// Text from the first `{` to the last `}` inclusive.
pub fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Ordered parser strategies tried until one succeeds.
#[derive(Debug, Clone)]
pub struct RecoveryChain {
    strategies: Vec<Strategy>,
}

impl Default for RecoveryChain {
    fn default() -> Self {
        Self::new([Strategy::Strict, Strategy::QuoteNormalized])
    }
}

impl RecoveryChain {
    pub fn new(strategies: impl IntoIterator<Item = Strategy>) -> Self {
        Self {
            strategies: strategies.into_iter().collect(),
        }
    }

    /// Default chain followed by regex extraction of `fields`.
    pub fn with_list_fields(fields: &'static [&'static str]) -> Self {
        let mut chain = Self::default();
        chain.strategies.push(Strategy::ListFields(fields));
        chain
    }

    pub fn recover(&self, raw: &str) -> Option<Value> {
        let cleaned = strip_fences(raw);
        let span = brace_span(&cleaned)?;
        for strategy in &self.strategies {
            if let Some(value) = strategy.apply(span) {
                debug!(?strategy, "recovered JSON object");
                return Some(value);
            }
        }
        None
    }

    /// Judgment capabilities usually answer with an object already; some
    /// backends hand back the raw text instead.
    pub fn recover_value(&self, value: Value) -> Option<Value> {
        match value {
            Value::Object(_) => Some(value),
            Value::String(text) => self.recover(&text),
            _ => None,
        }
    }
}
