//! Record types exchanged with the vector store.
//!
//! Stored documents carry their embedding; search results carry a score
//! instead. Both shapes are flat so backends can map them to rows directly.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Factual passages that read like citation boilerplate rather than facts.
static CITATION_BOILERPLATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"대법원|판결|선고|제[0-9]+조").ok());

/// A prior refusal decision indexed for similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefusalRecord {
    pub patent_id: String,
    pub content: String,
    pub reason_tags: String,
    pub product_tags: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// A refusal decision returned by [`crate::VectorSearch::refusal_precedents`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefusalMatch {
    pub patent_id: String,
    pub content: String,
    pub reason_tags: String,
    pub product_tags: String,
    pub similarity: f64,
}

impl RefusalRecord {
    pub fn to_match(&self, similarity: f64) -> RefusalMatch {
        RefusalMatch {
            patent_id: self.patent_id.clone(),
            content: self.content.clone(),
            reason_tags: self.reason_tags.clone(),
            product_tags: self.product_tags.clone(),
            similarity,
        }
    }
}

/// Which pool a case-law passage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassageTopic {
    /// Statements of legal doctrine.
    Doctrinal,
    /// Narrative of the facts of a case.
    Factual,
}

impl PassageTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassageTopic::Doctrinal => "doctrinal",
            PassageTopic::Factual => "factual",
        }
    }
}

/// A chunk of a court decision indexed for similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasePassage {
    pub precedent_no: String,
    pub case_id: String,
    pub chunk_index: u32,
    pub topic: PassageTopic,
    /// Three-letter category tag (conceptual, visual, phonetic), e.g. `HML`.
    pub category_pattern: String,
    pub file_name: Option<String>,
    pub start_page: Option<String>,
    pub content: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// A passage returned by [`crate::VectorSearch::case_precedents`], already
/// boosted or penalised by [`passage_score`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub precedent_no: String,
    pub case_id: String,
    pub chunk_index: u32,
    pub topic: PassageTopic,
    pub category_pattern: String,
    pub file_name: Option<String>,
    pub start_page: Option<String>,
    pub content: String,
    pub score: f64,
}

impl ScoredPassage {
    /// Composite identity used to deduplicate results across queries.
    pub fn unique_key(&self) -> String {
        format!("{}_{}", self.case_id, self.chunk_index)
    }
}

impl CasePassage {
    pub fn to_scored(&self, score: f64) -> ScoredPassage {
        ScoredPassage {
            precedent_no: self.precedent_no.clone(),
            case_id: self.case_id.clone(),
            chunk_index: self.chunk_index,
            topic: self.topic,
            category_pattern: self.category_pattern.clone(),
            file_name: self.file_name.clone(),
            start_page: self.start_page.clone(),
            content: self.content.clone(),
            score,
        }
    }
}

/// A graded candidate mark, written once per analysed pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfringementRiskRecord {
    pub protected_registration_no: String,
    pub candidate_no: String,
    pub candidate_name: String,
    pub candidate_kind: String,
    pub candidate_class_codes: String,
    pub product_name: String,
    pub product_page_url: String,
    pub manufacturer: String,
    pub brand: String,
    pub category_large: String,
    pub category_medium: String,
    pub category_small: String,
    pub visual_score: f64,
    pub visual_weight: f64,
    pub phonetic_score: f64,
    pub phonetic_weight: f64,
    pub conceptual_score: f64,
    pub conceptual_weight: f64,
    pub total_score: f64,
    pub risk_level: String,
    pub collected_at: Option<DateTime<Utc>>,
    pub judged_at: DateTime<Utc>,
}

impl InfringementRiskRecord {
    /// Stable key for one (protected, candidate) pair.
    pub fn pair_key(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.protected_registration_no.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(self.candidate_no.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Cosine similarity of two vectors.
///
/// Returns `None` when the vectors differ in length, are empty, or one of
/// them has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Ranking score of one passage for a query.
///
/// `similarity` is multiplied by `pattern_boost` when the passage's category
/// tag equals the query's target pattern; factual passages that look like
/// citation boilerplate are further multiplied by `citation_penalty`.
pub fn passage_score(
    similarity: f64,
    passage: &CasePassage,
    target_pattern: &str,
    pattern_boost: f64,
    citation_penalty: f64,
) -> f64 {
    let mut score = similarity;
    if passage.category_pattern == target_pattern {
        score *= pattern_boost;
    }
    if passage.topic == PassageTopic::Factual && looks_like_citation(&passage.content) {
        score *= citation_penalty;
    }
    score
}

fn looks_like_citation(content: &str) -> bool {
    CITATION_BOILERPLATE
        .as_ref()
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}
