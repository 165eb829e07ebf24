//! Storage trait definitions for MarkGuard
//!
//! These traits define the two storage seams the analysis core depends on:
//! - `VectorSearch`: similarity lookups over refusal decisions and case law
//! - `RiskSink`: persistence of graded candidate marks
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::records::{InfringementRiskRecord, RefusalMatch, ScoredPassage};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Parameters of one hybrid case-law lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseQuery {
    pub query_vector: Vec<f32>,
    /// Target category pattern, three letters from `H`/`M`/`L`.
    pub target_pattern: String,
    /// Maximum passages drawn from the doctrinal pool.
    pub doctrinal_limit: usize,
    /// Maximum passages drawn from the factual pool.
    pub factual_limit: usize,
    /// Multiplier for passages whose category tag equals `target_pattern`.
    pub pattern_boost: f64,
    /// Multiplier for factual passages that read like citation boilerplate.
    pub citation_penalty: f64,
}

impl CaseQuery {
    pub fn new(
        query_vector: Vec<f32>,
        target_pattern: impl Into<String>,
        doctrinal_limit: usize,
        factual_limit: usize,
    ) -> Self {
        Self {
            query_vector,
            target_pattern: target_pattern.into(),
            doctrinal_limit,
            factual_limit,
            pattern_boost: 1.2,
            citation_penalty: 0.5,
        }
    }

    pub fn with_weights(mut self, pattern_boost: f64, citation_penalty: f64) -> Self {
        self.pattern_boost = pattern_boost;
        self.citation_penalty = citation_penalty;
        self
    }
}

/// Similarity search over indexed refusal decisions and case law.
///
/// Guarantees:
/// - Results are ordered by descending similarity (or score).
/// - `refusal_precedents` returns at most `top_k` records.
/// - `case_precedents` returns at most `doctrinal_limit` doctrinal passages
///   followed by at most `factual_limit` factual passages, each pool ranked
///   independently.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Refusal decisions closest to `query_vector` by cosine similarity.
    async fn refusal_precedents(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> StorageResult<Vec<RefusalMatch>>;

    /// Case-law passages ranked by [`crate::passage_score`].
    async fn case_precedents(&self, query: &CaseQuery) -> StorageResult<Vec<ScoredPassage>>;
}

/// Write path for graded candidate marks.
#[async_trait]
pub trait RiskSink: Send + Sync {
    /// Persist one graded pair.
    async fn persist_risk(&self, record: InfringementRiskRecord) -> StorageResult<()>;
}
