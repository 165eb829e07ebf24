//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryVectorStore` and `MemoryRiskSink` that satisfy the trait
//! contracts without any external dependencies.

use std::cmp::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::records::{
    cosine_similarity, passage_score, CasePassage, InfringementRiskRecord, PassageTopic,
    RefusalMatch, RefusalRecord, ScoredPassage,
};
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryVectorStore
// ---------------------------------------------------------------------------

/// Brute-force vector store over in-memory refusal records and passages.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    refusals: Mutex<Vec<RefusalRecord>>,
    passages: Mutex<Vec<CasePassage>>,
    fail_searches: Mutex<bool>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_refusals(self, records: impl IntoIterator<Item = RefusalRecord>) -> Self {
        self.refusals.lock().unwrap().extend(records);
        self
    }

    pub fn with_passages(self, passages: impl IntoIterator<Item = CasePassage>) -> Self {
        self.passages.lock().unwrap().extend(passages);
        self
    }

    /// Make every subsequent search fail with a backend error.
    pub fn fail_searches(&self, fail: bool) {
        *self.fail_searches.lock().unwrap() = fail;
    }

    fn check_available(&self) -> StorageResult<()> {
        if *self.fail_searches.lock().unwrap() {
            return Err(StorageError::Backend("search unavailable".into()));
        }
        Ok(())
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[async_trait]
impl VectorSearch for MemoryVectorStore {
    async fn refusal_precedents(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> StorageResult<Vec<RefusalMatch>> {
        self.check_available()?;
        let refusals = self.refusals.lock().unwrap();
        let mut hits: Vec<RefusalMatch> = refusals
            .iter()
            .filter_map(|r| cosine_similarity(query_vector, &r.embedding).map(|s| r.to_match(s)))
            .collect();
        hits.sort_by(|a, b| descending(a.similarity, b.similarity));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn case_precedents(&self, query: &CaseQuery) -> StorageResult<Vec<ScoredPassage>> {
        self.check_available()?;
        let passages = self.passages.lock().unwrap();
        let rank = |topic: PassageTopic, limit: usize| {
            let mut pool: Vec<ScoredPassage> = passages
                .iter()
                .filter(|p| p.topic == topic)
                .filter_map(|p| {
                    let similarity = cosine_similarity(&query.query_vector, &p.embedding)?;
                    let score = passage_score(
                        similarity,
                        p,
                        &query.target_pattern,
                        query.pattern_boost,
                        query.citation_penalty,
                    );
                    Some(p.to_scored(score))
                })
                .collect();
            pool.sort_by(|a, b| descending(a.score, b.score));
            pool.truncate(limit);
            pool
        };
        let mut results = rank(PassageTopic::Doctrinal, query.doctrinal_limit);
        results.extend(rank(PassageTopic::Factual, query.factual_limit));
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// MemoryRiskSink
// ---------------------------------------------------------------------------

/// Risk sink that keeps every persisted record in insertion order.
#[derive(Debug, Default)]
pub struct MemoryRiskSink {
    records: Mutex<Vec<InfringementRiskRecord>>,
    fail_writes: Mutex<bool>,
}

impl MemoryRiskSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    /// Snapshot of all records written so far.
    pub fn records(&self) -> Vec<InfringementRiskRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RiskSink for MemoryRiskSink {
    async fn persist_risk(&self, record: InfringementRiskRecord) -> StorageResult<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StorageError::Backend("write rejected".into()));
        }
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}
