//! Hybrid case-law retrieval.

use std::collections::HashMap;

use futures::future::join_all;
use markguard_llm::Embedder;
use markguard_store::{CaseQuery, ScoredPassage, VectorSearch};
use tracing::{info, warn};

use crate::config::PrecedentConfig;
use crate::domain::{Factors, Precedent};

fn level(score: f64) -> char {
    if score >= 0.8 {
        'H'
    } else if score >= 0.4 {
        'M'
    } else {
        'L'
    }
}

/// Three-letter category pattern in conceptual, visual, phonetic order.
pub fn target_pattern(scores: &Factors<f64>) -> String {
    [scores.conceptual, scores.visual, scores.phonetic]
        .into_iter()
        .map(level)
        .collect()
}

/// Keep the best-scoring passage per `case_id` and chunk, highest first,
/// at most `top_k`.
pub fn merge_passages(passages: Vec<ScoredPassage>, top_k: usize) -> Vec<Precedent> {
    let mut best: HashMap<String, ScoredPassage> = HashMap::new();
    for passage in passages {
        let key = passage.unique_key();
        match best.get(&key) {
            Some(existing) if existing.score >= passage.score => {}
            _ => {
                best.insert(key, passage);
            }
        }
    }
    let mut ranked: Vec<ScoredPassage> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.unique_key().cmp(&b.unique_key()))
    });
    ranked.truncate(top_k);
    ranked.into_iter().map(Precedent::from).collect()
}

/// Run every query against both passage pools concurrently and merge the
/// results. Queries whose embedding or search fails are skipped.
pub async fn retrieve(
    embedder: &dyn Embedder,
    vectors: &dyn VectorSearch,
    queries: &[String],
    scores: &Factors<f64>,
    config: &PrecedentConfig,
) -> Vec<Precedent> {
    let pattern = target_pattern(scores);
    let (doctrinal_limit, factual_limit) = config.pool_split();
    info!(%pattern, doctrinal_limit, factual_limit, "retrieving precedents");

    let searches = queries.iter().map(|query| {
        let pattern = pattern.clone();
        async move {
            let vector = match embedder.embed(query).await {
                Ok(v) => v,
                Err(err) => {
                    warn!(%query, error = %err, "precedent query embedding failed");
                    return Vec::new();
                }
            };
            let case_query = CaseQuery::new(vector, pattern, doctrinal_limit, factual_limit)
                .with_weights(config.pattern_boost, config.citation_penalty);
            match vectors.case_precedents(&case_query).await {
                Ok(passages) => passages,
                Err(err) => {
                    warn!(%query, error = %err, "precedent search failed");
                    Vec::new()
                }
            }
        }
    });
    let found: Vec<ScoredPassage> = join_all(searches).await.into_iter().flatten().collect();

    let initial = found.len();
    let merged = merge_passages(found, config.top_k);
    info!(initial, kept = merged.len(), "precedents retrieved");
    merged
}
