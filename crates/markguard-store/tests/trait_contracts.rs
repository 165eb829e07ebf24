//! Trait contract tests for VectorSearch and RiskSink.
//!
//! The same contract runs against the in-memory fakes and the SurrealDB
//! store (in-memory engine). Any conforming implementation must pass these.

use chrono::Utc;
use markguard_store::fakes::{MemoryRiskSink, MemoryVectorStore};
use markguard_store::storage_traits::*;
use markguard_store::{
    CasePassage, InfringementRiskRecord, PassageTopic, RefusalRecord, StorageError,
    SurrealMarkStore,
};

fn refusal(id: &str, embedding: Vec<f32>) -> RefusalRecord {
    RefusalRecord {
        patent_id: id.to_string(),
        content: format!("refusal {id}"),
        reason_tags: "descriptive".to_string(),
        product_tags: "cosmetics".to_string(),
        embedding,
    }
}

fn passage(
    case_id: &str,
    chunk: u32,
    topic: PassageTopic,
    pattern: &str,
    content: &str,
    embedding: Vec<f32>,
) -> CasePassage {
    CasePassage {
        precedent_no: format!("{case_id}-{chunk}"),
        case_id: case_id.to_string(),
        chunk_index: chunk,
        topic,
        category_pattern: pattern.to_string(),
        file_name: Some(format!("{case_id}.pdf")),
        start_page: Some("3".to_string()),
        content: content.to_string(),
        embedding,
    }
}

fn refusals() -> Vec<RefusalRecord> {
    vec![
        refusal("r-far", vec![0.0, 1.0]),
        refusal("r-near", vec![1.0, 0.1]),
        refusal("r-mid", vec![1.0, 1.0]),
        refusal("r-odd-dim", vec![1.0, 0.0, 0.0]),
    ]
}

fn passages() -> Vec<CasePassage> {
    vec![
        passage("2019후1", 0, PassageTopic::Doctrinal, "HML", "유사 판단의 법리", vec![1.0, 0.0]),
        passage("2019후2", 0, PassageTopic::Doctrinal, "LLL", "요부 관찰의 법리", vec![1.0, 0.0]),
        passage("2019후3", 1, PassageTopic::Doctrinal, "LLL", "전체 관찰", vec![0.0, 1.0]),
        passage("2020후1", 0, PassageTopic::Factual, "LLL", "원고는 화장품을 판매", vec![1.0, 0.0]),
        passage("2020후2", 0, PassageTopic::Factual, "LLL", "대법원 2001. 선고", vec![1.0, 0.0]),
    ]
}

fn risk_record(candidate_no: &str, level: &str) -> InfringementRiskRecord {
    InfringementRiskRecord {
        protected_registration_no: "40-0001".to_string(),
        candidate_no: candidate_no.to_string(),
        candidate_name: "마크가드".to_string(),
        candidate_kind: "text".to_string(),
        candidate_class_codes: "03".to_string(),
        product_name: "hand cream".to_string(),
        product_page_url: "https://shop.example/p/1".to_string(),
        manufacturer: "acme".to_string(),
        brand: "acme".to_string(),
        category_large: "beauty".to_string(),
        category_medium: "skin".to_string(),
        category_small: "cream".to_string(),
        visual_score: 0.9,
        visual_weight: 0.8,
        phonetic_score: 0.7,
        phonetic_weight: 0.6,
        conceptual_score: 0.5,
        conceptual_weight: 0.4,
        total_score: 0.9,
        risk_level: level.to_string(),
        collected_at: None,
        judged_at: Utc::now(),
    }
}

async fn surreal_store() -> SurrealMarkStore {
    let store = SurrealMarkStore::in_memory().await.unwrap();
    for r in refusals() {
        store.insert_refusal(r).await.unwrap();
    }
    for p in passages() {
        store.insert_passage(p).await.unwrap();
    }
    store
}

fn memory_store() -> MemoryVectorStore {
    MemoryVectorStore::new()
        .with_refusals(refusals())
        .with_passages(passages())
}

// ===========================================================================
// VectorSearch contract
// ===========================================================================

async fn assert_refusals_ranked(search: &dyn VectorSearch) {
    let hits = search.refusal_precedents(&[1.0, 0.0], 2).await.unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.patent_id.as_str()).collect();
    assert_eq!(ids, vec!["r-near", "r-mid"]);
    assert!(hits[0].similarity >= hits[1].similarity);
}

async fn assert_pools_split_and_scored(search: &dyn VectorSearch) {
    let query = CaseQuery::new(vec![1.0, 0.0], "HML", 2, 2);
    let hits = search.case_precedents(&query).await.unwrap();

    assert_eq!(hits.len(), 4);
    assert!(hits[..2].iter().all(|h| h.topic == PassageTopic::Doctrinal));
    assert!(hits[2..].iter().all(|h| h.topic == PassageTopic::Factual));

    // Pattern match lifts 2019후1 above the otherwise equal 2019후2.
    assert_eq!(hits[0].case_id, "2019후1");
    assert!((hits[0].score - 1.2).abs() < 1e-6);
    assert!((hits[1].score - 1.0).abs() < 1e-6);

    // Citation boilerplate is halved.
    assert_eq!(hits[2].case_id, "2020후1");
    assert_eq!(hits[3].case_id, "2020후2");
    assert!((hits[3].score - 0.5).abs() < 1e-6);
}

async fn assert_zero_limits_return_nothing(search: &dyn VectorSearch) {
    let query = CaseQuery::new(vec![1.0, 0.0], "HML", 0, 0);
    assert!(search.case_precedents(&query).await.unwrap().is_empty());
}

#[tokio::test]
async fn memory_refusals_ranked_by_similarity() {
    assert_refusals_ranked(&memory_store()).await;
}

#[tokio::test]
async fn memory_case_pools_split_and_scored() {
    assert_pools_split_and_scored(&memory_store()).await;
}

#[tokio::test]
async fn memory_zero_limits() {
    assert_zero_limits_return_nothing(&memory_store()).await;
}

#[tokio::test]
async fn surreal_refusals_ranked_by_similarity() {
    assert_refusals_ranked(&surreal_store().await).await;
}

#[tokio::test]
async fn surreal_case_pools_split_and_scored() {
    assert_pools_split_and_scored(&surreal_store().await).await;
}

#[tokio::test]
async fn surreal_zero_limits() {
    assert_zero_limits_return_nothing(&surreal_store().await).await;
}

#[tokio::test]
async fn surreal_rejects_empty_query_vector() {
    let store = surreal_store().await;
    let err = store.refusal_precedents(&[], 5).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidVector { .. }));
}

#[tokio::test]
async fn memory_store_failure_surfaces_backend_error() {
    let store = memory_store();
    store.fail_searches(true);
    let err = store.refusal_precedents(&[1.0, 0.0], 3).await.unwrap_err();
    assert!(matches!(err, StorageError::Backend(_)));
}

// ===========================================================================
// RiskSink contract
// ===========================================================================

#[tokio::test]
async fn memory_sink_keeps_records_in_order() {
    let sink = MemoryRiskSink::new();
    sink.persist_risk(risk_record("1", "H")).await.unwrap();
    sink.persist_risk(risk_record("2", "L")).await.unwrap();

    let levels: Vec<String> = sink.records().into_iter().map(|r| r.risk_level).collect();
    assert_eq!(levels, vec!["H", "L"]);
}

#[tokio::test]
async fn memory_sink_failure_is_reported() {
    let sink = MemoryRiskSink::new();
    sink.fail_writes(true);
    assert!(sink.persist_risk(risk_record("1", "H")).await.is_err());
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn surreal_sink_upserts_by_pair() {
    let store = SurrealMarkStore::in_memory().await.unwrap();
    store.persist_risk(risk_record("1", "M")).await.unwrap();
    store.persist_risk(risk_record("1", "H")).await.unwrap();
    store.persist_risk(risk_record("2", "L")).await.unwrap();

    let rows = store.risks_for("40-0001").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].candidate_no, "1");
    assert_eq!(rows[0].risk_level, "H");
    assert_eq!(rows[1].risk_level, "L");
}
