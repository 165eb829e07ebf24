//! Precedent loop pieces against the in-memory collaborators.

use markguard_core::precedent::{
    generate_queries, grade, retrieve, search_case_law, GradingOutcome, RetryBudget,
    EMPTY_RESULT_FEEDBACK,
};
use markguard_core::{Factors, MarkKind, Precedent, PrecedentConfig, ProtectedMark, RiskResult};
use markguard_llm::fakes::{HashEmbedder, ScriptedJudge, StaticCaseLaw};
use markguard_llm::{CaseRecord, PromptTask};
use markguard_store::fakes::MemoryVectorStore;
use markguard_store::{CasePassage, PassageTopic};
use serde_json::json;

fn budget(rewrites: u32, web_searches: u32) -> RetryBudget {
    RetryBudget {
        rewrites,
        max_rewrite: 3,
        web_searches,
        max_web_search: 3,
    }
}

fn passage(case_id: &str, chunk: u32, topic: PassageTopic, pattern: &str, v: Vec<f32>) -> CasePassage {
    CasePassage {
        precedent_no: format!("prec-{case_id}"),
        case_id: case_id.into(),
        chunk_index: chunk,
        topic,
        category_pattern: pattern.into(),
        file_name: None,
        start_page: None,
        content: format!("{case_id} 판결 {chunk}"),
        embedding: v,
    }
}

fn protected() -> ProtectedMark {
    ProtectedMark {
        registration_no: "40-1".into(),
        name: "마크가드".into(),
        kind: MarkKind::Text,
        class_codes: String::new(),
        image: None,
        image_vector: vec![],
        owner_no: None,
        product_kinds: "소프트웨어".into(),
    }
}

#[tokio::test]
async fn spent_budgets_approve_without_asking_the_judge() {
    let judge = ScriptedJudge::new();
    let found = vec![Precedent::new("p-1", "본문")];

    let outcome = grade(&judge, "ctx", &["q".into()], &found, budget(3, 3)).await;

    assert_eq!(
        outcome,
        GradingOutcome::Approved {
            refined: vec![Precedent::new("p-1", "본문").marked_relevant()],
            forced: true,
        }
    );
    assert_eq!(judge.calls(PromptTask::PrecedentGrading), 0);
}

#[tokio::test]
async fn empty_retrieval_asks_for_a_rewrite_first() {
    let judge = ScriptedJudge::new();
    let outcome = grade(&judge, "ctx", &["q".into()], &[], budget(0, 0)).await;
    assert_eq!(
        outcome,
        GradingOutcome::Rewrite {
            feedback: EMPTY_RESULT_FEEDBACK.into()
        }
    );
}

#[tokio::test]
async fn failed_judgment_approves_nothing() {
    let judge = ScriptedJudge::new().fail(PromptTask::PrecedentGrading);
    let found = vec![Precedent::new("p-1", "본문")];
    let outcome = grade(&judge, "ctx", &["q".into()], &found, budget(0, 0)).await;
    assert_eq!(
        outcome,
        GradingOutcome::Approved {
            refined: vec![],
            forced: false
        }
    );
}

#[tokio::test]
async fn web_search_payload_string_becomes_keyword_list() {
    let judge = ScriptedJudge::new().respond(
        PromptTask::PrecedentGrading,
        json!({ "decision": "web_search", "feedback_or_query": "상표 호칭 유사" }),
    );
    let found = vec![Precedent::new("p-1", "본문")];
    let outcome = grade(&judge, "ctx", &["q".into()], &found, budget(1, 0)).await;
    assert_eq!(
        outcome,
        GradingOutcome::WebSearch {
            keywords: vec!["상표 호칭 유사".into()]
        }
    );
}

#[tokio::test]
async fn retrieval_boosts_matching_pattern_and_dedups_across_queries() {
    let store = MemoryVectorStore::new().with_passages([
        passage("A", 0, PassageTopic::Doctrinal, "LLL", vec![1.0, 0.0]),
        passage("B", 0, PassageTopic::Doctrinal, "HHH", vec![0.9, 0.1]),
        passage("C", 0, PassageTopic::Factual, "LLL", vec![0.0, 1.0]),
    ]);
    let embedder = HashEmbedder::new(2)
        .with("첫째", vec![1.0, 0.0])
        .with("둘째", vec![1.0, 0.0])
        .failing_on("실패");
    let queries = vec!["첫째".to_string(), "실패".to_string(), "둘째".to_string()];

    let found = retrieve(
        &embedder,
        &store,
        &queries,
        &Factors::new(0.9, 0.9, 0.9),
        &PrecedentConfig::default(),
    )
    .await;

    let ids: Vec<&str> = found.iter().filter_map(|p| p.case_id.as_deref()).collect();
    assert_eq!(ids, vec!["B", "A", "C"]);
    assert!(found.iter().all(|p| !p.is_relevant));
    assert_eq!(embedder.embedded().len(), 3);
}

#[tokio::test]
async fn unavailable_store_yields_no_precedents() {
    let store = MemoryVectorStore::new()
        .with_passages([passage("A", 0, PassageTopic::Doctrinal, "HHH", vec![1.0])]);
    store.fail_searches(true);
    let found = retrieve(
        &HashEmbedder::new(1),
        &store,
        &["q".to_string()],
        &Factors::default(),
        &PrecedentConfig::default(),
    )
    .await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn web_search_drops_unknown_and_bodiless_cases() {
    let case_law = StaticCaseLaw::new()
        .with_case(CaseRecord {
            serial_no: "1".into(),
            case_number: Some("2021후100".into()),
            case_name: Some("등록무효".into()),
            holding_summary: None,
            issues: None,
            full_text: Some("전문 본문".into()),
        })
        .with_case(CaseRecord {
            serial_no: "2".into(),
            case_number: None,
            case_name: None,
            holding_summary: None,
            issues: None,
            full_text: None,
        })
        .with_orphan_id("3");

    let found = search_case_law(&case_law, &["상표".into()], 5).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].precedent_no, "1");
    assert_eq!(found[0].content, "전문 본문");

    assert!(search_case_law(&case_law, &[], 5).await.is_empty());
    assert_eq!(case_law.searches().len(), 1);

    case_law.fail_search(true);
    assert!(search_case_law(&case_law, &["상표".into()], 5).await.is_empty());
}

#[tokio::test]
async fn query_drafting_falls_back_to_the_mark_name() {
    let risk = RiskResult::fail_safe();
    let judge = ScriptedJudge::new()
        .respond(PromptTask::PrecedentQueries, json!({ "queries": [] }))
        .respond(PromptTask::PrecedentQueries, json!({ "queries": ["  ", "호칭 유사 판례"] }));

    let fallback = generate_queries(&judge, &protected(), &risk, None).await;
    assert_eq!(fallback, vec!["마크가드".to_string()]);

    let drafted = generate_queries(&judge, &protected(), &risk, Some("피드백")).await;
    assert_eq!(drafted, vec!["호칭 유사 판례".to_string()]);
    assert!(judge.requests()[1].user_prompt.contains("피드백"));

    let exhausted = generate_queries(&judge, &protected(), &risk, None).await;
    assert_eq!(exhausted, vec!["마크가드".to_string()]);
}

#[tokio::test]
async fn fenced_grading_reply_is_recovered() {
    let judge = ScriptedJudge::new().respond(
        PromptTask::PrecedentGrading,
        json!("```json\n{\"decision\": \"approve\", \"approved_indices\": [0]}\n```"),
    );
    let found = vec![Precedent::new("p-1", "본문")];

    let outcome = grade(&judge, "ctx", &["q".into()], &found, budget(0, 0)).await;

    assert_eq!(
        outcome,
        GradingOutcome::Approved {
            refined: vec![Precedent::new("p-1", "본문").marked_relevant()],
            forced: false,
        }
    );
}

struct SlowEmbedder;

#[async_trait::async_trait]
impl markguard_llm::Embedder for SlowEmbedder {
    async fn embed(&self, _text: &str) -> markguard_llm::LlmResult<Vec<f32>> {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        Ok(vec![1.0])
    }
}

#[tokio::test(start_paused = true)]
async fn retrieval_runs_queries_concurrently() {
    let store = MemoryVectorStore::new()
        .with_passages([passage("A", 0, PassageTopic::Doctrinal, "HHH", vec![1.0])]);
    let queries: Vec<String> = ["가", "나", "다"].iter().map(|q| q.to_string()).collect();

    let started = tokio::time::Instant::now();
    let found = retrieve(
        &SlowEmbedder,
        &store,
        &queries,
        &Factors::default(),
        &PrecedentConfig::default(),
    )
    .await;

    assert_eq!(found.len(), 1);
    assert!(started.elapsed() < std::time::Duration::from_millis(250));
}
