//! Behaviour of the scripted capability fakes the core tests rely on.

use std::time::Duration;

use markguard_llm::fakes::{HashEmbedder, ScriptedGenerator, ScriptedJudge, StaticCaseLaw};
use markguard_llm::{
    CaseLawSearch, CaseRecord, Embedder, GenerationRequest, Generator, Judge, JudgmentRequest,
    LlmError, PromptTask,
};
use serde_json::json;

fn gen_request(task: PromptTask) -> GenerationRequest {
    GenerationRequest::new(task, "system", "user")
}

#[tokio::test]
async fn generator_consumes_queue_then_standing_reply() {
    let generator = ScriptedGenerator::new()
        .respond(PromptTask::ReportDrafting, "first")
        .always(PromptTask::ReportDrafting, "again");

    let a = generator.generate(gen_request(PromptTask::ReportDrafting)).await.unwrap();
    let b = generator.generate(gen_request(PromptTask::ReportDrafting)).await.unwrap();
    let c = generator.generate(gen_request(PromptTask::ReportDrafting)).await.unwrap();

    assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("first", "again", "again"));
    assert_eq!(generator.calls(PromptTask::ReportDrafting), 3);
}

#[tokio::test]
async fn generator_without_script_is_exhausted() {
    let generator = ScriptedGenerator::new().fail(PromptTask::Transliteration);
    let failed = generator.generate(gen_request(PromptTask::Transliteration)).await;
    assert!(matches!(failed, Err(LlmError::Http(_))));
    let exhausted = generator.generate(gen_request(PromptTask::Transliteration)).await;
    assert!(matches!(exhausted, Err(LlmError::Exhausted(_))));
}

#[tokio::test(start_paused = true)]
async fn generator_delay_is_applied() {
    let generator = ScriptedGenerator::new()
        .always(PromptTask::ConceptualCaption, "a cat")
        .delay(PromptTask::ConceptualCaption, Duration::from_secs(5));
    let started = tokio::time::Instant::now();
    generator
        .generate(gen_request(PromptTask::ConceptualCaption))
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test]
async fn judge_returns_scripted_values() {
    let judge = ScriptedJudge::new().respond(PromptTask::ReportEvaluation, json!({"score": 91}));
    let request = JudgmentRequest::new(PromptTask::ReportEvaluation, "s", "u", "eval", json!({}));
    assert_eq!(judge.judge(request).await.unwrap()["score"], 91);
    assert_eq!(judge.requests()[0].schema_name, "eval");
}

#[tokio::test]
async fn hash_embedder_is_deterministic_with_overrides() {
    let embedder = HashEmbedder::new(4)
        .with("pinned", vec![1.0, 0.0, 0.0, 0.0])
        .failing_on("broken");

    let a = embedder.embed("same text").await.unwrap();
    let b = embedder.embed("same text").await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 4);
    assert_eq!(embedder.embed("pinned").await.unwrap(), vec![1.0, 0.0, 0.0, 0.0]);
    assert!(embedder.embed("broken").await.is_err());
    assert_eq!(embedder.embedded().len(), 4);
}

#[tokio::test]
async fn static_case_law_lists_and_fetches() {
    let record = CaseRecord {
        serial_no: "11".into(),
        case_number: Some("2019후1".into()),
        case_name: Some("등록무효".into()),
        holding_summary: Some("요지".into()),
        issues: None,
        full_text: None,
    };
    let law = StaticCaseLaw::new().with_case(record.clone()).with_orphan_id("99");

    let ids = law.search_ids(&["상표".to_string()], 5).await.unwrap();
    assert_eq!(ids, vec!["11", "99"]);
    assert_eq!(law.fetch_case("11").await.unwrap(), Some(record));
    assert_eq!(law.fetch_case("99").await.unwrap(), None);
    assert_eq!(law.searches(), vec![vec!["상표".to_string()]]);

    law.fail_search(true);
    assert!(law.search_ids(&[], 5).await.is_err());
}
