//! Report drafting and review.

use std::sync::LazyLock;

use markguard_llm::{GenerationRequest, Generator, Judge, JudgmentRequest, PromptTask};
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::domain::{EvaluationResult, Precedent};
use crate::prompts;
use crate::recovery::RecoveryChain;

/// Report text recorded when drafting fails.
pub const REPORT_FAILURE_TEXT: &str = "보고서 생성 실패: 시스템 오류가 발생했습니다.";

static THINK_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").ok());

static CHAT_TOKEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<\|im_(?:start|end)\|>").ok());

/// Remove reasoning blocks and chat special tokens from a model reply.
pub fn strip_reasoning_markup(text: &str) -> String {
    let mut cleaned = text.to_string();
    for re in [&*THINK_BLOCK, &*CHAT_TOKEN].into_iter().flatten() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    let trimmed = cleaned.trim_start();
    let body = match trimmed.strip_prefix("assistant") {
        Some(rest) if rest.starts_with('\n') || rest.starts_with("\r\n") => rest,
        _ => trimmed,
    };
    body.trim().to_string()
}

/// Precedents the report should cite: the graded ones, or everything
/// retrieved when grading kept none.
pub fn report_precedents<'a>(refined: &'a [Precedent], retrieved: &'a [Precedent]) -> &'a [Precedent] {
    if refined.is_empty() {
        retrieved
    } else {
        refined
    }
}

/// Draft the report. A failed call yields [`REPORT_FAILURE_TEXT`].
#[instrument(skip_all, fields(precedents = precedents.len(), revision = feedback.is_some()))]
pub async fn generate_report(
    generator: &dyn Generator,
    common_context: &str,
    precedents: &[Precedent],
    feedback: Option<&str>,
) -> String {
    let request = GenerationRequest::new(
        PromptTask::ReportDrafting,
        prompts::REPORT_DRAFTING_SYSTEM,
        prompts::report_drafting_user(common_context, precedents, feedback),
    );
    match generator.generate(request).await {
        Ok(reply) => {
            let report = strip_reasoning_markup(&reply);
            info!(chars = report.chars().count(), "report drafted");
            report
        }
        Err(err) => {
            warn!(error = %err, "report drafting failed");
            REPORT_FAILURE_TEXT.to_string()
        }
    }
}

/// Review a drafted report. Any failure yields [`EvaluationResult::failed`].
#[instrument(skip_all)]
pub async fn evaluate_report(
    judge: &dyn Judge,
    common_context: &str,
    precedents: &[Precedent],
    report: &str,
) -> EvaluationResult {
    let request = JudgmentRequest::new(
        PromptTask::ReportEvaluation,
        prompts::REPORT_EVALUATION_SYSTEM,
        prompts::report_evaluation_user(common_context, precedents, report),
        "report_evaluation",
        EvaluationResult::schema(),
    );
    let parsed = match judge.judge(request).await {
        Ok(value) => RecoveryChain::default()
            .recover_value(value)
            .and_then(|v| serde_json::from_value::<EvaluationResult>(v).ok()),
        Err(err) => {
            warn!(error = %err, "report evaluation failed");
            None
        }
    };
    match parsed {
        Some(evaluation) => {
            info!(score = evaluation.score, decision = ?evaluation.decision, "report evaluated");
            evaluation
        }
        None => EvaluationResult::failed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_think_blocks_and_chat_tokens() {
        let raw = "<think>\n생각 중...\n</think>\n<|im_start|>assistant\n결론: 침해 가능성 높음<|im_end|>";
        assert_eq!(strip_reasoning_markup(raw), "결론: 침해 가능성 높음");
    }

    #[test]
    fn leaves_plain_reports_alone() {
        assert_eq!(strip_reasoning_markup("  assistants agree \n"), "assistants agree");
    }

    #[test]
    fn falls_back_to_retrieved_precedents() {
        let retrieved = vec![Precedent::new("p-1", "a")];
        assert_eq!(report_precedents(&[], &retrieved).len(), 1);
        let refined = vec![Precedent::new("p-2", "b"), Precedent::new("p-3", "c")];
        assert_eq!(report_precedents(&refined, &retrieved).len(), 2);
    }
}
