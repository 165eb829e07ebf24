//! Precedent grading with bounded retries.
//!
//! The judge answers with a loosely typed payload. It is normalized into
//! [`JudgeDecision`] on receipt, then checked against the retrieved list and
//! the remaining retry budget to produce a [`GradingOutcome`].

use markguard_llm::{Judge, JudgmentRequest, PromptTask};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::domain::Precedent;
use crate::prompts;
use crate::recovery::RecoveryChain;

/// Feedback sent back to query drafting when retrieval found nothing.
pub const EMPTY_RESULT_FEEDBACK: &str = "검색 결과가 0건입니다.";

/// Feedback sent back when the judge approved no usable index.
pub const NO_FIT_FEEDBACK: &str = "검색 쿼리에 적합한 판례가 존재하지 않습니다.";

/// Either a single keyword string or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeywordPayload {
    One(String),
    Many(Vec<String>),
}

impl KeywordPayload {
    fn into_list(self) -> Vec<String> {
        let list = match self {
            KeywordPayload::One(s) => vec![s],
            KeywordPayload::Many(v) => v,
        };
        list.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn into_text(self) -> String {
        match self {
            KeywordPayload::One(s) => s,
            KeywordPayload::Many(v) => v.join(", "),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    decision: String,
    #[serde(default, alias = "relevant_indices")]
    approved_indices: Vec<Value>,
    #[serde(default, alias = "feedback_or_query")]
    feedback: Option<KeywordPayload>,
}

/// The judge's verdict after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum JudgeDecision {
    Approve { indices: Vec<i64> },
    Rewrite { feedback: String },
    WebSearch { keywords: Vec<String> },
}

impl JudgeDecision {
    /// Parse a judgment payload. `None` for an unknown decision or a payload
    /// that is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        let raw: RawDecision = serde_json::from_value(value).ok()?;
        match raw.decision.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Some(JudgeDecision::Approve {
                indices: raw.approved_indices.iter().filter_map(index_of).collect(),
            }),
            "rewrite" => Some(JudgeDecision::Rewrite {
                feedback: raw.feedback.map(KeywordPayload::into_text).unwrap_or_default(),
            }),
            "web_search" => Some(JudgeDecision::WebSearch {
                keywords: raw.feedback.map(KeywordPayload::into_list).unwrap_or_default(),
            }),
            other => {
                warn!(decision = %other, "unknown grading decision");
                None
            }
        }
    }
}

fn index_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Where grading sends the run next.
#[derive(Debug, Clone, PartialEq)]
pub enum GradingOutcome {
    /// Proceed to the report with these precedents. `forced` is set when the
    /// approval was imposed by an exhausted budget rather than by the judge.
    Approved { refined: Vec<Precedent>, forced: bool },
    Rewrite { feedback: String },
    WebSearch { keywords: Vec<String> },
}

impl GradingOutcome {
    /// Routing key used by the workflow table.
    pub fn key(&self) -> &'static str {
        match self {
            GradingOutcome::Approved { .. } => "approved",
            GradingOutcome::Rewrite { .. } => "rewrite",
            GradingOutcome::WebSearch { .. } => "web_search",
        }
    }

    fn forced(precedents: &[Precedent]) -> Self {
        GradingOutcome::Approved {
            refined: precedents.iter().cloned().map(Precedent::marked_relevant).collect(),
            forced: true,
        }
    }
}

/// Retry counters as seen by grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub rewrites: u32,
    pub max_rewrite: u32,
    pub web_searches: u32,
    pub max_web_search: u32,
}

impl RetryBudget {
    pub fn can_rewrite(&self) -> bool {
        self.rewrites < self.max_rewrite
    }

    pub fn can_web_search(&self) -> bool {
        self.web_searches < self.max_web_search
    }

    pub fn exhausted(&self) -> bool {
        !self.can_rewrite() && !self.can_web_search()
    }
}

/// Outcome decided without consulting the judge, if any.
pub fn pre_judgment(
    queries: &[String],
    precedents: &[Precedent],
    budget: RetryBudget,
) -> Option<GradingOutcome> {
    if budget.exhausted() {
        warn!(
            count = precedents.len(),
            "retry budgets exhausted, approving every retrieved precedent"
        );
        return Some(GradingOutcome::forced(precedents));
    }
    if precedents.is_empty() {
        let outcome = if budget.can_rewrite() {
            GradingOutcome::Rewrite {
                feedback: EMPTY_RESULT_FEEDBACK.to_string(),
            }
        } else {
            GradingOutcome::WebSearch {
                keywords: queries.first().cloned().into_iter().collect(),
            }
        };
        return Some(outcome);
    }
    None
}

/// Check a judge decision against the retrieved list and the budget.
pub fn resolve(
    decision: JudgeDecision,
    queries: &[String],
    precedents: &[Precedent],
    budget: RetryBudget,
) -> GradingOutcome {
    let outcome = match decision {
        JudgeDecision::Approve { indices } => {
            let mut picked: Vec<usize> = Vec::new();
            for i in indices {
                match usize::try_from(i) {
                    Ok(i) if i < precedents.len() && !picked.contains(&i) => picked.push(i),
                    _ => warn!(index = i, available = precedents.len(), "ignoring approved index"),
                }
            }
            if picked.is_empty() {
                GradingOutcome::Rewrite {
                    feedback: NO_FIT_FEEDBACK.to_string(),
                }
            } else {
                GradingOutcome::Approved {
                    refined: picked
                        .into_iter()
                        .map(|i| precedents[i].clone().marked_relevant())
                        .collect(),
                    forced: false,
                }
            }
        }
        JudgeDecision::Rewrite { feedback } => GradingOutcome::Rewrite { feedback },
        JudgeDecision::WebSearch { keywords } => GradingOutcome::WebSearch { keywords },
    };
    within_budget(outcome, queries, precedents, budget)
}

fn within_budget(
    outcome: GradingOutcome,
    queries: &[String],
    precedents: &[Precedent],
    budget: RetryBudget,
) -> GradingOutcome {
    match outcome {
        GradingOutcome::Rewrite { .. } if !budget.can_rewrite() => {
            if budget.can_web_search() {
                info!("rewrite budget spent, searching external case law instead");
                GradingOutcome::WebSearch {
                    keywords: queries.first().cloned().into_iter().collect(),
                }
            } else {
                GradingOutcome::forced(precedents)
            }
        }
        GradingOutcome::WebSearch { keywords } if !budget.can_web_search() => {
            if budget.can_rewrite() {
                info!("web search budget spent, rewriting queries instead");
                GradingOutcome::Rewrite {
                    feedback: keywords.join(", "),
                }
            } else {
                GradingOutcome::forced(precedents)
            }
        }
        other => other,
    }
}

/// Grade the retrieved precedents.
///
/// A failed or unreadable judgment approves an empty list so the report can
/// still be drafted from the scores alone.
#[instrument(skip_all, fields(precedents = precedents.len(), rewrites = budget.rewrites, web_searches = budget.web_searches))]
pub async fn grade(
    judge: &dyn Judge,
    common_context: &str,
    queries: &[String],
    precedents: &[Precedent],
    budget: RetryBudget,
) -> GradingOutcome {
    if let Some(outcome) = pre_judgment(queries, precedents, budget) {
        return outcome;
    }

    let request = JudgmentRequest::new(
        PromptTask::PrecedentGrading,
        prompts::PRECEDENT_GRADING_SYSTEM,
        prompts::precedent_grading_user(common_context, queries, precedents),
        "precedent_grading",
        prompts::precedent_grading_schema(),
    );
    let decision = match judge.judge(request).await {
        Ok(value) => RecoveryChain::default()
            .recover_value(value)
            .and_then(JudgeDecision::from_value),
        Err(err) => {
            warn!(error = %err, "precedent grading failed");
            None
        }
    };
    let Some(decision) = decision else {
        warn!("no usable grading decision, continuing without precedents");
        return GradingOutcome::Approved {
            refined: Vec::new(),
            forced: false,
        };
    };

    let outcome = resolve(decision, queries, precedents, budget);
    info!(outcome = outcome.key(), "precedents graded");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn budget(rewrites: u32, web_searches: u32) -> RetryBudget {
        RetryBudget {
            rewrites,
            max_rewrite: 3,
            web_searches,
            max_web_search: 3,
        }
    }

    fn found(n: usize) -> Vec<Precedent> {
        (0..n)
            .map(|i| Precedent::new(format!("p-{i}"), format!("본문 {i}")))
            .collect()
    }

    #[test]
    fn keyword_payload_normalizes_to_list() {
        let single = JudgeDecision::from_value(json!({
            "decision": "web_search",
            "feedback": "상표 유사 호칭"
        }));
        assert_eq!(
            single,
            Some(JudgeDecision::WebSearch {
                keywords: vec!["상표 유사 호칭".into()]
            })
        );

        let missing = JudgeDecision::from_value(json!({ "decision": "web_search" }));
        assert_eq!(missing, Some(JudgeDecision::WebSearch { keywords: vec![] }));

        let aliased = JudgeDecision::from_value(json!({
            "decision": "approve",
            "relevant_indices": [0, "1", "x"]
        }));
        assert_eq!(aliased, Some(JudgeDecision::Approve { indices: vec![0, 1] }));

        assert_eq!(JudgeDecision::from_value(json!({ "decision": "maybe" })), None);
        assert_eq!(JudgeDecision::from_value(json!("approve")), None);
    }

    #[test]
    fn exhausted_budgets_force_approval_of_everything() {
        let outcome = pre_judgment(&["q".into()], &found(1), budget(3, 3)).unwrap();
        match outcome {
            GradingOutcome::Approved { refined, forced } => {
                assert!(forced);
                assert_eq!(refined.len(), 1);
                assert!(refined[0].is_relevant);
            }
            other => panic!("expected approval, got {other:?}"),
        }
    }

    #[test]
    fn empty_results_prefer_rewrite_then_web_search() {
        let queries = vec!["첫 쿼리".to_string(), "둘째".to_string()];
        assert_eq!(
            pre_judgment(&queries, &[], budget(0, 0)),
            Some(GradingOutcome::Rewrite {
                feedback: EMPTY_RESULT_FEEDBACK.into()
            })
        );
        assert_eq!(
            pre_judgment(&queries, &[], budget(3, 1)),
            Some(GradingOutcome::WebSearch {
                keywords: vec!["첫 쿼리".into()]
            })
        );
        assert_eq!(pre_judgment(&queries, &found(2), budget(1, 1)), None);
    }

    #[test]
    fn out_of_range_approval_degrades_to_rewrite() {
        let outcome = resolve(
            JudgeDecision::Approve { indices: vec![5] },
            &[],
            &found(2),
            budget(0, 0),
        );
        assert_eq!(
            outcome,
            GradingOutcome::Rewrite {
                feedback: NO_FIT_FEEDBACK.into()
            }
        );
    }

    #[test]
    fn approval_keeps_valid_indices_once() {
        let outcome = resolve(
            JudgeDecision::Approve {
                indices: vec![1, -1, 1, 0],
            },
            &[],
            &found(2),
            budget(0, 0),
        );
        let GradingOutcome::Approved { refined, forced } = outcome else {
            panic!("expected approval");
        };
        assert!(!forced);
        let ids: Vec<&str> = refined.iter().map(|p| p.precedent_no.as_str()).collect();
        assert_eq!(ids, vec!["p-1", "p-0"]);
        assert!(refined.iter().all(|p| p.is_relevant));
    }

    #[test]
    fn spent_budget_swaps_the_retry_kind() {
        let queries = vec!["q0".to_string()];
        let swapped = resolve(
            JudgeDecision::Rewrite {
                feedback: "더 구체적으로".into(),
            },
            &queries,
            &found(1),
            budget(3, 0),
        );
        assert_eq!(
            swapped,
            GradingOutcome::WebSearch {
                keywords: vec!["q0".into()]
            }
        );

        let swapped = resolve(
            JudgeDecision::WebSearch {
                keywords: vec!["a".into(), "b".into()],
            },
            &queries,
            &found(1),
            budget(2, 3),
        );
        assert_eq!(swapped, GradingOutcome::Rewrite { feedback: "a, b".into() });
    }
}
