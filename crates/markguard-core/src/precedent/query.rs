//! Drafting case-law search queries for a risk-graded pair.

use markguard_llm::{Judge, JudgmentRequest, PromptTask};
use tracing::{info, warn};

use crate::domain::{ProtectedMark, RiskResult};
use crate::ensemble::string_list;
use crate::prompts;
use crate::recovery::RecoveryChain;

/// Draft case-law search queries for the pair. Falls back to the protected
/// mark's name when the judgment fails or proposes nothing.
pub async fn generate_queries(
    judge: &dyn Judge,
    protected: &ProtectedMark,
    risk: &RiskResult,
    feedback: Option<&str>,
) -> Vec<String> {
    let request = JudgmentRequest::new(
        PromptTask::PrecedentQueries,
        prompts::PRECEDENT_QUERIES_SYSTEM,
        prompts::precedent_queries_user(&protected.name, &protected.product_kinds, risk, feedback),
        "precedent_queries",
        prompts::precedent_queries_schema(),
    );
    let drafted = match judge.judge(request).await {
        Ok(value) => RecoveryChain::default()
            .recover_value(value)
            .and_then(|v| string_list(v.get("queries"))),
        Err(err) => {
            warn!(error = %err, "precedent query drafting failed");
            None
        }
    };
    match drafted {
        Some(queries) if !queries.is_empty() => {
            info!(count = queries.len(), first = %queries[0], "precedent queries drafted");
            queries
        }
        _ => {
            warn!("falling back to the protected mark name as the only query");
            vec![protected.name.clone()]
        }
    }
}
