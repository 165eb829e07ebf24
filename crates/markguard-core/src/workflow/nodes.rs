//! Node bodies. Each one reads the context, writes its results back and
//! returns a route; none of them propagates an error.

use tracing::{debug, info};

use super::context::{RetryCounters, RunContext};
use super::graph::{Node, Route};
use super::runner::Analyzer;
use crate::config::RetryConfig;
use crate::domain::{EvaluationResult, RiskResult};
use crate::metrics::METRICS;
use crate::obs;
use crate::precedent::{self, GradingOutcome};
use crate::prompts;
use crate::report;
use crate::scoring::{visual_similarity, ConceptualScore};

/// Route out of report review. Bumps the regeneration counter on a
/// rejected report before comparing it with the budget.
pub fn route_after_review(
    evaluation: &EvaluationResult,
    counters: &mut RetryCounters,
    retry: &RetryConfig,
) -> Route {
    if evaluation.accepts(retry.report_threshold) {
        return Route::Accepted;
    }
    counters.regeneration += 1;
    if counters.regeneration < retry.max_regeneration {
        Route::Regenerate
    } else if counters.rewrite < retry.max_rewrite {
        Route::Requery
    } else {
        Route::GiveUp
    }
}

fn degraded(ctx: &RunContext, node: Node, error: &dyn std::fmt::Display) {
    obs::emit_node_degraded(&ctx.run_id.to_string(), node.as_str(), error);
    METRICS.inc_node_failures();
}

impl Analyzer {
    pub(super) async fn run_node(&self, node: Node, ctx: &mut RunContext) -> Route {
        match node {
            Node::Scoring => self.scoring(ctx).await,
            Node::Ensemble => self.ensemble(ctx).await,
            Node::PersistRisk => self.persist_risk(ctx).await,
            Node::GenerateQuery => self.generate_query(ctx).await,
            Node::RetrievePrecedents => self.retrieve_precedents(ctx).await,
            Node::GradePrecedents => self.grade_precedents(ctx).await,
            Node::WebSearch => self.web_search(ctx).await,
            Node::GenerateReport => self.generate_report(ctx).await,
            Node::EvaluateReport => self.evaluate_report(ctx).await,
        }
    }

    async fn scoring(&self, ctx: &mut RunContext) -> Route {
        let protected = &ctx.protected;
        let candidate = &ctx.candidate;

        let visual = async {
            visual_similarity(&protected.image_vector, &candidate.image_vector)
        };
        let phonetic = async {
            if protected.name.trim().is_empty() || candidate.name.trim().is_empty() {
                debug!("a mark has no name, phonetic score 0");
                0.0
            } else {
                self.phonetic.score(&protected.name, &candidate.name).await
            }
        };
        let conceptual = self.conceptual.try_score(protected, candidate);

        let (visual, phonetic, conceptual) = tokio::join!(visual, phonetic, conceptual);

        let conceptual = conceptual.unwrap_or_else(|err| {
            degraded(ctx, Node::Scoring, &err);
            ConceptualScore::default()
        });
        ctx.raw_scores.visual = visual;
        ctx.raw_scores.phonetic = phonetic;
        ctx.raw_scores.conceptual = conceptual.score;
        ctx.conceptual_description = conceptual.description;
        info!(visual, phonetic, conceptual = ctx.raw_scores.conceptual, "raw scores joined");
        Route::Next
    }

    async fn ensemble(&self, ctx: &mut RunContext) -> Route {
        let assessed = self
            .risk
            .try_assess(&ctx.protected, ctx.raw_scores, &ctx.conceptual_description)
            .await;
        let risk = assessed.unwrap_or_else(|err| {
            degraded(ctx, Node::Ensemble, &err);
            RiskResult::fail_safe()
        });
        ctx.risk = risk;

        obs::emit_risk_graded(
            &ctx.run_id.to_string(),
            ctx.risk.grade.code(),
            ctx.risk.total_score,
            ctx.risk.rule.map_or("none", |rule| rule.as_str()),
        );
        if ctx.risk.grade.is_reportable() {
            Route::Reportable
        } else {
            Route::Safe
        }
    }

    async fn persist_risk(&self, ctx: &mut RunContext) -> Route {
        if ctx.risk_persisted {
            debug!("risk already persisted for this run");
            return Route::Next;
        }
        if ctx.risk.grade.is_reportable() {
            match self.caps.risk_sink.persist_risk(ctx.risk_record()).await {
                Ok(()) => info!(grade = %ctx.risk.grade, "risk persisted"),
                Err(err) => degraded(ctx, Node::PersistRisk, &err),
            }
        }
        ctx.risk_persisted = true;
        Route::Next
    }

    async fn generate_query(&self, ctx: &mut RunContext) -> Route {
        ctx.queries = precedent::generate_queries(
            self.caps.judge.as_ref(),
            &ctx.protected,
            &ctx.risk,
            ctx.query_feedback.as_deref(),
        )
        .await;
        ctx.counters.regeneration = 0;
        Route::Next
    }

    async fn retrieve_precedents(&self, ctx: &mut RunContext) -> Route {
        ctx.retrieved = precedent::retrieve(
            self.caps.embedder.as_ref(),
            self.caps.vectors.as_ref(),
            &ctx.queries,
            &ctx.risk.scores,
            &self.config.precedent,
        )
        .await;
        ctx.refined.clear();
        Route::Next
    }

    async fn grade_precedents(&self, ctx: &mut RunContext) -> Route {
        let common = prompts::common_context(&ctx.protected, &ctx.candidate, &ctx.risk);
        let outcome = precedent::grade(
            self.caps.judge.as_ref(),
            &common,
            &ctx.queries,
            &ctx.retrieved,
            ctx.counters.budget(&self.config.retry),
        )
        .await;
        match outcome {
            GradingOutcome::Approved { refined, forced } => {
                ctx.refined = refined;
                ctx.forced_approval = forced;
                Route::Approved
            }
            GradingOutcome::Rewrite { feedback } => {
                ctx.query_feedback = Some(feedback);
                Route::Rewrite
            }
            GradingOutcome::WebSearch { keywords } => {
                ctx.web_keywords = keywords;
                Route::WebSearch
            }
        }
    }

    async fn web_search(&self, ctx: &mut RunContext) -> Route {
        ctx.retrieved = precedent::search_case_law(
            self.caps.case_law.as_ref(),
            &ctx.web_keywords,
            self.config.web_search.display,
        )
        .await;
        info!(found = ctx.retrieved.len(), "external precedents replace retrieved set");
        Route::Next
    }

    async fn generate_report(&self, ctx: &mut RunContext) -> Route {
        let common = prompts::common_context(&ctx.protected, &ctx.candidate, &ctx.risk);
        let feedback = if ctx.counters.regeneration > 0 {
            ctx.report_feedback()
        } else {
            None
        };
        let text = report::generate_report(
            self.caps.generator.as_ref(),
            &common,
            report::report_precedents(&ctx.refined, &ctx.retrieved),
            feedback,
        )
        .await;
        ctx.report = Some(text);
        Route::Next
    }

    async fn evaluate_report(&self, ctx: &mut RunContext) -> Route {
        let common = prompts::common_context(&ctx.protected, &ctx.candidate, &ctx.risk);
        let draft = ctx.report.as_deref().unwrap_or_default();
        let evaluation = report::evaluate_report(
            self.caps.judge.as_ref(),
            &common,
            report::report_precedents(&ctx.refined, &ctx.retrieved),
            draft,
        )
        .await;
        let route = route_after_review(&evaluation, &mut ctx.counters, &self.config.retry);
        info!(score = evaluation.score, ?route, "review routed");
        ctx.evaluation = Some(evaluation);
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EvaluationDecision;

    fn rejected(score: f64) -> EvaluationResult {
        EvaluationResult {
            score,
            feedback: "근거 부족".into(),
            decision: EvaluationDecision::Regenerate,
        }
    }

    #[test]
    fn review_accepts_on_threshold_without_counting() {
        let mut counters = RetryCounters::default();
        let route = route_after_review(&rejected(80.0), &mut counters, &RetryConfig::default());
        assert_eq!(route, Route::Accepted);
        assert_eq!(counters.regeneration, 0);
    }

    #[test]
    fn review_regenerates_then_requeries_then_gives_up() {
        let retry = RetryConfig::default();
        let mut counters = RetryCounters::default();
        assert_eq!(route_after_review(&rejected(10.0), &mut counters, &retry), Route::Regenerate);
        assert_eq!(route_after_review(&rejected(10.0), &mut counters, &retry), Route::Regenerate);
        assert_eq!(route_after_review(&rejected(10.0), &mut counters, &retry), Route::Requery);
        assert_eq!(counters.regeneration, 3);

        counters.rewrite = retry.max_rewrite;
        assert_eq!(route_after_review(&rejected(10.0), &mut counters, &retry), Route::GiveUp);
    }
}
