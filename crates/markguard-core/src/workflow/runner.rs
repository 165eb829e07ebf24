//! Drives one pair through the analysis graph.

use std::time::Instant;

use tracing::{error, warn, Instrument};

use super::context::{RunContext, RunSnapshot};
use super::graph::{self, Node, Route, Step, Termination};
use crate::capabilities::Capabilities;
use crate::config::EngineConfig;
use crate::domain::{CandidateMark, ProtectedMark, Result};
use crate::ensemble::RiskEngine;
use crate::metrics::METRICS;
use crate::obs;
use crate::phonetic::PhoneticMatcher;
use crate::scoring::ConceptualScorer;

/// The analysis pipeline, built once and reused for every pair.
#[derive(Clone)]
pub struct Analyzer {
    pub(super) caps: Capabilities,
    pub(super) config: EngineConfig,
    pub(super) risk: RiskEngine,
    pub(super) phonetic: PhoneticMatcher,
    pub(super) conceptual: ConceptualScorer,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    /// Fails if `config` does not validate.
    pub fn new(caps: Capabilities, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            risk: RiskEngine::new(&caps, config.risk.clone()),
            phonetic: PhoneticMatcher::new(caps.generator.clone()),
            conceptual: ConceptualScorer::new(caps.generator.clone(), caps.embedder.clone()),
            caps,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyse one pair.
    ///
    /// Only mark validation can fail; once the graph starts every node
    /// degrades to its safe default and the run always yields a snapshot.
    pub async fn analyze(
        &self,
        protected: ProtectedMark,
        candidate: CandidateMark,
    ) -> Result<RunSnapshot> {
        protected.validate()?;
        candidate.validate()?;

        let ctx = RunContext::new(protected, candidate);
        let span = obs::pair_span(
            &ctx.run_id.to_string(),
            &ctx.protected.registration_no,
            &ctx.candidate.mark_no,
        );
        Ok(self.drive(ctx).instrument(span).await)
    }

    async fn drive(&self, mut ctx: RunContext) -> RunSnapshot {
        let run_id = ctx.run_id.to_string();
        obs::emit_pair_started(&run_id, &ctx.protected.registration_no, &ctx.candidate.mark_no);
        let started = Instant::now();
        let ceiling = self.config.retry.step_ceiling();

        let mut node = Node::ENTRY;
        let termination = loop {
            if ctx.path.len() >= ceiling {
                warn!(ceiling, %node, "step ceiling reached, ending with current results");
                break Termination::StepLimit;
            }
            ctx.path.push(node);
            obs::emit_node_entered(&run_id, node.as_str(), ctx.path.len());

            let route = self.run_node(node, &mut ctx).await;
            match graph::next(node, route) {
                Some(Step::Goto(target)) => {
                    follow_edge(node, route, &mut ctx);
                    node = target;
                }
                Some(Step::End(termination)) => break termination,
                None => {
                    error!(%node, ?route, "no edge for route, ending run");
                    break Termination::BestEffort;
                }
            }
        };

        METRICS.inc_pairs_analyzed();
        if termination == Termination::Approved {
            METRICS.inc_reports_approved();
        }
        obs::emit_pair_finished(
            &run_id,
            termination.as_str(),
            started.elapsed().as_millis() as u64,
            ctx.path.len(),
        );
        ctx.into_snapshot(termination)
    }
}

/// Counter bookkeeping for retry edges.
fn follow_edge(from: Node, route: Route, ctx: &mut RunContext) {
    match (from, route) {
        (Node::GradePrecedents, Route::Rewrite) | (Node::EvaluateReport, Route::Requery) => {
            ctx.counters.rewrite += 1;
            METRICS.inc_query_rewrites();
        }
        (Node::GradePrecedents, Route::WebSearch) => {
            ctx.counters.web_search += 1;
            METRICS.inc_web_searches();
        }
        (Node::EvaluateReport, Route::Regenerate) => METRICS.inc_report_regenerations(),
        _ => {}
    }
}

/// Analyse one pair with a freshly built [`Analyzer`].
pub async fn analyze_pair(
    caps: &Capabilities,
    config: &EngineConfig,
    protected: ProtectedMark,
    candidate: CandidateMark,
) -> Result<RunSnapshot> {
    Analyzer::new(caps.clone(), config.clone())?
        .analyze(protected, candidate)
        .await
}
