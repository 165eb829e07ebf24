//! Structured observability hooks for the pair lifecycle.
//!
//! This module provides:
//! - A pair-scoped tracing span via [`pair_span`], attached to the whole
//!   analysis future with `Instrument`
//! - Emission functions for lifecycle events: start, node entry, risk grade,
//!   degraded node, finish
//!
//! Events are emitted at `info!` level (`warn!` for degraded nodes). Filter
//! with `RUST_LOG`; the CLI's `--json` flag switches to JSON lines.

use tracing::info;

/// Span tagged with the run id and both mark identifiers.
///
/// ```ignore
/// analyze(ctx).instrument(pair_span(&run_id, "40-1", "c-9")).await;
/// ```
pub fn pair_span(run_id: &str, protected: &str, candidate: &str) -> tracing::Span {
    tracing::info_span!(
        "markguard.pair",
        run_id = %run_id,
        protected = %protected,
        candidate = %candidate,
    )
}

/// Emit event: analysis of a pair started.
pub fn emit_pair_started(run_id: &str, protected: &str, candidate: &str) {
    info!(
        event = "pair.started",
        run_id = %run_id,
        protected = %protected,
        candidate = %candidate,
    );
}

/// Emit event: the runner entered a graph node.
pub fn emit_node_entered(run_id: &str, node: &str, step: usize) {
    info!(event = "node.entered", run_id = %run_id, node = %node, step = step);
}

/// Emit event: the ensemble produced a grade.
pub fn emit_risk_graded(run_id: &str, grade: &str, total_score: f64, rule: &str) {
    info!(
        event = "risk.graded",
        run_id = %run_id,
        grade = %grade,
        total_score = total_score,
        rule = %rule,
    );
}

/// Emit event: analysis finished.
pub fn emit_pair_finished(run_id: &str, termination: &str, duration_ms: u64, steps: usize) {
    info!(
        event = "pair.finished",
        run_id = %run_id,
        termination = %termination,
        duration_ms = duration_ms,
        steps = steps,
    );
}

/// Emit event: a node fell back to its safe default (warning level).
pub fn emit_node_degraded(run_id: &str, node: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "node.degraded", run_id = %run_id, node = %node, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_span_can_be_entered() {
        let span = pair_span("run-1", "40-1", "c-1");
        let _entered = span.enter();
    }
}
