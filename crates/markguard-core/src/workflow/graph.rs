//! The analysis graph as an explicit state machine.
//!
//! Nodes are an enum, edges are a static `(node, route) -> step` table. The
//! runner looks up the next step after every node; there is no recursion.

use serde::{Deserialize, Serialize};

/// A node of the analysis graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Visual, phonetic and conceptual scoring run concurrently and join here.
    Scoring,
    Ensemble,
    PersistRisk,
    GenerateQuery,
    RetrievePrecedents,
    GradePrecedents,
    WebSearch,
    GenerateReport,
    EvaluateReport,
}

impl Node {
    pub const ENTRY: Node = Node::Scoring;

    pub fn as_str(&self) -> &'static str {
        match self {
            Node::Scoring => "scoring",
            Node::Ensemble => "ensemble",
            Node::PersistRisk => "persist_risk",
            Node::GenerateQuery => "generate_query",
            Node::RetrievePrecedents => "retrieve_precedents",
            Node::GradePrecedents => "grade_precedents",
            Node::WebSearch => "web_search",
            Node::GenerateReport => "generate_report",
            Node::EvaluateReport => "evaluate_report",
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing key a node returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Unconditional edge.
    Next,
    Reportable,
    Safe,
    Approved,
    Rewrite,
    WebSearch,
    Accepted,
    Regenerate,
    Requery,
    GiveUp,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Graded Safe; no report.
    Safe,
    /// Report accepted by review.
    Approved,
    /// Budgets spent; the last report stands as is.
    BestEffort,
    /// The step ceiling was hit.
    StepLimit,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Safe => "safe",
            Termination::Approved => "approved",
            Termination::BestEffort => "best_effort",
            Termination::StepLimit => "step_limit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Goto(Node),
    End(Termination),
}

/// Every edge of the graph.
pub const TRANSITIONS: &[(Node, Route, Step)] = &[
    (Node::Scoring, Route::Next, Step::Goto(Node::Ensemble)),
    (Node::Ensemble, Route::Reportable, Step::Goto(Node::PersistRisk)),
    (Node::Ensemble, Route::Safe, Step::End(Termination::Safe)),
    (Node::PersistRisk, Route::Next, Step::Goto(Node::GenerateQuery)),
    (Node::GenerateQuery, Route::Next, Step::Goto(Node::RetrievePrecedents)),
    (Node::RetrievePrecedents, Route::Next, Step::Goto(Node::GradePrecedents)),
    (Node::GradePrecedents, Route::Approved, Step::Goto(Node::GenerateReport)),
    (Node::GradePrecedents, Route::Rewrite, Step::Goto(Node::GenerateQuery)),
    (Node::GradePrecedents, Route::WebSearch, Step::Goto(Node::WebSearch)),
    (Node::WebSearch, Route::Next, Step::Goto(Node::GradePrecedents)),
    (Node::GenerateReport, Route::Next, Step::Goto(Node::EvaluateReport)),
    (Node::EvaluateReport, Route::Accepted, Step::End(Termination::Approved)),
    (Node::EvaluateReport, Route::Regenerate, Step::Goto(Node::GenerateReport)),
    (Node::EvaluateReport, Route::Requery, Step::Goto(Node::GenerateQuery)),
    (Node::EvaluateReport, Route::GiveUp, Step::End(Termination::BestEffort)),
];

/// Next step for `route` out of `node`, `None` if the graph has no such edge.
pub fn next(node: Node, route: Route) -> Option<Step> {
    TRANSITIONS
        .iter()
        .find(|(from, key, _)| *from == node && *key == route)
        .map(|(_, _, step)| *step)
}
