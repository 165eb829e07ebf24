//! Per-pair run state.

use chrono::{DateTime, Utc};
use markguard_store::InfringementRiskRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::graph::{Node, Termination};
use crate::config::RetryConfig;
use crate::domain::{
    CandidateMark, EvaluationResult, Factors, Precedent, ProtectedMark, RiskResult,
};
use crate::precedent::RetryBudget;
use crate::report::report_precedents;

/// Retry counters carried across loop iterations. Only the runner bumps them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCounters {
    pub rewrite: u32,
    pub web_search: u32,
    pub regeneration: u32,
}

impl RetryCounters {
    pub fn budget(&self, retry: &RetryConfig) -> RetryBudget {
        RetryBudget {
            rewrites: self.rewrite,
            max_rewrite: retry.max_rewrite,
            web_searches: self.web_search,
            max_web_search: retry.max_web_search,
        }
    }
}

/// Everything one pair's analysis reads and writes. Owned by the runner;
/// nodes receive it by reference.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub protected: ProtectedMark,
    pub candidate: CandidateMark,
    /// Uncalibrated visual, phonetic (0 to 100) and conceptual scores.
    pub raw_scores: Factors<f64>,
    pub conceptual_description: String,
    pub risk: RiskResult,
    pub risk_persisted: bool,
    pub queries: Vec<String>,
    /// Last grading feedback, handed to the next query draft.
    pub query_feedback: Option<String>,
    pub web_keywords: Vec<String>,
    pub retrieved: Vec<Precedent>,
    pub refined: Vec<Precedent>,
    pub forced_approval: bool,
    pub report: Option<String>,
    pub evaluation: Option<EvaluationResult>,
    pub counters: RetryCounters,
    pub path: Vec<Node>,
}

impl RunContext {
    pub fn new(protected: ProtectedMark, candidate: CandidateMark) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            protected,
            candidate,
            raw_scores: Factors::default(),
            conceptual_description: String::new(),
            risk: RiskResult::fail_safe(),
            risk_persisted: false,
            queries: Vec::new(),
            query_feedback: None,
            web_keywords: Vec::new(),
            retrieved: Vec::new(),
            refined: Vec::new(),
            forced_approval: false,
            report: None,
            evaluation: None,
            counters: RetryCounters::default(),
            path: Vec::new(),
        }
    }

    /// Feedback from the last report review, used when redrafting.
    pub fn report_feedback(&self) -> Option<&str> {
        self.evaluation.as_ref().map(|e| e.feedback.as_str())
    }

    /// Row written by the persist node.
    pub fn risk_record(&self) -> InfringementRiskRecord {
        let c = &self.candidate;
        let r = &self.risk;
        InfringementRiskRecord {
            protected_registration_no: self.protected.registration_no.clone(),
            candidate_no: c.mark_no.clone(),
            candidate_name: c.name.clone(),
            candidate_kind: c.kind.as_str().to_string(),
            candidate_class_codes: c.class_codes.clone(),
            product_name: c.product_name.clone(),
            product_page_url: c.product_page_url.clone(),
            manufacturer: c.manufacturer.clone(),
            brand: c.brand.clone(),
            category_large: c.categories.large.clone(),
            category_medium: c.categories.medium.clone(),
            category_small: c.categories.small.clone(),
            visual_score: r.scores.visual,
            visual_weight: r.weights.visual,
            phonetic_score: r.scores.phonetic,
            phonetic_weight: r.weights.phonetic,
            conceptual_score: r.scores.conceptual,
            conceptual_weight: r.weights.conceptual,
            total_score: r.total_score,
            risk_level: r.grade.code().to_string(),
            collected_at: c.collected_at,
            judged_at: Utc::now(),
        }
    }

    pub fn into_snapshot(self, termination: Termination) -> RunSnapshot {
        let precedents = report_precedents(&self.refined, &self.retrieved).to_vec();
        RunSnapshot {
            run_id: self.run_id,
            protected_registration_no: self.protected.registration_no,
            candidate_no: self.candidate.mark_no,
            candidate_name: self.candidate.name,
            raw_scores: self.raw_scores,
            risk: self.risk,
            precedents,
            forced_approval: self.forced_approval,
            report: self.report,
            evaluation: self.evaluation,
            counters: self.counters,
            risk_persisted: self.risk_persisted,
            path: self.path,
            termination,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Final state of one pair, returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: Uuid,
    pub protected_registration_no: String,
    pub candidate_no: String,
    pub candidate_name: String,
    pub raw_scores: Factors<f64>,
    pub risk: RiskResult,
    /// Precedents the report was drafted from.
    pub precedents: Vec<Precedent>,
    /// Precedents were approved because every retry budget ran out.
    pub forced_approval: bool,
    pub report: Option<String>,
    pub evaluation: Option<EvaluationResult>,
    pub counters: RetryCounters,
    pub risk_persisted: bool,
    pub path: Vec<Node>,
    pub termination: Termination,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSnapshot {
    /// Whether the review accepted the report.
    pub fn report_approved(&self, threshold: f64) -> bool {
        self.report.is_some()
            && self
                .evaluation
                .as_ref()
                .is_some_and(|e| e.accepts(threshold))
    }
}
