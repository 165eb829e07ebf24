//! MarkGuard Core Library
//!
//! Trademark infringement analysis for one protected mark against one
//! collected candidate at a time.
//!
//! ## Layer 2 - Analysis core
//!
//! - `scoring` / `phonetic`: the three raw similarity signals
//! - `calibration` / `ensemble`: calibrated scores, dynamic weights, risk grade
//! - `precedent`: query drafting, hybrid retrieval, grading, external search
//! - `report`: drafting and review
//! - `workflow`: the bounded state machine tying them together
//! - `batch`: sequential driver over many pairs
//!
//! Every external collaborator is reached through [`Capabilities`].

pub mod batch;
pub mod calibration;
pub mod capabilities;
pub mod config;
pub mod domain;
pub mod ensemble;
pub mod metrics;
pub mod obs;
pub mod phonetic;
pub mod precedent;
pub mod prompts;
pub mod recovery;
pub mod report;
pub mod scoring;
pub mod telemetry;
pub mod workflow;

pub use batch::{run_batch, ApprovedReport, BatchItem, BatchSummary, ReportDigest};
pub use calibration::{calibrate, Anchor, AnchorTable};
pub use capabilities::Capabilities;
pub use config::{
    AnchorSet, EngineConfig, GradeWeights, PrecedentConfig, RetryConfig, RiskConfig,
    RiskThresholds, WebSearchConfig,
};
pub use domain::{
    AggregationRule, CalibrationError, CandidateMark, EvaluationDecision, EvaluationResult,
    Factor, Factors, MarkGuardError, MarkImage, MarkKind, Precedent, ProductCategories,
    ProtectedMark, Result, RiskGrade, RiskResult, ValidationError, REPORTABLE_GRADES,
};
pub use ensemble::RiskEngine;
pub use obs::{
    emit_node_degraded, emit_node_entered, emit_pair_finished, emit_pair_started,
    emit_risk_graded, pair_span,
};
pub use phonetic::PhoneticMatcher;
pub use recovery::{RecoveryChain, Strategy};
pub use scoring::{visual_similarity, ConceptualScore, ConceptualScorer};
pub use workflow::{analyze_pair, Analyzer, Node, RunContext, RunSnapshot, Termination};
