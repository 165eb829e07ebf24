//! Domain models for MarkGuard.
//!
//! Canonical definitions for the core entities:
//! - `ProtectedMark` / `CandidateMark`: the two sides of a comparison
//! - `RiskResult`: calibrated scores, dynamic weights and the risk grade
//! - `Precedent`: a case-law excerpt with its relevance flag
//! - `EvaluationResult`: the reviewer verdict on a drafted report

pub mod error;
pub mod evaluation;
pub mod mark;
pub mod precedent;
pub mod risk;

pub use error::{CalibrationError, MarkGuardError, Result, ValidationError};
pub use evaluation::{EvaluationDecision, EvaluationResult};
pub use mark::{CandidateMark, MarkImage, MarkKind, ProductCategories, ProtectedMark};
pub use precedent::Precedent;
pub use risk::{AggregationRule, Factor, Factors, RiskGrade, RiskResult, REPORTABLE_GRADES};
