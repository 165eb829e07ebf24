//! Sequential batch driver.
//!
//! Each protected mark is compared with its candidates one at a time.
//! Pairs that fail validation are logged and skipped; approved reports are
//! collected into one digest per protected mark.

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::domain::{CandidateMark, ProtectedMark, RiskGrade};
use crate::workflow::{Analyzer, RunSnapshot};

/// One protected mark and the candidates collected against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub protected: ProtectedMark,
    #[serde(default)]
    pub candidates: Vec<CandidateMark>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedReport {
    pub candidate_no: String,
    pub candidate_name: String,
    pub report: String,
    pub grade: RiskGrade,
    pub total_score: f64,
}

impl ApprovedReport {
    /// `Some` when the snapshot carries a report its review accepted.
    pub fn from_snapshot(snapshot: &RunSnapshot, threshold: f64) -> Option<Self> {
        if !snapshot.report_approved(threshold) {
            return None;
        }
        Some(Self {
            candidate_no: snapshot.candidate_no.clone(),
            candidate_name: snapshot.candidate_name.clone(),
            report: snapshot.report.clone()?,
            grade: snapshot.risk.grade,
            total_score: snapshot.risk.total_score,
        })
    }
}

/// Approved reports for one protected mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDigest {
    pub protected_registration_no: String,
    pub protected_name: String,
    pub reports: Vec<ApprovedReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub analyzed: usize,
    pub skipped: usize,
    /// Only protected marks with at least one approved report appear here.
    pub digests: Vec<ReportDigest>,
}

#[instrument(skip_all, fields(items = items.len()))]
pub async fn run_batch(analyzer: &Analyzer, items: Vec<BatchItem>) -> BatchSummary {
    let threshold = analyzer.config().retry.report_threshold;
    let mut summary = BatchSummary::default();

    for item in items {
        let BatchItem {
            protected,
            candidates,
        } = item;
        info!(
            protected = %protected.registration_no,
            candidates = candidates.len(),
            "analysing protected mark"
        );

        let mut reports = Vec::new();
        for candidate in candidates {
            let candidate_no = candidate.mark_no.clone();
            match analyzer.analyze(protected.clone(), candidate).await {
                Ok(snapshot) => {
                    summary.analyzed += 1;
                    reports.extend(ApprovedReport::from_snapshot(&snapshot, threshold));
                }
                Err(err) => {
                    summary.skipped += 1;
                    error!(
                        protected = %protected.registration_no,
                        candidate = %candidate_no,
                        error = %err,
                        "pair skipped"
                    );
                }
            }
        }

        if !reports.is_empty() {
            info!(
                protected = %protected.registration_no,
                approved = reports.len(),
                "reports ready"
            );
            summary.digests.push(ReportDigest {
                protected_registration_no: protected.registration_no,
                protected_name: protected.name,
                reports,
            });
        }
    }
    summary
}
