//! Engine configuration.
//!
//! Every section has production defaults, so an empty TOML document is a
//! valid configuration:
//!
//! ```toml
//! [risk]
//! threshold_weight = 1.5
//! grade_weight = [0.2, 0.5, 1.0, 1.5, 2.0]
//!
//! [risk.anchors]
//! phonetic = [[0.0, 0.0], [60.0, 0.3], [100.0, 1.0]]
//!
//! [retry]
//! max_rewrite = 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibration::AnchorTable;
use crate::domain::{Factor, Factors, MarkGuardError, Result, RiskGrade};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub risk: RiskConfig,
    pub precedent: PrecedentConfig,
    pub retry: RetryConfig,
    pub web_search: WebSearchConfig,
}

/// Identification grade (1 to 5) to weight lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeWeights(pub [f64; 5]);

impl Default for GradeWeights {
    fn default() -> Self {
        Self([0.2, 0.5, 1.0, 1.5, 2.0])
    }
}

impl GradeWeights {
    /// Weight for `grade`, `None` outside 1..=5.
    pub fn weight_for(&self, grade: i64) -> Option<f64> {
        if (1..=5).contains(&grade) {
            Some(self.0[(grade - 1) as usize])
        } else {
            None
        }
    }
}

/// Ordered score cut-offs for the risk grade. Each bound is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: 0.85,
            medium: 0.70,
            low: 0.55,
        }
    }
}

impl RiskThresholds {
    pub fn grade(&self, score: f64) -> RiskGrade {
        if score >= self.high {
            RiskGrade::High
        } else if score >= self.medium {
            RiskGrade::Medium
        } else if score >= self.low {
            RiskGrade::Low
        } else {
            RiskGrade::Safe
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub anchors: AnchorSet,
    pub grade_weight: GradeWeights,
    pub default_weight: f64,
    /// A factor at or above this weight is distinctive enough to dominate.
    pub threshold_weight: f64,
    /// A factor at or above this calibrated score is similar enough to dominate.
    pub threshold_score: f64,
    pub risk_threshold: RiskThresholds,
    /// Refusal records fetched per query.
    pub refusal_top_k: usize,
    /// Refusal records kept after merging all queries.
    pub refusal_context_limit: usize,
}

/// Calibration tables per factor. Phonetic anchors are on the 0 to 100
/// scale, the others on 0 to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorSet {
    pub visual: AnchorTable,
    pub phonetic: AnchorTable,
    pub conceptual: AnchorTable,
}

impl Default for AnchorSet {
    fn default() -> Self {
        let unit = AnchorTable::from_pairs([
            (0.0, 0.0),
            (0.5, 0.2),
            (0.7, 0.5),
            (0.85, 0.8),
            (1.0, 1.0),
        ]);
        let phonetic = AnchorTable::from_pairs([
            (0.0, 0.0),
            (50.0, 0.2),
            (70.0, 0.5),
            (85.0, 0.8),
            (100.0, 1.0),
        ]);
        Self {
            visual: unit.clone(),
            phonetic,
            conceptual: unit,
        }
    }
}

impl AnchorSet {
    pub fn get(&self, factor: Factor) -> &AnchorTable {
        match factor {
            Factor::Visual => &self.visual,
            Factor::Phonetic => &self.phonetic,
            Factor::Conceptual => &self.conceptual,
        }
    }

    pub fn as_factors(&self) -> Factors<&AnchorTable> {
        Factors::new(&self.visual, &self.phonetic, &self.conceptual)
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            anchors: AnchorSet::default(),
            grade_weight: GradeWeights::default(),
            default_weight: 1.0,
            threshold_weight: 1.5,
            threshold_score: 0.8,
            risk_threshold: RiskThresholds::default(),
            refusal_top_k: 10,
            refusal_context_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecedentConfig {
    /// Passages fetched per query across both pools.
    pub pool_size: usize,
    /// Share of `pool_size` drawn from the doctrinal pool.
    pub doctrinal_ratio: f64,
    /// Precedents kept after merging all queries.
    pub top_k: usize,
    pub pattern_boost: f64,
    pub citation_penalty: f64,
}

impl Default for PrecedentConfig {
    fn default() -> Self {
        Self {
            pool_size: 20,
            doctrinal_ratio: 0.5,
            top_k: 5,
            pattern_boost: 1.2,
            citation_penalty: 0.5,
        }
    }
}

impl PrecedentConfig {
    /// `(doctrinal_limit, factual_limit)` for one query.
    pub fn pool_split(&self) -> (usize, usize) {
        let doctrinal = (self.pool_size as f64 * self.doctrinal_ratio).floor() as usize;
        let doctrinal = doctrinal.min(self.pool_size);
        (doctrinal, self.pool_size - doctrinal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_rewrite: u32,
    pub max_web_search: u32,
    pub max_regeneration: u32,
    /// Evaluation score (0 to 100) at which a report stands.
    pub report_threshold: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_rewrite: 3,
            max_web_search: 3,
            max_regeneration: 3,
            report_threshold: 80.0,
        }
    }
}

impl RetryConfig {
    /// Upper bound on node executions for one pair.
    ///
    /// Each query cycle visits at most `4 + 2 * web` nodes before grading
    /// approves and `2 * (regeneration + 1)` afterwards; there are at most
    /// `rewrite + 1` cycles plus the fixed prefix.
    pub fn step_ceiling(&self) -> usize {
        let per_cycle = 4
            + 2 * self.max_web_search as usize
            + 2 * (self.max_regeneration as usize + 1);
        let cycles = self.max_rewrite as usize + 1;
        8 + per_cycle * cycles
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    /// Case ids requested per keyword search.
    pub display: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self { display: 5 }
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(MarkGuardError::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

fn check_weight(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MarkGuardError::InvalidConfig(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn anchors(&self, factor: Factor) -> &AnchorTable {
        self.risk.anchors.get(factor)
    }

    pub fn validate(&self) -> Result<()> {
        let risk = &self.risk;
        for (factor, table) in risk.anchors.as_factors().iter() {
            table.validate().map_err(|err| {
                MarkGuardError::InvalidConfig(format!("risk.anchors.{}: {err}", factor.as_str()))
            })?;
        }
        for (i, weight) in risk.grade_weight.0.iter().enumerate() {
            check_weight(&format!("risk.grade_weight[{}]", i + 1), *weight)?;
        }
        check_weight("risk.default_weight", risk.default_weight)?;
        check_weight("risk.threshold_weight", risk.threshold_weight)?;
        check_unit("risk.threshold_score", risk.threshold_score)?;

        let t = risk.risk_threshold;
        check_unit("risk.risk_threshold.high", t.high)?;
        check_unit("risk.risk_threshold.medium", t.medium)?;
        check_unit("risk.risk_threshold.low", t.low)?;
        if !(t.high >= t.medium && t.medium >= t.low) {
            return Err(MarkGuardError::InvalidConfig(
                "risk.risk_threshold must satisfy high >= medium >= low".into(),
            ));
        }
        if risk.refusal_top_k == 0 || risk.refusal_context_limit == 0 {
            return Err(MarkGuardError::InvalidConfig(
                "risk.refusal_top_k and risk.refusal_context_limit must be positive".into(),
            ));
        }

        let p = &self.precedent;
        if p.pool_size == 0 || p.top_k == 0 {
            return Err(MarkGuardError::InvalidConfig(
                "precedent.pool_size and precedent.top_k must be positive".into(),
            ));
        }
        check_unit("precedent.doctrinal_ratio", p.doctrinal_ratio)?;
        check_weight("precedent.pattern_boost", p.pattern_boost)?;
        check_weight("precedent.citation_penalty", p.citation_penalty)?;

        let r = &self.retry;
        if r.max_rewrite == 0 || r.max_web_search == 0 || r.max_regeneration == 0 {
            return Err(MarkGuardError::InvalidConfig(
                "retry budgets must be positive".into(),
            ));
        }
        if !(r.report_threshold.is_finite() && (0.0..=100.0).contains(&r.report_threshold)) {
            return Err(MarkGuardError::InvalidConfig(format!(
                "retry.report_threshold must be within [0, 100], got {}",
                r.report_threshold
            )));
        }
        if self.web_search.display == 0 {
            return Err(MarkGuardError::InvalidConfig(
                "web_search.display must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn grade_thresholds_are_inclusive_on_the_high_side() {
        let t = RiskThresholds::default();
        assert_eq!(t.grade(0.85), RiskGrade::High);
        assert_eq!(t.grade(0.8499), RiskGrade::Medium);
        assert_eq!(t.grade(0.70), RiskGrade::Medium);
        assert_eq!(t.grade(0.55), RiskGrade::Low);
        assert_eq!(t.grade(0.5499), RiskGrade::Safe);
    }

    #[test]
    fn grade_weights_cover_one_to_five() {
        let w = GradeWeights::default();
        assert_eq!(w.weight_for(1), Some(0.2));
        assert_eq!(w.weight_for(5), Some(2.0));
        assert_eq!(w.weight_for(0), None);
        assert_eq!(w.weight_for(6), None);
    }

    #[test]
    fn pool_split_floors_the_doctrinal_share() {
        let mut p = PrecedentConfig::default();
        assert_eq!(p.pool_split(), (10, 10));
        p.doctrinal_ratio = 0.33;
        assert_eq!(p.pool_split(), (6, 14));
        p.doctrinal_ratio = 1.0;
        assert_eq!(p.pool_split(), (20, 0));
    }

    #[test]
    fn step_ceiling_grows_with_budgets() {
        let r = RetryConfig::default();
        let bigger = RetryConfig {
            max_rewrite: 4,
            ..r.clone()
        };
        assert!(bigger.step_ceiling() > r.step_ceiling());
    }
}
