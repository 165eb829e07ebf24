//! Risk grading types.

use serde::{Deserialize, Serialize};

/// One of the three similarity signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    Visual,
    Phonetic,
    Conceptual,
}

impl Factor {
    pub const ALL: [Factor; 3] = [Factor::Visual, Factor::Phonetic, Factor::Conceptual];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Visual => "visual",
            Factor::Phonetic => "phonetic",
            Factor::Conceptual => "conceptual",
        }
    }

    /// Key used by the identification-strength judgment.
    pub fn judgment_key(&self) -> &'static str {
        match self {
            Factor::Visual => "visual",
            Factor::Phonetic => "phonetic",
            Factor::Conceptual => "semantic",
        }
    }
}

/// A value per factor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Factors<T> {
    pub visual: T,
    pub phonetic: T,
    pub conceptual: T,
}

impl<T> Factors<T> {
    pub fn new(visual: T, phonetic: T, conceptual: T) -> Self {
        Self {
            visual,
            phonetic,
            conceptual,
        }
    }

    pub fn get(&self, factor: Factor) -> &T {
        match factor {
            Factor::Visual => &self.visual,
            Factor::Phonetic => &self.phonetic,
            Factor::Conceptual => &self.conceptual,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Factor, T) -> U) -> Factors<U> {
        Factors {
            visual: f(Factor::Visual, self.visual),
            phonetic: f(Factor::Phonetic, self.phonetic),
            conceptual: f(Factor::Conceptual, self.conceptual),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, &T)> {
        Factor::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    /// Turn a factor-wise `Result` inside out, failing on the first error.
    pub fn try_map<U, E>(
        self,
        mut f: impl FnMut(Factor, T) -> Result<U, E>,
    ) -> Result<Factors<U>, E> {
        Ok(Factors {
            visual: f(Factor::Visual, self.visual)?,
            phonetic: f(Factor::Phonetic, self.phonetic)?,
            conceptual: f(Factor::Conceptual, self.conceptual)?,
        })
    }
}

/// Infringement risk grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskGrade {
    #[serde(rename = "H")]
    High,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "L")]
    Low,
    #[serde(rename = "S")]
    Safe,
}

/// Grades that are persisted and carried on to precedent retrieval and a
/// report. `Safe` ends the run.
pub const REPORTABLE_GRADES: [RiskGrade; 3] = [RiskGrade::High, RiskGrade::Medium, RiskGrade::Low];

impl RiskGrade {
    pub fn code(&self) -> &'static str {
        match self {
            RiskGrade::High => "H",
            RiskGrade::Medium => "M",
            RiskGrade::Low => "L",
            RiskGrade::Safe => "S",
        }
    }

    pub fn is_reportable(&self) -> bool {
        REPORTABLE_GRADES.contains(self)
    }
}

impl std::fmt::Display for RiskGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Which legal rule produced the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationRule {
    /// One strong, distinctive factor decides on its own.
    DominantPart,
    /// Weighted root-mean-square of all factors.
    OverallObservation,
}

impl AggregationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationRule::DominantPart => "dominant_part",
            AggregationRule::OverallObservation => "overall_observation",
        }
    }
}

/// Output of the ensemble engine. Produced once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub scores: Factors<f64>,
    pub weights: Factors<f64>,
    pub total_score: f64,
    pub grade: RiskGrade,
    pub rule: Option<AggregationRule>,
    pub visual_description: String,
}

impl RiskResult {
    /// All-zero result graded `Safe`, used whenever grading itself fails.
    pub fn fail_safe() -> Self {
        Self {
            scores: Factors::default(),
            weights: Factors::default(),
            total_score: 0.0,
            grade: RiskGrade::Safe,
            rule: None,
            visual_description: String::new(),
        }
    }
}
