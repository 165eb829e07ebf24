//! Reviewer verdict on a drafted report.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationDecision {
    Approved,
    Regenerate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// 0 to 100
    pub score: f64,
    pub feedback: String,
    pub decision: EvaluationDecision,
}

impl EvaluationResult {
    /// Verdict recorded when the evaluation call itself fails.
    pub fn failed() -> Self {
        Self {
            score: 0.0,
            feedback: "evaluation failed".to_string(),
            decision: EvaluationDecision::Regenerate,
        }
    }

    /// Whether the report stands, by decision or by score.
    pub fn accepts(&self, threshold: f64) -> bool {
        self.decision == EvaluationDecision::Approved || self.score >= threshold
    }

    /// JSON Schema handed to the structured judgment.
    pub fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "score": { "type": "number", "minimum": 0, "maximum": 100 },
                "feedback": { "type": "string" },
                "decision": { "type": "string", "enum": ["approved", "regenerate"] }
            },
            "required": ["score", "feedback", "decision"],
            "additionalProperties": false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_by_decision_or_score() {
        let mut eval = EvaluationResult {
            score: 40.0,
            feedback: String::new(),
            decision: EvaluationDecision::Approved,
        };
        assert!(eval.accepts(80.0));
        eval.decision = EvaluationDecision::Regenerate;
        assert!(!eval.accepts(80.0));
        eval.score = 80.0;
        assert!(eval.accepts(80.0));
        assert!(!EvaluationResult::failed().accepts(80.0));
    }
}
