//! Ensemble risk engine.
//!
//! Turns three raw similarities into one risk grade:
//!
//! 1. calibrate each raw score against its anchor table
//! 2. describe the protected mark and look up similar prior refusals
//! 3. ask for an identification-strength grade (1 to 5) per factor and map
//!    it to a weight
//! 4. apply the dominant-part rule if one factor is both distinctive and
//!    similar enough, otherwise take the weighted root-mean-square
//! 5. grade the rounded total against the risk thresholds
//!
//! Any failure in that pipeline yields [`RiskResult::fail_safe`].

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use markguard_llm::{
    Detail, Embedder, GenerationRequest, Generator, Judge, JudgmentRequest, PromptTask,
};
use markguard_store::{RefusalMatch, VectorSearch};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::calibration::round_to;
use crate::capabilities::Capabilities;
use crate::config::RiskConfig;
use crate::domain::{AggregationRule, Factor, Factors, ProtectedMark, Result, RiskResult};
use crate::prompts;
use crate::recovery::{RecoveryChain, Strategy};

/// Grade assumed when the judgment gives one that cannot be read.
const NEUTRAL_GRADE: i64 = 3;

/// Highest calibrated score among factors whose weight and score both reach
/// their thresholds.
pub fn dominant_score(
    scores: &Factors<f64>,
    weights: &Factors<f64>,
    threshold_weight: f64,
    threshold_score: f64,
) -> Option<f64> {
    Factor::ALL
        .iter()
        .filter(|f| *weights.get(**f) >= threshold_weight && *scores.get(**f) >= threshold_score)
        .map(|f| *scores.get(*f))
        .fold(None, |best, s| Some(best.map_or(s, |b: f64| b.max(s))))
}

/// `sqrt(sum(w * s^2) / sum(w))`, 0 when the weights sum to 0.
pub fn weighted_rms(scores: &Factors<f64>, weights: &Factors<f64>) -> f64 {
    let (mut numerator, mut denominator) = (0.0, 0.0);
    for factor in Factor::ALL {
        let (s, w) = (*scores.get(factor), *weights.get(factor));
        numerator += w * s * s;
        denominator += w;
    }
    if denominator == 0.0 {
        return 0.0;
    }
    (numerator / denominator).sqrt()
}

/// Total score rounded to four decimals and the rule that produced it.
pub fn aggregate(
    scores: &Factors<f64>,
    weights: &Factors<f64>,
    threshold_weight: f64,
    threshold_score: f64,
) -> (f64, AggregationRule) {
    match dominant_score(scores, weights, threshold_weight, threshold_score) {
        Some(score) => (round_to(score, 4), AggregationRule::DominantPart),
        None => (
            round_to(weighted_rms(scores, weights), 4),
            AggregationRule::OverallObservation,
        ),
    }
}

/// Templated refusal queries used when query drafting fails. Blank entries
/// are dropped.
pub fn fallback_refusal_queries(name: &str, product: &str) -> Vec<String> {
    [
        name.to_string(),
        format!("{name} {product}"),
        format!("{product} 상표 거절 사례"),
    ]
    .into_iter()
    .filter(|q| !q.trim().is_empty())
    .collect()
}

/// Merge per-query results: one entry per patent id (best similarity kept),
/// sorted descending, at most `limit`.
pub fn merge_refusals(batches: Vec<Vec<RefusalMatch>>, limit: usize) -> Vec<RefusalMatch> {
    let mut best: HashMap<String, RefusalMatch> = HashMap::new();
    for m in batches.into_iter().flatten() {
        match best.get(&m.patent_id) {
            Some(existing) if existing.similarity >= m.similarity => {}
            _ => {
                best.insert(m.patent_id.clone(), m);
            }
        }
    }
    let mut merged: Vec<RefusalMatch> = best.into_values().collect();
    merged.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.patent_id.cmp(&b.patent_id))
    });
    merged.truncate(limit);
    merged
}

/// Render refusal matches as context blocks for the identification judgment.
pub fn format_refusal_context(matches: &[RefusalMatch]) -> String {
    matches
        .iter()
        .map(|m| {
            format!(
                "[Case ID: {}]\n- Similarity: {:.4}\n- Tags: {} (Product: {})\n- Content: {}\n",
                m.patent_id, m.similarity, m.reason_tags, m.product_tags, m.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn parse_grade(item: &Value) -> i64 {
    match item.get("grade_score") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(NEUTRAL_GRADE),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(NEUTRAL_GRADE),
        _ => NEUTRAL_GRADE,
    }
}

/// Dynamic weights from an identification judgment of the form
/// `{"visual": {"grade_score": 4}, "phonetic": {...}, "semantic": {...}}`.
///
/// A missing factor or a grade outside 1..=5 gets the default weight; an
/// unreadable grade counts as 3.
pub fn weights_from_judgment(judgment: &Value, config: &RiskConfig) -> Factors<f64> {
    Factors::default().map(|factor, _: f64| match judgment.get(factor.judgment_key()) {
        Some(item) => config
            .grade_weight
            .weight_for(parse_grade(item))
            .unwrap_or(config.default_weight),
        None => {
            warn!(factor = factor.judgment_key(), "identification grade missing, default weight");
            config.default_weight
        }
    })
}

fn score_summary(scores: &Factors<f64>) -> String {
    format!(
        "- Visual Similarity Score: {:.2}\n- Phonetic Similarity Score: {:.2}\n- Semantic Similarity Score: {:.2}",
        scores.visual, scores.phonetic, scores.conceptual
    )
}

/// Ensemble engine bound to its collaborators and risk settings.
#[derive(Clone)]
pub struct RiskEngine {
    generator: Arc<dyn Generator>,
    judge: Arc<dyn Judge>,
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorSearch>,
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(caps: &Capabilities, config: RiskConfig) -> Self {
        Self {
            generator: caps.generator.clone(),
            judge: caps.judge.clone(),
            embedder: caps.embedder.clone(),
            vectors: caps.vectors.clone(),
            config,
        }
    }

    /// Grade one pair. Never fails; see [`RiskEngine::try_assess`].
    pub async fn assess(
        &self,
        protected: &ProtectedMark,
        raw: Factors<f64>,
        conceptual_description: &str,
    ) -> RiskResult {
        match self.try_assess(protected, raw, conceptual_description).await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "risk assessment failed, grading Safe");
                RiskResult::fail_safe()
            }
        }
    }

    #[instrument(skip_all, fields(protected = %protected.registration_no))]
    pub async fn try_assess(
        &self,
        protected: &ProtectedMark,
        raw: Factors<f64>,
        conceptual_description: &str,
    ) -> Result<RiskResult> {
        let anchors = &self.config.anchors;
        let scores = raw.try_map(|factor, value| anchors.get(factor).try_calibrate(value))?;
        info!(
            visual = scores.visual,
            phonetic = scores.phonetic,
            conceptual = scores.conceptual,
            "scores calibrated"
        );

        let visual_description = self.describe(protected).await?;

        let queries = self
            .refusal_queries(protected, &visual_description, conceptual_description)
            .await;
        let refusals = self.search_refusals(&queries).await;
        let refusal_context = format_refusal_context(&refusals);
        debug!(queries = queries.len(), refusals = refusals.len(), "refusal context ready");

        let judgment = self
            .identification(
                protected,
                &scores,
                &visual_description,
                conceptual_description,
                &refusal_context,
            )
            .await;
        let weights = weights_from_judgment(&judgment, &self.config);
        info!(
            visual = weights.visual,
            phonetic = weights.phonetic,
            conceptual = weights.conceptual,
            "dynamic weights"
        );

        let (total_score, rule) = aggregate(
            &scores,
            &weights,
            self.config.threshold_weight,
            self.config.threshold_score,
        );
        let grade = self.config.risk_threshold.grade(total_score);
        info!(total_score, ?rule, %grade, "risk graded");

        Ok(RiskResult {
            scores,
            weights,
            total_score,
            grade,
            rule: Some(rule),
            visual_description,
        })
    }

    async fn describe(&self, protected: &ProtectedMark) -> Result<String> {
        let mut request = GenerationRequest::new(
            PromptTask::VisualDescription,
            prompts::VISUAL_DESCRIPTION_SYSTEM,
            prompts::VISUAL_DESCRIPTION_USER,
        );
        if let Some(image) = &protected.image {
            request = request.with_image(image.to_vec(), Detail::High);
        }
        Ok(self.generator.generate(request).await?)
    }

    async fn refusal_queries(
        &self,
        protected: &ProtectedMark,
        visual_description: &str,
        conceptual_description: &str,
    ) -> Vec<String> {
        let request = GenerationRequest::new(
            PromptTask::RefusalQueries,
            prompts::REFUSAL_QUERIES_SYSTEM,
            prompts::refusal_queries_user(
                &protected.name,
                &protected.product_kinds,
                visual_description,
                conceptual_description,
            ),
        );
        let chain = RecoveryChain::new([Strategy::Strict]);
        let drafted = match self.generator.generate(request).await {
            Ok(reply) => chain.recover(&reply).and_then(|v| string_list(v.get("queries"))),
            Err(err) => {
                warn!(error = %err, "refusal query drafting failed");
                None
            }
        };
        match drafted {
            Some(queries) if !queries.is_empty() => queries,
            _ => {
                warn!("using templated refusal queries");
                fallback_refusal_queries(&protected.name, &protected.product_kinds)
            }
        }
    }

    /// One embedding and search per query, all queries in flight together.
    async fn search_refusals(&self, queries: &[String]) -> Vec<RefusalMatch> {
        let searches = queries.iter().map(|query| async move {
            let vector = match self.embedder.embed(query).await {
                Ok(v) => v,
                Err(err) => {
                    warn!(%query, error = %err, "refusal query embedding failed");
                    return None;
                }
            };
            match self
                .vectors
                .refusal_precedents(&vector, self.config.refusal_top_k)
                .await
            {
                Ok(found) => Some(found),
                Err(err) => {
                    warn!(%query, error = %err, "refusal search failed");
                    None
                }
            }
        });
        let batches = join_all(searches).await.into_iter().flatten().collect();
        merge_refusals(batches, self.config.refusal_context_limit)
    }

    async fn identification(
        &self,
        protected: &ProtectedMark,
        scores: &Factors<f64>,
        visual_description: &str,
        conceptual_description: &str,
        refusal_context: &str,
    ) -> Value {
        let request = JudgmentRequest::new(
            PromptTask::IdentificationStrength,
            prompts::IDENTIFICATION_SYSTEM,
            prompts::identification_user(
                &protected.name,
                &protected.product_kinds,
                visual_description,
                conceptual_description,
                &score_summary(scores),
                refusal_context,
            ),
            "identification_strength",
            prompts::identification_schema(),
        );
        match self.judge.judge(request).await {
            Ok(value) => RecoveryChain::default()
                .recover_value(value)
                .unwrap_or(Value::Null),
            Err(err) => {
                warn!(error = %err, "identification judgment failed, default weights");
                Value::Null
            }
        }
    }
}

/// Non-blank strings of a JSON array.
pub(crate) fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    )
}
