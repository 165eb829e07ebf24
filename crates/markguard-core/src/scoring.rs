//! Visual and conceptual similarity of two marks.

use std::sync::Arc;

use markguard_llm::{Detail, Embedder, GenerationRequest, Generator, PromptTask};
use markguard_store::cosine_similarity;
use tracing::{debug, instrument, warn};

use crate::calibration::round_to;
use crate::domain::{CandidateMark, MarkImage, ProtectedMark, Result};
use crate::prompts;

/// Cosine similarity of the two image vectors, 0 when either is empty,
/// the dimensions differ or a norm is zero.
pub fn visual_similarity(protected: &[f32], candidate: &[f32]) -> f64 {
    match cosine_similarity(protected, candidate) {
        Some(score) => score,
        None => {
            warn!(
                protected_dims = protected.len(),
                candidate_dims = candidate.len(),
                "image vectors not comparable, visual score 0"
            );
            0.0
        }
    }
}

/// Result of the conceptual scorer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConceptualScore {
    /// Cosine similarity of the caption embeddings, two decimals.
    pub score: f64,
    /// Caption of the protected mark, reused by the ensemble.
    pub description: String,
}

/// Captions both marks and compares the caption embeddings.
#[derive(Clone)]
pub struct ConceptualScorer {
    generator: Arc<dyn Generator>,
    embedder: Arc<dyn Embedder>,
}

impl ConceptualScorer {
    pub fn new(generator: Arc<dyn Generator>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            generator,
            embedder,
        }
    }

    /// Errors are left to the caller; the scoring node degrades them to 0.
    #[instrument(skip_all, fields(protected = %protected.registration_no, candidate = %candidate.mark_no))]
    pub async fn try_score(
        &self,
        protected: &ProtectedMark,
        candidate: &CandidateMark,
    ) -> Result<ConceptualScore> {
        let protected_caption = self.caption(protected.image.as_ref()).await?;
        let candidate_caption = self.caption(candidate.image.as_ref()).await?;
        debug!(
            protected = %preview(&protected_caption),
            candidate = %preview(&candidate_caption),
            "captions ready"
        );

        let a = self.embedder.embed(&protected_caption).await?;
        let b = self.embedder.embed(&candidate_caption).await?;
        let score = cosine_similarity(&a, &b).map_or(0.0, |s| round_to(s, 2));
        Ok(ConceptualScore {
            score,
            description: protected_caption,
        })
    }

    async fn caption(&self, image: Option<&MarkImage>) -> Result<String> {
        let mut request = GenerationRequest::new(
            PromptTask::ConceptualCaption,
            prompts::CONCEPTUAL_CAPTION_SYSTEM,
            prompts::CONCEPTUAL_CAPTION_USER,
        );
        if let Some(image) = image {
            request = request.with_image(image.to_vec(), Detail::High);
        }
        Ok(self.generator.generate(request).await?)
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visual_similarity_degenerate_vectors_score_zero() {
        assert_eq!(visual_similarity(&[], &[1.0]), 0.0);
        assert_eq!(visual_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(visual_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn visual_similarity_is_cosine() {
        assert!((visual_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(visual_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
        let s = visual_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((s - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    fn marks() -> (ProtectedMark, CandidateMark) {
        let protected: ProtectedMark =
            serde_json::from_value(serde_json::json!({ "registration_no": "40-1", "name": "사과" }))
                .unwrap();
        let candidate: CandidateMark =
            serde_json::from_value(serde_json::json!({ "mark_no": "c-1", "name": "애플" }))
                .unwrap();
        (protected, candidate)
    }

    #[tokio::test]
    async fn conceptual_score_compares_caption_embeddings() {
        use markguard_llm::fakes::{HashEmbedder, ScriptedGenerator};

        let generator =
            ScriptedGenerator::new().always(PromptTask::ConceptualCaption, "빨간 사과 로고");
        let scorer = ConceptualScorer::new(Arc::new(generator), Arc::new(HashEmbedder::new(4)));
        let (protected, candidate) = marks();

        let result = scorer.try_score(&protected, &candidate).await.unwrap();
        assert_eq!(result.score, 1.0);
        assert_eq!(result.description, "빨간 사과 로고");
    }

    #[tokio::test]
    async fn conceptual_caption_failure_is_returned_to_the_caller() {
        use markguard_llm::fakes::{HashEmbedder, ScriptedGenerator};

        let scorer = ConceptualScorer::new(
            Arc::new(ScriptedGenerator::new()),
            Arc::new(HashEmbedder::new(4)),
        );
        let (protected, candidate) = marks();
        assert!(scorer.try_score(&protected, &candidate).await.is_err());
    }
}
