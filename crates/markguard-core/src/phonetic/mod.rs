//! Phonetic similarity between two brand names.
//!
//! Names are first transcribed into Korean (possibly several readings each).
//! Readings much shorter than the longest one are discarded, every remaining
//! pair is scored with a blend of [`jamo_score`], Jaro-Winkler and
//! [`partial_ratio`], and the best pair wins. The blend depends on how long
//! the pair is and how close their lengths are.

mod fuzzy;
mod hangul;
mod jamo;
mod transliteration;

use std::sync::Arc;

use markguard_llm::Generator;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::calibration::round_to;

pub use fuzzy::{indel_ratio, jaro_winkler, partial_ratio};
pub use hangul::{decompose, hangul_only, to_jamo_string, Syllable};
pub use jamo::jamo_score;
pub use transliteration::{parse_transliteration, transliterate, Transliteration};

/// Readings shorter than this share of the longest reading are dropped.
const MIN_LENGTH_SHARE: f64 = 0.8;
const SIMILAR_LENGTH_RATIO: f64 = 0.7;
const SHORT_NAME_LIMIT: usize = 3;

/// Which weighting produced a pair score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendCase {
    /// At most three syllables, similar lengths: jamo 50, JW 30, partial 20.
    ShortSimilar,
    /// Longer names, similar lengths: JW 50, jamo 30, partial 20.
    LongSimilar,
    /// Lengths far apart: partial 70, jamo 20, JW 10.
    Containment,
}

impl BlendCase {
    fn select(longer: usize, length_ratio: f64) -> Self {
        if length_ratio >= SIMILAR_LENGTH_RATIO {
            if longer <= SHORT_NAME_LIMIT {
                BlendCase::ShortSimilar
            } else {
                BlendCase::LongSimilar
            }
        } else {
            BlendCase::Containment
        }
    }

    fn blend(&self, jamo: f64, jw: f64, partial: f64) -> f64 {
        match self {
            BlendCase::ShortSimilar => jamo * 0.5 + jw * 0.3 + partial * 0.2,
            BlendCase::LongSimilar => jw * 0.5 + jamo * 0.3 + partial * 0.2,
            BlendCase::Containment => partial * 0.7 + jamo * 0.2 + jw * 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairScore {
    pub a: String,
    pub b: String,
    pub score: f64,
    pub case: BlendCase,
}

/// Score one pair of readings on 0 to 100. Spaces are ignored; `None` when
/// either side is empty.
pub fn pair_score(a: &str, b: &str) -> Option<PairScore> {
    let a: String = a.chars().filter(|c| *c != ' ').collect();
    let b: String = b.chars().filter(|c| *c != ' ').collect();
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if len_a == 0 || len_b == 0 {
        return None;
    }

    let longer = len_a.max(len_b);
    let ratio = len_a.min(len_b) as f64 / longer as f64;
    let case = BlendCase::select(longer, ratio);
    let score = case.blend(
        jamo_score(&a, &b),
        jaro_winkler(&a, &b) * 100.0,
        partial_ratio(&a, &b),
    );
    Some(PairScore { a, b, score, case })
}

/// Readings at least 80% as long as the longest one.
pub fn viable_readings(readings: &[String]) -> Vec<&str> {
    let longest = readings.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    let floor = longest as f64 * MIN_LENGTH_SHARE;
    readings
        .iter()
        .filter(|r| r.chars().count() as f64 >= floor)
        .map(String::as_str)
        .collect()
}

/// Highest-scoring pair over the cross product of viable readings. Ties keep
/// the earlier pair.
pub fn best_pair(readings_a: &[String], readings_b: &[String]) -> Option<PairScore> {
    let (viable_a, viable_b) = (viable_readings(readings_a), viable_readings(readings_b));
    let mut best: Option<PairScore> = None;
    for a in &viable_a {
        for b in &viable_b {
            let Some(candidate) = pair_score(a, b) else {
                continue;
            };
            if best.as_ref().map_or(true, |current| candidate.score > current.score) {
                best = Some(candidate);
            }
        }
    }
    best
}

/// Best pair score rounded to two decimals, 0 when nothing is comparable.
pub fn score_readings(readings_a: &[String], readings_b: &[String]) -> f64 {
    match best_pair(readings_a, readings_b) {
        Some(best) => {
            info!(a = %best.a, b = %best.b, score = best.score, case = ?best.case, "best phonetic match");
            round_to(best.score, 2)
        }
        None => {
            warn!("no comparable readings, phonetic score 0");
            0.0
        }
    }
}

/// Phonetic scorer backed by a transliteration capability.
#[derive(Clone)]
pub struct PhoneticMatcher {
    generator: Arc<dyn Generator>,
}

impl PhoneticMatcher {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Caliber score on 0 to 100. Never fails: capability errors fall back
    /// to comparing the raw names.
    #[instrument(skip(self))]
    pub async fn score(&self, name_a: &str, name_b: &str) -> f64 {
        let readings = transliterate(self.generator.as_ref(), name_a, name_b).await;
        score_readings(&readings.korean_a, &readings.korean_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn blend_case_follows_length_profile() {
        assert_eq!(pair_score("나이키", "나이끼").unwrap().case, BlendCase::ShortSimilar);
        assert_eq!(
            pair_score("스타벅스", "스타박스").unwrap().case,
            BlendCase::LongSimilar
        );
        assert_eq!(
            pair_score("지에스", "지에스이시보").unwrap().case,
            BlendCase::Containment
        );
    }

    #[test]
    fn spaces_are_ignored_and_empty_sides_skipped() {
        let spaced = pair_score("나 이 키", "나이키").unwrap();
        assert!((spaced.score - 100.0).abs() < 1e-9);
        assert!(pair_score("  ", "나이키").is_none());
    }

    #[test]
    fn short_fragments_are_not_viable() {
        let readings = owned(&["지에스이시보", "지에스"]);
        assert_eq!(viable_readings(&readings), vec!["지에스이시보"]);
    }

    #[test]
    fn identical_pair_dominates_cross_pairs() {
        let best = best_pair(&owned(&["가나"]), &owned(&["가나", "다라"])).unwrap();
        assert_eq!((best.a.as_str(), best.b.as_str()), ("가나", "가나"));
        assert_eq!(score_readings(&owned(&["가나"]), &owned(&["가나", "다라"])), 100.0);
    }

    #[test]
    fn nothing_comparable_scores_zero() {
        assert_eq!(score_readings(&[], &owned(&["가나"])), 0.0);
        assert_eq!(score_readings(&owned(&[""]), &owned(&["가나"])), 0.0);
    }
}
