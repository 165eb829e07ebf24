//! Syllable-structure similarity for Korean transcriptions.

use super::fuzzy::indel_ratio;
use super::hangul::{decompose, to_jamo_string, Syllable};

/// Credit for ㄲ/ㅋ at the initial position, which sound nearly alike.
const TENSE_ASPIRATED_CREDIT: f64 = 0.96;
/// Credit for a final ㄹ present on one side and absent on the other.
const LIQUID_FINAL_CREDIT: f64 = 0.98;

fn initial_credit(a: char, b: char) -> f64 {
    if a == b {
        1.0
    } else if matches!((a, b), ('ㄲ', 'ㅋ') | ('ㅋ', 'ㄲ')) {
        TENSE_ASPIRATED_CREDIT
    } else {
        0.0
    }
}

fn final_credit(a: Option<char>, b: Option<char>) -> f64 {
    match (a, b) {
        _ if a == b => 1.0,
        (None, Some('ㄹ')) | (Some('ㄹ'), None) => LIQUID_FINAL_CREDIT,
        _ => 0.0,
    }
}

fn syllable_credit(a: Syllable, b: Syllable) -> f64 {
    let medial = if a.medial == b.medial { 1.0 } else { 0.0 };
    initial_credit(a.initial, b.initial) + medial + final_credit(a.final_consonant, b.final_consonant)
}

/// Score two transcriptions position by position over initial, medial and
/// final consonant, 0 to 100.
///
/// Strings of different syllable counts fall back to [`indel_ratio`] over
/// their jamo spellings. A character that is not a Hangul syllable counts
/// as a single element compared exactly.
pub fn jamo_score(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.len() != b_chars.len() {
        return indel_ratio(&to_jamo_string(a), &to_jamo_string(b));
    }

    let mut credit = 0.0;
    let mut elements = 0usize;
    for (ca, cb) in a_chars.iter().zip(&b_chars) {
        match (decompose(*ca), decompose(*cb)) {
            (Some(sa), Some(sb)) => {
                elements += 3;
                credit += syllable_credit(sa, sb);
            }
            _ => {
                elements += 1;
                if ca == cb {
                    credit += 1.0;
                }
            }
        }
    }
    if elements == 0 {
        return 0.0;
    }
    credit / elements as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identical_syllables_score_full() {
        assert!(close(jamo_score("나이키", "나이키"), 100.0));
    }

    #[test]
    fn tense_and_aspirated_initials_are_near_homophones() {
        // 까 vs 카: initial 0.96, medial 1, no final on either side 1
        assert!(close(jamo_score("까", "카"), (0.96 + 2.0) / 3.0 * 100.0));
    }

    #[test]
    fn liquid_final_presence_costs_little() {
        // 가 vs 갈
        assert!(close(jamo_score("가", "갈"), (2.0 + 0.98) / 3.0 * 100.0));
        // 가 vs 각 gets no final credit
        assert!(close(jamo_score("가", "각"), 2.0 / 3.0 * 100.0));
    }

    #[test]
    fn different_lengths_compare_jamo_spellings() {
        // ㄱㅏㄴㅏ vs ㄱㅏ: LCS 2 of 6 total
        assert!(close(jamo_score("가나", "가"), 200.0 * 2.0 / 6.0));
    }

    #[test]
    fn non_hangul_characters_count_once() {
        assert!(close(jamo_score("가A", "가B"), 3.0 / 4.0 * 100.0));
        assert!(close(jamo_score("", ""), 0.0));
    }
}
