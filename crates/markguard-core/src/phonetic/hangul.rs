//! Hangul syllable decomposition.

const SYLLABLE_BASE: u32 = 0xAC00;
const SYLLABLE_LAST: u32 = 0xD7A3;
const MEDIAL_COUNT: u32 = 21;
const FINAL_COUNT: u32 = 28;

const INITIALS: [char; 19] = [
    'ㄱ', 'ㄲ', 'ㄴ', 'ㄷ', 'ㄸ', 'ㄹ', 'ㅁ', 'ㅂ', 'ㅃ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅉ', 'ㅊ', 'ㅋ', 'ㅌ',
    'ㅍ', 'ㅎ',
];

const MEDIALS: [char; 21] = [
    'ㅏ', 'ㅐ', 'ㅑ', 'ㅒ', 'ㅓ', 'ㅔ', 'ㅕ', 'ㅖ', 'ㅗ', 'ㅘ', 'ㅙ', 'ㅚ', 'ㅛ', 'ㅜ', 'ㅝ', 'ㅞ', 'ㅟ',
    'ㅠ', 'ㅡ', 'ㅢ', 'ㅣ',
];

// Index 0 is "no final consonant".
const FINALS: [Option<char>; 28] = [
    None,
    Some('ㄱ'),
    Some('ㄲ'),
    Some('ㄳ'),
    Some('ㄴ'),
    Some('ㄵ'),
    Some('ㄶ'),
    Some('ㄷ'),
    Some('ㄹ'),
    Some('ㄺ'),
    Some('ㄻ'),
    Some('ㄼ'),
    Some('ㄽ'),
    Some('ㄾ'),
    Some('ㄿ'),
    Some('ㅀ'),
    Some('ㅁ'),
    Some('ㅂ'),
    Some('ㅄ'),
    Some('ㅅ'),
    Some('ㅆ'),
    Some('ㅇ'),
    Some('ㅈ'),
    Some('ㅊ'),
    Some('ㅋ'),
    Some('ㅌ'),
    Some('ㅍ'),
    Some('ㅎ'),
];

/// A precomposed Hangul syllable split into compatibility jamo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Syllable {
    pub initial: char,
    pub medial: char,
    pub final_consonant: Option<char>,
}

pub fn is_syllable(ch: char) -> bool {
    (SYLLABLE_BASE..=SYLLABLE_LAST).contains(&u32::from(ch))
}

pub fn decompose(ch: char) -> Option<Syllable> {
    if !is_syllable(ch) {
        return None;
    }
    let offset = u32::from(ch) - SYLLABLE_BASE;
    let initial = (offset / (MEDIAL_COUNT * FINAL_COUNT)) as usize;
    let medial = ((offset % (MEDIAL_COUNT * FINAL_COUNT)) / FINAL_COUNT) as usize;
    let final_index = (offset % FINAL_COUNT) as usize;
    Some(Syllable {
        initial: INITIALS[initial],
        medial: MEDIALS[medial],
        final_consonant: FINALS[final_index],
    })
}

/// Spell `text` out in compatibility jamo; other characters are kept.
pub fn to_jamo_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 3);
    for ch in text.chars() {
        match decompose(ch) {
            Some(s) => {
                out.push(s.initial);
                out.push(s.medial);
                if let Some(f) = s.final_consonant {
                    out.push(f);
                }
            }
            None => out.push(ch),
        }
    }
    out
}

/// Only the Hangul syllables of `text`, in order.
pub fn hangul_only(text: &str) -> String {
    text.chars().filter(|c| is_syllable(*c)).collect()
}
