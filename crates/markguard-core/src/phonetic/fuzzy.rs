//! Character-level string similarity measures.
//!
//! `indel_ratio` and `partial_ratio` return 0 to 100; `jaro_winkler`
//! returns 0 to 1. All operate on Unicode scalar values.

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                row[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

fn indel_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Normalized insertion/deletion similarity: `2 * LCS / (|a| + |b|)`.
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    indel_chars(&a, &b)
}

/// Best [`indel_ratio`] of the shorter string against every alignment on
/// the longer one, including windows hanging off either end.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let (n, m) = (short.len(), long.len());
    let mut best = 0.0f64;
    let windows = (1..n)
        .map(|end| &long[..end])
        .chain((0..=m - n).map(|start| &long[start..start + n]))
        .chain((m - n + 1..m).map(|start| &long[start..]));
    for window in windows {
        best = best.max(indel_chars(short, window));
        if best >= 100.0 {
            break;
        }
    }
    best
}

fn jaro(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ca) in a.iter().enumerate() {
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(b.len());
        for j in lo..hi {
            if !b_matched[j] && b[j] == *ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }
    if matches == 0 {
        return 0.0;
    }

    let a_seq = a.iter().zip(&a_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    let b_seq = b.iter().zip(&b_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    let half_transpositions = a_seq.zip(b_seq).filter(|(x, y)| x != y).count();

    let m = matches as f64;
    let t = (half_transpositions / 2) as f64;
    (m / a.len() as f64 + m / b.len() as f64 + (m - t) / m) / 3.0
}

/// Jaro similarity boosted by a common prefix of up to four characters,
/// applied only above 0.7.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let sim = jaro(&a, &b);
    if sim <= 0.7 {
        return sim;
    }
    let prefix = a.iter().zip(&b).take(4).take_while(|(x, y)| x == y).count();
    sim + prefix as f64 * 0.1 * (1.0 - sim)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn indel_ratio_matches_lcs_definition() {
        assert!(close(indel_ratio("abc", "abc"), 100.0));
        assert!(close(indel_ratio("abcd", "abxd"), 75.0));
        assert!(close(indel_ratio("", ""), 100.0));
        assert!(close(indel_ratio("a", ""), 0.0));
    }

    #[test]
    fn partial_ratio_finds_contained_strings() {
        assert!(close(partial_ratio("나이키", "나이키에어"), 100.0));
        assert!(close(partial_ratio("에어맥스", "맥스"), 100.0));
        // best window hangs off the right edge: "cd" vs "d"
        assert!(close(partial_ratio("cd", "abd"), 200.0 / 3.0));
        assert!(close(partial_ratio("", "abc"), 0.0));
    }

    #[test]
    fn jaro_winkler_reference_values() {
        assert!(close(jaro_winkler("martha", "marhta"), 0.961_111_111_111_111_1));
        assert!(close(jaro_winkler("abc", "abc"), 1.0));
        assert!(close(jaro_winkler("abc", "xyz"), 0.0));
        assert!(close(jaro_winkler("", ""), 1.0));
    }
}
