//! Similarity metrics: Jaccard over word sets, Levenshtein over whole texts,
//! and shared n-gram phrases

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Overlap statistics between two word sets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordSetOverlap {
    /// |intersection| / |union| as a percentage, 0 for an empty union
    pub jaccard: f64,
    pub common_words: usize,
    pub unique_words_left: usize,
    pub unique_words_right: usize,
}

pub fn word_set_overlap(left: &[String], right: &[String]) -> WordSetOverlap {
    let left: HashSet<&str> = left.iter().map(String::as_str).collect();
    let right: HashSet<&str> = right.iter().map(String::as_str).collect();

    let common = left.intersection(&right).count();
    let union = left.len() + right.len() - common;

    WordSetOverlap {
        jaccard: if union == 0 {
            0.0
        } else {
            common as f64 / union as f64 * 100.0
        },
        common_words: common,
        unique_words_left: left.len() - common,
        unique_words_right: right.len() - common,
    }
}

/// Edit-distance similarity as a percentage of the longer text's length.
/// Two empty texts are identical.
pub fn levenshtein_similarity(left: &str, right: &str) -> f64 {
    let max_len = left.chars().count().max(right.chars().count());
    if max_len == 0 {
        return 100.0;
    }
    let distance = strsim::levenshtein(left, right);
    (max_len - distance) as f64 / max_len as f64 * 100.0
}

/// Sliding-window n-grams joined with single spaces
pub fn ngrams(tokens: &[String], n: usize) -> Vec<String> {
    if n == 0 || tokens.len() < n {
        return Vec::new();
    }
    tokens.windows(n).map(|w| w.join(" ")).collect()
}

/// N-grams present in both token streams, unique, in left-side order,
/// truncated to `cap`
pub fn common_phrases(left: &[String], right: &[String], n: usize, cap: usize) -> Vec<String> {
    let right: HashSet<String> = ngrams(right, n).into_iter().collect();
    let mut seen = HashSet::new();

    ngrams(left, n)
        .into_iter()
        .filter(|gram| right.contains(gram) && seen.insert(gram.clone()))
        .take(cap)
        .collect()
}

/// Round a percentage to an integer score clamped to 0-100
pub fn to_score(value: f64) -> u32 {
    value.round().clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::word_tokens;
    use pretty_assertions::assert_eq;

    fn tokens(text: &str) -> Vec<String> {
        word_tokens(text, 3)
    }

    #[test]
    fn test_jaccard_identical() {
        let t = tokens("alpha beta gamma");
        let overlap = word_set_overlap(&t, &t);
        assert_eq!(overlap.jaccard, 100.0);
        assert_eq!(overlap.common_words, 3);
        assert_eq!(overlap.unique_words_left, 0);
    }

    #[test]
    fn test_jaccard_disjoint() {
        let overlap = word_set_overlap(&tokens("alpha beta gamma"), &tokens("delta epsilon"));
        assert_eq!(overlap.jaccard, 0.0);
        assert_eq!(overlap.unique_words_left, 3);
        assert_eq!(overlap.unique_words_right, 2);
    }

    #[test]
    fn test_jaccard_empty() {
        assert_eq!(word_set_overlap(&[], &[]).jaccard, 0.0);
    }

    #[test]
    fn test_jaccard_ignores_duplicates() {
        let overlap = word_set_overlap(&tokens("one one one two"), &tokens("one two two"));
        assert_eq!(overlap.jaccard, 100.0);
    }

    #[test]
    fn test_levenshtein_known_distance() {
        // kitten -> sitting is the textbook distance of 3 over 7 chars
        let sim = levenshtein_similarity("kitten", "sitting");
        assert!((sim - 4.0 / 7.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_levenshtein_edges() {
        assert_eq!(levenshtein_similarity("", ""), 100.0);
        assert_eq!(levenshtein_similarity("abc", ""), 0.0);
        assert_eq!(levenshtein_similarity("same", "same"), 100.0);
    }

    #[test]
    fn test_ngrams_window() {
        let grams = ngrams(&tokens("one two three four"), 3);
        assert_eq!(grams, vec!["one two three", "two three four"]);
        assert!(ngrams(&tokens("one two"), 3).is_empty());
    }

    #[test]
    fn test_common_phrases_identical_ten_words() {
        let text = "alpha bravo charlie delta echo foxtrot golf hotel india juliet";
        let t = tokens(text);
        let phrases = common_phrases(&t, &t, 3, 10);
        assert_eq!(phrases.len(), 8);
        assert_eq!(phrases[0], "alpha bravo charlie");
        assert_eq!(phrases[7], "hotel india juliet");
    }

    #[test]
    fn test_common_phrases_capped_and_unique() {
        let left = tokens("red green blue red green blue red green blue");
        let phrases = common_phrases(&left, &left, 3, 10);
        assert_eq!(
            phrases,
            vec!["red green blue", "green blue red", "blue red green"]
        );

        let long: Vec<String> = (0..40).map(|i| format!("word{}", i)).collect();
        assert_eq!(common_phrases(&long, &long, 3, 10).len(), 10);
    }

    #[test]
    fn test_to_score_bounds() {
        assert_eq!(to_score(99.6), 100);
        assert_eq!(to_score(-3.0), 0);
        assert_eq!(to_score(140.0), 100);
    }
}
