//! Text comparison and the OCR gate
//!
//! [`TextComparator::compare_texts`] computes diffs and similarity scores for
//! two plain strings. [`compare_analyses`] sits in front of it and refuses to
//! score documents whose text could not be extracted (scanned/image-based),
//! returning [`ComparisonOutcome::RequiresOcr`] instead.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::CompareConfig;
use crate::diff::{
    changed_char_count, diff_arrays, diff_chars, diff_words, summarize_word_changes,
    ChangeSummary, DiffPart,
};
use crate::error::CompareError;
use crate::extract::{DocumentTextAnalysis, FileType};
use crate::normalize::{count_words, sentences, word_tokens};
use crate::similarity::{common_phrases, levenshtein_similarity, to_score, word_set_overlap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityScores {
    pub jaccard: u32,
    pub levenshtein: u32,
    pub overall: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTypes {
    pub left: FileType,
    pub right: FileType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub similarity: SimilarityScores,
    pub changes: ChangeSummary,
    /// Inserted plus deleted characters in the character diff
    pub char_change_count: usize,
    pub common_words: usize,
    pub unique_words_left: usize,
    pub unique_words_right: usize,
    pub common_phrases: Vec<String>,
    pub word_diff: Vec<DiffPart>,
    pub sentence_diff: Vec<DiffPart<Vec<String>>>,
    pub left_word_count: usize,
    pub right_word_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_types: Option<FileTypes>,
}

/// Returned instead of a comparison when either side is image-based
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrRequired {
    #[serde(rename = "requiresOCR")]
    pub requires_ocr: bool,
    pub left_is_image_based: bool,
    pub right_is_image_based: bool,
    pub left_analysis: DocumentTextAnalysis,
    pub right_analysis: DocumentTextAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparisonOutcome {
    Compared(ComparisonResult),
    RequiresOcr(OcrRequired),
}

impl ComparisonOutcome {
    pub fn requires_ocr(&self) -> bool {
        matches!(self, ComparisonOutcome::RequiresOcr(_))
    }

    pub fn result(&self) -> Option<&ComparisonResult> {
        match self {
            ComparisonOutcome::Compared(result) => Some(result),
            ComparisonOutcome::RequiresOcr(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextComparator {
    config: CompareConfig,
}

impl TextComparator {
    pub fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Compare two texts. Returns `None` when either side is blank.
    pub fn compare_texts(&self, left: &str, right: &str) -> Option<ComparisonResult> {
        if left.trim().is_empty() || right.trim().is_empty() {
            return None;
        }

        let left = left.to_lowercase();
        let right = right.to_lowercase();
        let config = &self.config;

        let char_change_count = changed_char_count(&diff_chars(&left, &right));

        let mut word_diff = diff_words(&left, &right);
        let changes = summarize_word_changes(&word_diff);
        word_diff.truncate(config.word_diff_cap);

        let mut sentence_diff = diff_arrays(&sentences(&left), &sentences(&right));
        sentence_diff.truncate(config.sentence_diff_cap);

        let left_tokens = word_tokens(&left, config.min_word_length);
        let right_tokens = word_tokens(&right, config.min_word_length);
        let overlap = word_set_overlap(&left_tokens, &right_tokens);

        let levenshtein = levenshtein_similarity(&left, &right);
        let overall = (overlap.jaccard + levenshtein) / 2.0;

        Some(ComparisonResult {
            similarity: SimilarityScores {
                jaccard: to_score(overlap.jaccard),
                levenshtein: to_score(levenshtein),
                overall: to_score(overall),
            },
            changes,
            char_change_count,
            common_words: overlap.common_words,
            unique_words_left: overlap.unique_words_left,
            unique_words_right: overlap.unique_words_right,
            common_phrases: common_phrases(
                &left_tokens,
                &right_tokens,
                config.ngram_size,
                config.common_phrase_cap,
            ),
            word_diff,
            sentence_diff,
            left_word_count: count_words(&left),
            right_word_count: count_words(&right),
            file_types: None,
        })
    }
}

/// Compare two extracted documents, short-circuiting to the OCR variant
/// when either is image-based
pub fn compare_analyses(
    left: &DocumentTextAnalysis,
    right: &DocumentTextAnalysis,
    config: &CompareConfig,
) -> Result<ComparisonOutcome, CompareError> {
    if left.is_image_based() || right.is_image_based() {
        warn!(
            left = %left.file_name,
            right = %right.file_name,
            left_type = %left.file_type,
            right_type = %right.file_type,
            "Image-based document, OCR required before comparison"
        );
        return Ok(ComparisonOutcome::RequiresOcr(OcrRequired {
            requires_ocr: true,
            left_is_image_based: left.is_image_based(),
            right_is_image_based: right.is_image_based(),
            left_analysis: left.clone(),
            right_analysis: right.clone(),
        }));
    }

    let comparator = TextComparator::new(config.clone());
    let mut result = comparator
        .compare_texts(&left.total_text, &right.total_text)
        .ok_or_else(|| {
            CompareError::EmptyText(format!(
                "'{}' or '{}' has no extractable text",
                left.file_name, right.file_name
            ))
        })?;
    result.file_types = Some(FileTypes {
        left: left.file_type,
        right: right.file_type,
    });

    info!(
        left = %left.file_name,
        right = %right.file_name,
        overall = result.similarity.overall,
        changed = result.changes.change_percentage,
        "Compared documents"
    );
    Ok(ComparisonOutcome::Compared(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PageAnalysis;
    use pretty_assertions::assert_eq;

    fn compare(left: &str, right: &str) -> ComparisonResult {
        TextComparator::default().compare_texts(left, right).unwrap()
    }

    fn analysis(name: &str, page_texts: &[&str]) -> DocumentTextAnalysis {
        let pages = page_texts
            .iter()
            .enumerate()
            .map(|(i, text)| PageAnalysis::from_fragments(i as u32 + 1, &[*text], 50))
            .collect();
        DocumentTextAnalysis::from_pages(name, pages)
    }

    const CONTRACT: &str = "The tenant shall pay rent on the first day of each month \
        to the landlord at the address listed above.";

    #[test]
    fn test_identical_texts_score_full() {
        let result = compare(CONTRACT, CONTRACT);
        assert_eq!(
            result.similarity,
            SimilarityScores {
                jaccard: 100,
                levenshtein: 100,
                overall: 100
            }
        );
        assert_eq!(result.changes.added, 0);
        assert_eq!(result.changes.removed, 0);
        assert_eq!(result.changes.change_percentage, 0);
        assert_eq!(result.char_change_count, 0);
    }

    #[test]
    fn test_case_is_ignored() {
        let result = compare("Hello World Again", "hello world again");
        assert_eq!(result.similarity.overall, 100);
    }

    #[test]
    fn test_disjoint_vocabulary() {
        let result = compare("alpha beta gamma", "delta epsilon zeta");
        assert_eq!(result.similarity.jaccard, 0);
        assert_eq!(result.common_words, 0);
        assert!(result.common_phrases.is_empty());
    }

    #[test]
    fn test_appended_word_scenario() {
        let result = compare(
            "The quick brown fox jumps.",
            "The quick brown fox jumps today.",
        );
        assert_eq!(result.changes.added, 1);
        assert_eq!(result.changes.removed, 0);
        assert!(result.similarity.overall > 80);
        assert_eq!(result.left_word_count, 5);
        assert_eq!(result.right_word_count, 6);
    }

    #[test]
    fn test_change_counts_match_diff_parts() {
        let result = compare(
            "one two three four five six",
            "one two 3 four five seven eight",
        );
        let total: usize = result.word_diff.iter().map(|p| count_words(&p.value)).sum();
        assert_eq!(result.changes.total(), total);
        assert!(result.changes.change_percentage > 0);
    }

    #[test]
    fn test_common_phrases_identical_ten_words() {
        let text = "alpha bravo charlie delta echo foxtrot golf hotel india juliet";
        let result = compare(text, text);
        assert_eq!(result.common_phrases.len(), 8);
    }

    #[test]
    fn test_diff_caps() {
        let left: String = (0..200).map(|i| format!("w{} ", i)).collect();
        let right: String = (0..200).map(|i| format!("x{} ", i)).collect();
        let result = compare(&left, &right);
        assert!(result.word_diff.len() <= 50);
        assert!(result.sentence_diff.len() <= 20);

        let config = CompareConfig {
            word_diff_cap: 2,
            ..Default::default()
        };
        let result = TextComparator::new(config).compare_texts(&left, &right).unwrap();
        assert!(result.word_diff.len() <= 2);
        // Counts are taken before truncation
        assert_eq!(result.changes.total(), 400);
    }

    #[test]
    fn test_sentence_diff() {
        let result = compare(
            "First sentence. Second sentence! Third one?",
            "First sentence. Another sentence! Third one?",
        );
        let removed: Vec<&DiffPart<Vec<String>>> =
            result.sentence_diff.iter().filter(|p| p.removed).collect();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].value, vec!["second sentence".to_string()]);
    }

    #[test]
    fn test_blank_side_returns_none() {
        let comparator = TextComparator::default();
        assert!(comparator.compare_texts("", "text").is_none());
        assert!(comparator.compare_texts("text", "   ").is_none());
    }

    #[test]
    fn test_ocr_gate_short_circuits() {
        let left = analysis("typed.pdf", &[CONTRACT]);
        let right = analysis("scan.pdf", &[""]);
        let outcome = compare_analyses(&left, &right, &CompareConfig::default()).unwrap();
        assert!(outcome.requires_ocr());
        assert!(outcome.result().is_none());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["requiresOCR"], true);
        assert_eq!(json["leftIsImageBased"], false);
        assert_eq!(json["rightIsImageBased"], true);
        assert!(json.get("similarity").is_none());
    }

    #[test]
    fn test_text_documents_are_compared() {
        let left = analysis("a.pdf", &[CONTRACT]);
        let right = analysis("b.pdf", &[CONTRACT]);
        let outcome = compare_analyses(&left, &right, &CompareConfig::default()).unwrap();
        let result = outcome.result().unwrap();
        assert_eq!(result.similarity.overall, 100);
        assert_eq!(
            result.file_types,
            Some(FileTypes {
                left: FileType::TextBased,
                right: FileType::TextBased
            })
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("requiresOCR").is_none());
        assert_eq!(json["fileTypes"]["left"], "text-based");
        assert!(json["changes"]["changePercentage"].is_u64());
    }

    #[test]
    fn test_outcome_round_trips_untagged() {
        let left = analysis("a.pdf", &[CONTRACT]);
        let right = analysis("scan.pdf", &[""]);
        let outcome = compare_analyses(&left, &right, &CompareConfig::default()).unwrap();
        let json = serde_json::to_string(&outcome).unwrap();
        let back: ComparisonOutcome = serde_json::from_str(&json).unwrap();
        assert!(back.requires_ocr());
    }
}
