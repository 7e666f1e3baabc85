//! Comparison thresholds
//!
//! Every cutoff used by extraction, comparison and overlay analysis lives here
//! as a named constant and as an overridable field of [`CompareConfig`].

use serde::{Deserialize, Serialize};

use crate::error::CompareError;

/// A page "has text" when its joined text is longer than this many characters
pub const TEXT_PAGE_THRESHOLD: usize = 50;
/// Window size for common-phrase n-grams
pub const NGRAM_SIZE: usize = 3;
/// Word-set tokens shorter than this are ignored
pub const MIN_WORD_LENGTH: usize = 3;
/// Rendering caps for result lists
pub const WORD_DIFF_CAP: usize = 50;
pub const SENTENCE_DIFF_CAP: usize = 20;
pub const COMMON_PHRASE_CAP: usize = 10;
/// Per-axis tolerance (PDF points) for overlay page dimension matching
pub const DIMENSION_TOLERANCE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompareConfig {
    pub text_page_threshold: usize,
    pub ngram_size: usize,
    pub min_word_length: usize,
    pub word_diff_cap: usize,
    pub sentence_diff_cap: usize,
    pub common_phrase_cap: usize,
    pub dimension_tolerance: f64,
    /// Weight of text similarity in the overlay score
    pub text_weight: f64,
    /// Weight of dimension similarity in the overlay score
    pub dimension_weight: f64,
    /// Dimension similarity used when both axes match
    pub matched_dimension_similarity: f64,
    /// Dimension similarity used when either axis is off
    pub mismatched_dimension_similarity: f64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            text_page_threshold: TEXT_PAGE_THRESHOLD,
            ngram_size: NGRAM_SIZE,
            min_word_length: MIN_WORD_LENGTH,
            word_diff_cap: WORD_DIFF_CAP,
            sentence_diff_cap: SENTENCE_DIFF_CAP,
            common_phrase_cap: COMMON_PHRASE_CAP,
            dimension_tolerance: DIMENSION_TOLERANCE,
            text_weight: 0.7,
            dimension_weight: 0.3,
            matched_dimension_similarity: 100.0,
            mismatched_dimension_similarity: 70.0,
        }
    }
}

impl CompareConfig {
    pub fn validate(&self) -> Result<(), CompareError> {
        if self.ngram_size == 0 {
            return Err(CompareError::InvalidConfig(
                "ngramSize must be at least 1".into(),
            ));
        }
        if !self.dimension_tolerance.is_finite() || self.dimension_tolerance < 0.0 {
            return Err(CompareError::InvalidConfig(format!(
                "dimensionTolerance must be a non-negative number, got {}",
                self.dimension_tolerance
            )));
        }

        let weights = [self.text_weight, self.dimension_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(CompareError::InvalidConfig(
                "Overlay weights must be non-negative".into(),
            ));
        }
        if (self.text_weight + self.dimension_weight - 1.0).abs() > 1e-6 {
            return Err(CompareError::InvalidConfig(format!(
                "Overlay weights must sum to 1 (got {} + {})",
                self.text_weight, self.dimension_weight
            )));
        }

        for level in [
            self.matched_dimension_similarity,
            self.mismatched_dimension_similarity,
        ] {
            if !(0.0..=100.0).contains(&level) {
                return Err(CompareError::InvalidConfig(format!(
                    "Dimension similarity levels must be within 0-100, got {}",
                    level
                )));
            }
        }

        Ok(())
    }
}
