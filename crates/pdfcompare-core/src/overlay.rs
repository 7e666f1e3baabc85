//! Overlay comparison of one page from each of two documents
//!
//! The "down" layer is drawn underneath and the "up" layer on top. Besides
//! the rendering settings the UI needs, the analysis reports a word diff of
//! the two pages, whether their sizes line up, and a blended score.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::CompareConfig;
use crate::diff::{diff_words, summarize_word_changes, ChangeSummary, DiffPart};
use crate::error::CompareError;
use crate::normalize::join_fragments;
use crate::similarity::to_score;
use crate::source::PdfSource;

/// One page of one document, as seen by the overlay view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub file_name: String,
    pub page_number: u32,
    pub total_pages: u32,
    pub text: String,
    pub width: f64,
    pub height: f64,
    pub has_images: bool,
}

impl PageSnapshot {
    /// Read text, size and image presence for one page
    pub fn capture<S: PdfSource + ?Sized>(
        source: &S,
        file_name: &str,
        page_number: u32,
    ) -> Result<Self, CompareError> {
        if source.is_encrypted() {
            return Err(CompareError::PasswordProtected(file_name.to_string()));
        }

        let total_pages = source.page_count();
        if page_number == 0 || page_number > total_pages {
            return Err(CompareError::PageOutOfRange {
                file_name: file_name.to_string(),
                page: page_number,
                page_count: total_pages,
            });
        }

        let wrap = |e| CompareError::from_source(file_name, e);
        let fragments = source.page_text_fragments(page_number).map_err(wrap)?;
        let dimensions = source.page_dimensions(page_number).map_err(wrap)?;
        let has_images = source.page_has_images(page_number).map_err(wrap)?;

        Ok(Self {
            file_name: file_name.to_string(),
            page_number,
            total_pages,
            text: join_fragments(&fragments),
            width: dimensions.width,
            height: dimensions.height,
            has_images,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDifferences {
    #[serde(flatten)]
    pub changes: ChangeSummary,
    /// Share of unchanged words, 0-100
    pub text_similarity: u32,
    pub parts: Vec<DiffPart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionMatch {
    pub width_match: bool,
    pub height_match: bool,
    pub perfect_match: bool,
    pub width_difference: f64,
    pub height_difference: f64,
}

impl DimensionMatch {
    /// Axes match when they differ by less than `tolerance` points
    pub fn between(down: &PageSnapshot, up: &PageSnapshot, tolerance: f64) -> Self {
        let width_difference = (down.width - up.width).abs();
        let height_difference = (down.height - up.height).abs();
        let width_match = width_difference < tolerance;
        let height_match = height_difference < tolerance;
        Self {
            width_match,
            height_match,
            perfect_match: width_match && height_match,
            width_difference,
            height_difference,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayDifferences {
    pub text_differences: TextDifferences,
    pub dimension_match: DimensionMatch,
    pub similarity_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlaySettings {
    /// Up-layer opacity, 0-100
    pub opacity: u32,
    pub blend_mode: String,
    pub down_layer_color: String,
    pub up_layer_color: String,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            opacity: 50,
            blend_mode: "difference".to_string(),
            down_layer_color: "#ff0000".to_string(),
            up_layer_color: "#0000ff".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayComparison {
    pub down_layer: PageSnapshot,
    pub up_layer: PageSnapshot,
    pub differences: OverlayDifferences,
    pub overlay_settings: OverlaySettings,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayAnalyzer {
    config: CompareConfig,
}

impl OverlayAnalyzer {
    pub fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    /// Capture both pages and compare them. Any capture failure aborts the
    /// whole analysis.
    pub fn analyze<D, U>(
        &self,
        down: (&D, &str, u32),
        up: (&U, &str, u32),
        settings: OverlaySettings,
    ) -> Result<OverlayComparison, CompareError>
    where
        D: PdfSource + ?Sized,
        U: PdfSource + ?Sized,
    {
        let down = PageSnapshot::capture(down.0, down.1, down.2)?;
        let up = PageSnapshot::capture(up.0, up.1, up.2)?;
        Ok(self.compare(down, up, settings))
    }

    pub fn compare(
        &self,
        down: PageSnapshot,
        up: PageSnapshot,
        settings: OverlaySettings,
    ) -> OverlayComparison {
        let config = &self.config;

        let mut parts = diff_words(&down.text.to_lowercase(), &up.text.to_lowercase());
        let changes = summarize_word_changes(&parts);
        parts.truncate(config.word_diff_cap);

        let text_similarity = match changes.total() {
            0 => 100.0,
            total => changes.unchanged as f64 / total as f64 * 100.0,
        };

        let dimension_match = DimensionMatch::between(&down, &up, config.dimension_tolerance);
        // Step function, not a continuous measure of the size difference
        let dimension_similarity = if dimension_match.perfect_match {
            config.matched_dimension_similarity
        } else {
            config.mismatched_dimension_similarity
        };

        let similarity_score = to_score(
            text_similarity * config.text_weight + dimension_similarity * config.dimension_weight,
        );

        info!(
            down = %down.file_name,
            down_page = down.page_number,
            up = %up.file_name,
            up_page = up.page_number,
            similarity_score,
            perfect_match = dimension_match.perfect_match,
            "Overlay analysis complete"
        );

        OverlayComparison {
            down_layer: down,
            up_layer: up,
            differences: OverlayDifferences {
                text_differences: TextDifferences {
                    changes,
                    text_similarity: to_score(text_similarity),
                    parts,
                },
                dimension_match,
                similarity_score,
            },
            overlay_settings: settings,
        }
    }
}
