//! PDF text comparison
//!
//! This crate compares two PDFs in two ways:
//! - Semantic: extract and normalize each document's text, classify it as
//!   text-based or image-based, then score similarity (Jaccard, Levenshtein,
//!   shared phrases) and produce word and sentence diffs
//! - Overlay: compare a single page from each document, including text diff
//!   and page-size alignment, for a stacked visual view
//!
//! Image-based (scanned) documents are never scored. The OCR gate reports
//! them instead of producing meaningless similarity numbers.
//!
//! PDF access goes through the [`PdfSource`] trait, so the same pipeline runs
//! on lopdf-parsed bytes or on text already extracted in the browser.

pub mod compare;
pub mod config;
pub mod coords;
pub mod diff;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod overlay;
pub mod session;
pub mod similarity;
pub mod source;

pub use compare::{compare_analyses, ComparisonOutcome, ComparisonResult, OcrRequired, TextComparator};
pub use config::CompareConfig;
pub use diff::{ChangeSummary, DiffPart};
pub use error::{CompareError, SourceError};
pub use extract::{analyze_document, analyze_pdf_bytes, DocumentTextAnalysis, FileType, PageAnalysis};
pub use overlay::{OverlayAnalyzer, OverlayComparison, OverlaySettings, PageSnapshot};
pub use session::{Applied, Generation, Mode, SessionState};
pub use source::{LopdfSource, MemoryPage, MemorySource, PageDimensions, PdfSource};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, CompareError> {
    let source = LopdfSource::load(bytes).map_err(|e| CompareError::from_source("document", e))?;
    Ok(source.page_count())
}

/// Extract both PDFs and compare them, going through the OCR gate
pub fn compare_pdfs(
    left: (&str, &[u8]),
    right: (&str, &[u8]),
    config: &CompareConfig,
) -> Result<ComparisonOutcome, CompareError> {
    config.validate()?;
    let left = analyze_pdf_bytes(left.1, left.0, config)?;
    let right = analyze_pdf_bytes(right.1, right.0, config)?;
    compare_analyses(&left, &right, config)
}

/// Overlay one page of each PDF
pub fn overlay_pdfs(
    down: (&str, &[u8], u32),
    up: (&str, &[u8], u32),
    settings: OverlaySettings,
    config: &CompareConfig,
) -> Result<OverlayComparison, CompareError> {
    config.validate()?;
    let down_source = LopdfSource::load(down.1).map_err(|e| CompareError::from_source(down.0, e))?;
    let up_source = LopdfSource::load(up.1).map_err(|e| CompareError::from_source(up.0, e))?;
    OverlayAnalyzer::new(config.clone()).analyze(
        (&down_source, down.0, down.2),
        (&up_source, up.0, up.2),
        settings,
    )
}
