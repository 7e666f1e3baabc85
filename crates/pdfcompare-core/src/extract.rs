//! Per-page text extraction and text/image document classification

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CompareConfig;
use crate::error::CompareError;
use crate::normalize::{count_words, join_fragments, normalize_text};
use crate::source::{LopdfSource, PdfSource};

/// Whether a document's pages mostly carry selectable text or mostly
/// scanned images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    TextBased,
    ImageBased,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::TextBased => "text-based",
            FileType::ImageBased => "image-based",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAnalysis {
    /// 1-indexed
    pub page_number: u32,
    pub has_text: bool,
    /// Length of `text` in characters
    pub text_length: usize,
    pub text: String,
}

impl PageAnalysis {
    /// Join fragments and classify against the text threshold
    pub fn from_fragments<S: AsRef<str>>(page_number: u32, fragments: &[S], threshold: usize) -> Self {
        let text = join_fragments(fragments);
        let text_length = text.chars().count();
        Self {
            page_number,
            has_text: text_length > threshold,
            text_length,
            text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTextAnalysis {
    pub file_name: String,
    pub total_pages: u32,
    pub text_based_pages: u32,
    pub image_based_pages: u32,
    /// Normalized text of all text-based pages
    pub total_text: String,
    pub page_analysis: Vec<PageAnalysis>,
    pub file_type: FileType,
    /// Share of pages agreeing with `file_type`, 0-100
    pub confidence: u32,
    pub word_count: usize,
    pub char_count: usize,
}

impl DocumentTextAnalysis {
    /// Aggregate page analyses into a document record
    pub fn from_pages(file_name: &str, pages: Vec<PageAnalysis>) -> Self {
        let total_pages = pages.len() as u32;
        let text_based_pages = pages.iter().filter(|p| p.has_text).count() as u32;
        let image_based_pages = total_pages - text_based_pages;

        let raw_text = pages
            .iter()
            .filter(|p| p.has_text)
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let total_text = normalize_text(&raw_text);

        let file_type = if text_based_pages > image_based_pages {
            FileType::TextBased
        } else {
            FileType::ImageBased
        };

        let confidence = if total_pages == 0 {
            0
        } else {
            let majority = text_based_pages.max(image_based_pages);
            (majority as f64 / total_pages as f64 * 100.0).round() as u32
        };

        Self {
            file_name: file_name.to_string(),
            total_pages,
            text_based_pages,
            image_based_pages,
            word_count: count_words(&total_text),
            char_count: total_text.chars().count(),
            total_text,
            page_analysis: pages,
            file_type,
            confidence,
        }
    }

    pub fn is_image_based(&self) -> bool {
        self.file_type == FileType::ImageBased
    }
}

/// Extract and classify every page of `source`. The first failing page
/// aborts the whole extraction.
pub fn analyze_document<S: PdfSource + ?Sized>(
    source: &S,
    file_name: &str,
    config: &CompareConfig,
) -> Result<DocumentTextAnalysis, CompareError> {
    if source.is_encrypted() {
        return Err(CompareError::PasswordProtected(file_name.to_string()));
    }

    let page_count = source.page_count();
    let mut pages = Vec::with_capacity(page_count as usize);

    for page_number in 1..=page_count {
        let fragments = source
            .page_text_fragments(page_number)
            .map_err(|e| CompareError::from_source(file_name, e))?;
        let page = PageAnalysis::from_fragments(page_number, &fragments, config.text_page_threshold);
        debug!(
            file = file_name,
            page = page_number,
            chars = page.text_length,
            has_text = page.has_text,
            "Classified page"
        );
        pages.push(page);
    }

    let analysis = DocumentTextAnalysis::from_pages(file_name, pages);
    info!(
        file = file_name,
        pages = analysis.total_pages,
        text_pages = analysis.text_based_pages,
        file_type = %analysis.file_type,
        confidence = analysis.confidence,
        "Extracted document text"
    );
    Ok(analysis)
}

/// Parse PDF bytes with lopdf and analyze them
pub fn analyze_pdf_bytes(
    bytes: &[u8],
    file_name: &str,
    config: &CompareConfig,
) -> Result<DocumentTextAnalysis, CompareError> {
    let source = LopdfSource::load(bytes).map_err(|e| CompareError::from_source(file_name, e))?;
    analyze_document(&source, file_name, config)
}
