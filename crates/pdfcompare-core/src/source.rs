//! Page-level access to PDF documents
//!
//! Extraction and overlay analysis only need a handful of per-page queries, so
//! they run against the [`PdfSource`] trait rather than a concrete parser:
//!
//! - [`LopdfSource`] parses PDF bytes with lopdf and reads content streams
//! - [`MemorySource`] holds pages that were already extracted elsewhere
//!   (for example by pdf.js in the browser)

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Default page size when no MediaBox can be found (US Letter)
const DEFAULT_PAGE_SIZE: (f64, f64) = (612.0, 792.0);

/// TJ kerning offsets below this value are treated as word gaps
const KERNING_SPACE_THRESHOLD: f64 = -100.0;

/// Page size at scale 1.0, in PDF points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f64,
    pub height: f64,
}

/// Per-page queries needed by the text extractor and overlay analyzer.
/// Page numbers are 1-indexed.
pub trait PdfSource {
    fn page_count(&self) -> u32;

    /// Text fragments in content-stream order
    fn page_text_fragments(&self, page: u32) -> Result<Vec<String>, SourceError>;

    fn page_dimensions(&self, page: u32) -> Result<PageDimensions, SourceError>;

    /// Whether the page paints at least one image
    fn page_has_images(&self, page: u32) -> Result<bool, SourceError>;

    fn is_encrypted(&self) -> bool {
        false
    }
}

/// lopdf-backed source
pub struct LopdfSource {
    document: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl LopdfSource {
    /// Parse PDF bytes. Encrypted documents are reported as
    /// [`SourceError::Encrypted`] rather than a parse failure.
    pub fn load(bytes: &[u8]) -> Result<Self, SourceError> {
        if bytes.len() < 8 || !bytes.starts_with(b"%PDF-") {
            return Err(SourceError::Parse(
                "Not a valid PDF file (missing %PDF- header)".into(),
            ));
        }

        let document = match Document::load_mem(bytes) {
            Ok(doc) => doc,
            Err(e) => {
                // Quick byte scan: lopdf may refuse encrypted files outright
                if bytes.windows(8).any(|w| w == b"/Encrypt") {
                    return Err(SourceError::Encrypted);
                }
                return Err(SourceError::Parse(e.to_string()));
            }
        };

        if document.is_encrypted() {
            return Err(SourceError::Encrypted);
        }

        Ok(Self::from_document(document))
    }

    /// Wrap an already-parsed document
    pub fn from_document(document: Document) -> Self {
        let pages = document.get_pages();
        Self { document, pages }
    }

    fn page_id(&self, page: u32) -> Result<ObjectId, SourceError> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(SourceError::MissingPage(page))
    }

    fn page_dict(&self, page: u32) -> Result<&Dictionary, SourceError> {
        let id = self.page_id(page)?;
        self.document
            .get_object(id)
            .and_then(Object::as_dict)
            .map_err(|e| SourceError::Content {
                page,
                message: format!("page object unreadable: {}", e),
            })
    }

    /// Decoded page operators. lopdf stops decoding at inline image data, so
    /// each `BI ... EI` block is cut out first and replaced by a bare `BI`.
    fn operations(&self, page: u32) -> Result<Vec<Operation>, SourceError> {
        let id = self.page_id(page)?;
        let bytes = self
            .document
            .get_page_content(id)
            .map_err(|e| SourceError::Content {
                page,
                message: e.to_string(),
            })?;
        let segments =
            split_inline_images(&bytes).map_err(|message| SourceError::Content { page, message })?;

        let mut operations = Vec::new();
        for (i, segment) in segments.into_iter().enumerate() {
            if i > 0 {
                operations.push(Operation::new("BI", vec![]));
            }
            if segment.iter().all(|b| is_whitespace(*b)) {
                continue;
            }
            let content = Content::decode(segment).map_err(|e| SourceError::Content {
                page,
                message: format!("content stream could not be decoded: {}", e),
            })?;
            operations.extend(content.operations);
        }
        Ok(operations)
    }

    /// Follow a reference to its target object; non-references pass through
    fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        match object {
            Object::Reference(id) => self.document.get_object(*id).ok(),
            other => Some(other),
        }
    }

    /// Look up a page attribute, walking up the page tree for inherited keys
    fn inherited<'a>(&'a self, page_dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        let mut current = page_dict;
        // Bounded walk guards against cyclic Parent chains
        for _ in 0..32 {
            if let Ok(value) = current.get(key) {
                return self.resolve(value);
            }
            let parent = current.get(b"Parent").ok()?;
            current = self.resolve(parent)?.as_dict().ok()?;
        }
        None
    }

    fn xobject_is_image(&self, page_dict: &Dictionary, name: &[u8]) -> bool {
        let Some(resources) = self
            .inherited(page_dict, b"Resources")
            .and_then(|r| r.as_dict().ok())
        else {
            return false;
        };
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|x| self.resolve(x))
            .and_then(|x| x.as_dict().ok())
        else {
            return false;
        };

        xobjects
            .get(name)
            .ok()
            .and_then(|x| self.resolve(x))
            .and_then(|x| x.as_stream().ok())
            .and_then(|stream| stream.dict.get(b"Subtype").ok())
            .and_then(|subtype| subtype.as_name().ok())
            .is_some_and(|subtype| subtype == b"Image")
    }
}

impl PdfSource for LopdfSource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text_fragments(&self, page: u32) -> Result<Vec<String>, SourceError> {
        let mut fragments = Vec::new();

        for op in self.operations(page)? {
            let operand = match op.operator.as_str() {
                "Tj" | "TJ" | "'" => op.operands.first(),
                // " takes word spacing and char spacing before the string
                "\"" => op.operands.get(2),
                _ => None,
            };
            if let Some(text) = operand.and_then(text_from_operand) {
                fragments.push(text);
            }
        }

        Ok(fragments)
    }

    fn page_dimensions(&self, page: u32) -> Result<PageDimensions, SourceError> {
        let dict = self.page_dict(page)?;

        let (width, height) = self
            .inherited(dict, b"MediaBox")
            .and_then(|mb| mb.as_array().ok())
            .and_then(|arr| {
                let nums: Vec<f64> = arr
                    .iter()
                    .filter_map(|o| self.resolve(o).and_then(number))
                    .collect();
                (nums.len() >= 4).then(|| ((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs()))
            })
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let rotation = self
            .inherited(dict, b"Rotate")
            .and_then(number)
            .map(|r| (r as i64).rem_euclid(360))
            .unwrap_or(0);

        // The viewport reports rotated pages with swapped axes
        Ok(if rotation == 90 || rotation == 270 {
            PageDimensions {
                width: height,
                height: width,
            }
        } else {
            PageDimensions { width, height }
        })
    }

    fn page_has_images(&self, page: u32) -> Result<bool, SourceError> {
        let dict = self.page_dict(page)?;
        let operations = self.operations(page)?;

        Ok(operations.iter().any(|op| match op.operator.as_str() {
            "BI" | "ID" => true,
            "Do" => op
                .operands
                .first()
                .and_then(|o| o.as_name().ok())
                .is_some_and(|name| self.xobject_is_image(dict, name)),
            _ => false,
        }))
    }

    fn is_encrypted(&self) -> bool {
        self.document.is_encrypted()
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' | b'\0')
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// `keyword` stands alone at `i`, not as part of a name or longer token
fn keyword_at(bytes: &[u8], i: usize, keyword: &[u8]) -> bool {
    if !bytes[i..].starts_with(keyword) {
        return false;
    }
    let before = i == 0 || {
        let prev = bytes[i - 1];
        is_whitespace(prev) || (is_delimiter(prev) && prev != b'/')
    };
    let after = bytes
        .get(i + keyword.len())
        .map_or(true, |&b| is_whitespace(b) || is_delimiter(b));
    before && after
}

/// Index just past the literal string opening at `start`
fn skip_literal_string(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Index just past the `EI` closing an inline image whose dictionary starts
/// at `from`
fn inline_image_end(bytes: &[u8], from: usize) -> Option<usize> {
    let data_start = (from..bytes.len()).find(|&i| keyword_at(bytes, i, b"ID"))? + 3;
    (data_start..bytes.len())
        .find(|&i| i > 0 && is_whitespace(bytes[i - 1]) && keyword_at(bytes, i, b"EI"))
        .map(|i| i + 2)
}

/// Split a content stream around its inline images. The result holds one
/// more segment than there are images.
fn split_inline_images(bytes: &[u8]) -> Result<Vec<&[u8]>, String> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'(' => i = skip_literal_string(bytes, i),
            b'%' => {
                while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
                    i += 1;
                }
            }
            b'B' if keyword_at(bytes, i, b"BI") => {
                let end = inline_image_end(bytes, i + 2)
                    .ok_or_else(|| format!("unterminated inline image at byte {}", i))?;
                segments.push(&bytes[start..i]);
                start = end;
                i = end;
            }
            _ => i += 1,
        }
    }

    segments.push(&bytes[start..]);
    Ok(segments)
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Decode a PDF string: UTF-16BE with BOM, then UTF-8, then Latin-1
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn text_from_operand(operand: &Object) -> Option<String> {
    match operand {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Array(items) => {
            let mut text = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
                    other => {
                        if number(other).is_some_and(|n| n < KERNING_SPACE_THRESHOLD) {
                            text.push(' ');
                        }
                    }
                }
            }
            Some(text)
        }
        _ => None,
    }
}

/// A page whose text was extracted outside this crate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryPage {
    #[serde(default)]
    pub fragments: Vec<String>,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub has_images: bool,
}

impl MemoryPage {
    pub fn new<S: Into<String>>(fragments: impl IntoIterator<Item = S>) -> Self {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            width: DEFAULT_PAGE_SIZE.0,
            height: DEFAULT_PAGE_SIZE.1,
            has_images: false,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_images(mut self, has_images: bool) -> Self {
        self.has_images = has_images;
        self
    }
}

/// In-memory source built from pre-extracted pages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySource {
    pub pages: Vec<MemoryPage>,
}

impl MemorySource {
    pub fn new(pages: Vec<MemoryPage>) -> Self {
        Self { pages }
    }

    fn page(&self, page: u32) -> Result<&MemoryPage, SourceError> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .ok_or(SourceError::MissingPage(page))
    }
}

impl PdfSource for MemorySource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text_fragments(&self, page: u32) -> Result<Vec<String>, SourceError> {
        Ok(self.page(page)?.fragments.clone())
    }

    fn page_dimensions(&self, page: u32) -> Result<PageDimensions, SourceError> {
        let p = self.page(page)?;
        Ok(PageDimensions {
            width: p.width,
            height: p.height,
        })
    }

    fn page_has_images(&self, page: u32) -> Result<bool, SourceError> {
        Ok(self.page(page)?.has_images)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{build_pdf, FixturePage};
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rejects_non_pdf() {
        let err = LopdfSource::load(b"definitely not a pdf").err().unwrap();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_reads_text_fragments() {
        let pdf = build_pdf(&[FixturePage::text("Hello\nWorld")]);
        let source = LopdfSource::load(&pdf).unwrap();
        assert_eq!(source.page_count(), 1);
        assert_eq!(source.page_text_fragments(1).unwrap(), vec!["Hello", "World"]);
    }

    #[test]
    fn test_missing_page() {
        let pdf = build_pdf(&[FixturePage::text("Only page")]);
        let source = LopdfSource::load(&pdf).unwrap();
        assert_eq!(
            source.page_text_fragments(2).unwrap_err(),
            SourceError::MissingPage(2)
        );
    }

    #[test]
    fn test_page_dimensions() {
        let pdf = build_pdf(&[
            FixturePage::text("Letter"),
            FixturePage::text("A4").sized(595, 842),
        ]);
        let source = LopdfSource::load(&pdf).unwrap();
        assert_eq!(
            source.page_dimensions(1).unwrap(),
            PageDimensions {
                width: 612.0,
                height: 792.0
            }
        );
        assert_eq!(
            source.page_dimensions(2).unwrap(),
            PageDimensions {
                width: 595.0,
                height: 842.0
            }
        );
    }

    #[test]
    fn test_detects_image_xobject() {
        let pdf = build_pdf(&[FixturePage::text("Text only"), FixturePage::scanned()]);
        let source = LopdfSource::load(&pdf).unwrap();
        assert!(!source.page_has_images(1).unwrap());
        assert!(source.page_has_images(2).unwrap());
    }

    #[test]
    fn test_rotated_page_swaps_axes() {
        let pdf = build_pdf(&[
            FixturePage::text("Landscape").rotated(90),
            FixturePage::text("Upside down").rotated(180),
            FixturePage::text("Other way").rotated(-90),
        ]);
        let source = LopdfSource::load(&pdf).unwrap();
        let landscape = PageDimensions {
            width: 792.0,
            height: 612.0,
        };
        assert_eq!(source.page_dimensions(1).unwrap(), landscape);
        assert_eq!(source.page_dimensions(2).unwrap().width, 612.0);
        assert_eq!(source.page_dimensions(3).unwrap(), landscape);
    }

    #[test]
    fn test_text_after_inline_image() {
        let content: &[u8] =
            b"BT /F1 12 Tf (Before) Tj ET q 8 0 0 8 0 0 cm BI /W 2 /H 1 /CS /G /BPC 8 ID \x80\xff EI Q BT (After) Tj ET";
        let pdf = build_pdf(&[FixturePage::raw(content), FixturePage::text("No images")]);
        let source = LopdfSource::load(&pdf).unwrap();
        assert_eq!(source.page_text_fragments(1).unwrap(), vec!["Before", "After"]);
        assert!(source.page_has_images(1).unwrap());
        assert!(!source.page_has_images(2).unwrap());
    }

    #[test]
    fn test_inline_image_keywords_inside_strings() {
        let content: &[u8] = b"BT (a BI b) Tj (ID EI) Tj ET";
        let segments = split_inline_images(content).unwrap();
        assert_eq!(segments, vec![content]);

        let pdf = build_pdf(&[FixturePage::raw(content)]);
        let source = LopdfSource::load(&pdf).unwrap();
        assert_eq!(source.page_text_fragments(1).unwrap(), vec!["a BI b", "ID EI"]);
        assert!(!source.page_has_images(1).unwrap());
    }

    #[test]
    fn test_split_multiple_inline_images() {
        let content: &[u8] = b"q BI /W 1 ID \x00 EI Q (x) Tj q BI /W 1 ID EIEI EI Q";
        let segments = split_inline_images(content).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1], b" Q (x) Tj q ");
        assert_eq!(segments[2], b" Q");
    }

    #[test]
    fn test_unterminated_inline_image_is_an_error() {
        let pdf = build_pdf(&[FixturePage::raw(b"BT (Before) Tj ET BI /W 1 ID \x00\x01")]);
        let source = LopdfSource::load(&pdf).unwrap();
        assert!(matches!(
            source.page_text_fragments(1),
            Err(SourceError::Content { page: 1, .. })
        ));
    }

    #[test]
    fn test_decode_utf16_string() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_pdf_string(&bytes), "Hi");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        assert_eq!(decode_pdf_string(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[test]
    fn test_tj_array_kerning_inserts_space() {
        let operand = Object::Array(vec![
            Object::String(b"Hello".to_vec(), lopdf::StringFormat::Literal),
            Object::Integer(-250),
            Object::String(b"World".to_vec(), lopdf::StringFormat::Literal),
            Object::Integer(-20),
            Object::String(b"!".to_vec(), lopdf::StringFormat::Literal),
        ]);
        assert_eq!(text_from_operand(&operand).unwrap(), "Hello World!");
    }

    #[test]
    fn test_memory_source_pages() {
        let source = MemorySource::new(vec![
            MemoryPage::new(["a", "b"]),
            MemoryPage::new(Vec::<String>::new()).with_size(100.0, 200.0).with_images(true),
        ]);
        assert_eq!(source.page_count(), 2);
        assert_eq!(source.page_text_fragments(1).unwrap(), vec!["a", "b"]);
        assert!(source.page_has_images(2).unwrap());
        assert_eq!(source.page_dimensions(2).unwrap().height, 200.0);
        assert_eq!(
            source.page_text_fragments(0).unwrap_err(),
            SourceError::MissingPage(0)
        );
    }
}
