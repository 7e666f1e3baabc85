//! Stateful comparison session
//!
//! Documents, the selected mode and the latest results live in Rust. The
//! JavaScript side stamps each request with `beginRequest()` and passes the
//! stamp back with the work; results for an outdated stamp come back as
//! `null` and never replace newer state.

use pdfcompare_core::{
    analyze_document, compare_analyses, CompareConfig, CompareError, ComparisonOutcome,
    DocumentTextAnalysis, Generation, LopdfSource, MemoryPage, MemorySource, Mode, OverlayAnalyzer,
    OverlayComparison, OverlaySettings, PdfSource, SessionState,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::storage;

/// Where a document's pages come from
enum DocumentSource {
    /// Parsed in Rust from the uploaded bytes
    Parsed(LopdfSource),
    /// Text already extracted in the browser (pdf.js)
    Extracted(MemorySource),
}

impl DocumentSource {
    fn as_source(&self) -> &dyn PdfSource {
        match self {
            DocumentSource::Parsed(source) => source,
            DocumentSource::Extracted(source) => source,
        }
    }
}

struct DocumentEntry {
    id: String,
    name: String,
    source: DocumentSource,
}

/// Document info for JS serialization
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub id: String,
    pub name: String,
    pub page_count: u32,
}

/// PDF comparison session
#[wasm_bindgen]
pub struct CompareSession {
    state: SessionState,
    config: CompareConfig,
    documents: Vec<DocumentEntry>,
    next_id: u32,
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn optional_to_js<T: Serialize>(value: Option<&T>) -> Result<JsValue, JsValue> {
    match value {
        Some(v) => to_js(v),
        None => Ok(JsValue::NULL),
    }
}

fn err_to_js(e: String) -> JsValue {
    JsValue::from_str(&e)
}

fn describe(e: CompareError) -> String {
    format!("{} ({})", e, e.code())
}

impl CompareSession {
    /// Session with an explicit mode, bypassing localStorage
    pub fn with_mode(mode: Mode) -> Self {
        Self {
            state: SessionState::new(mode),
            config: CompareConfig::default(),
            documents: Vec::new(),
            next_id: 1,
        }
    }

    fn entry(&self, id: &str) -> Result<&DocumentEntry, String> {
        self.documents
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| format!("Unknown document '{}'", id))
    }

    fn push_document(&mut self, name: &str, source: DocumentSource) -> DocumentInfo {
        let id = format!("doc-{}", self.next_id);
        self.next_id += 1;

        let info = DocumentInfo {
            id: id.clone(),
            name: name.to_string(),
            page_count: source.as_source().page_count(),
        };
        self.documents.push(DocumentEntry {
            id: id.clone(),
            name: name.to_string(),
            source,
        });
        self.state.add_file(id);
        info
    }

    /// Internal method to add a document (testable without JsValue)
    pub(crate) fn add_document_internal(
        &mut self,
        name: &str,
        bytes: &[u8],
    ) -> Result<DocumentInfo, String> {
        let source =
            LopdfSource::load(bytes).map_err(|e| describe(CompareError::from_source(name, e)))?;
        Ok(self.push_document(name, DocumentSource::Parsed(source)))
    }

    pub(crate) fn add_extracted_internal(
        &mut self,
        name: &str,
        pages: Vec<MemoryPage>,
    ) -> Result<DocumentInfo, String> {
        if pages.is_empty() {
            return Err(format!("'{}' has no pages", name));
        }
        Ok(self.push_document(name, DocumentSource::Extracted(MemorySource::new(pages))))
    }

    pub(crate) fn remove_document_internal(&mut self, id: &str) -> bool {
        let before = self.documents.len();
        self.documents.retain(|d| d.id != id);
        self.state.remove_file(id);
        self.documents.len() != before
    }

    pub(crate) fn set_mode_internal(&mut self, mode: &str) -> Result<bool, String> {
        let mode: Mode = mode.parse()?;
        Ok(self.state.set_mode(mode))
    }

    pub(crate) fn set_config_internal(&mut self, config: CompareConfig) -> Result<(), String> {
        config.validate().map_err(describe)?;
        self.config = config;
        // Cached analyses were classified with the old thresholds
        self.state.clear_analyses();
        Ok(())
    }

    /// Analysis for one document, reusing the cached copy when present.
    /// `Ok(None)` means the request went stale.
    pub(crate) fn analyze_internal(
        &mut self,
        generation: Generation,
        id: &str,
    ) -> Result<Option<DocumentTextAnalysis>, String> {
        if !self.state.is_current(generation) {
            return Ok(None);
        }
        if let Some(cached) = self.state.cached_analysis(id) {
            return Ok(Some(cached.clone()));
        }
        let entry = self.entry(id)?;
        let analysis =
            analyze_document(entry.source.as_source(), &entry.name, &self.config).map_err(describe)?;
        if self.state.record_analysis(generation, id, analysis.clone()).is_current() {
            Ok(Some(analysis))
        } else {
            Ok(None)
        }
    }

    /// Compare two documents. `Ok(None)` means the request went stale.
    pub(crate) fn compare_internal(
        &mut self,
        generation: Generation,
        left_id: &str,
        right_id: &str,
    ) -> Result<Option<ComparisonOutcome>, String> {
        if self.state.mode() != Mode::Semantic {
            return Err("Text comparison requires semantic mode".to_string());
        }
        if !self.state.is_current(generation) {
            return Ok(None);
        }

        let Some(left) = self.analyze_internal(generation, left_id)? else {
            return Ok(None);
        };
        let Some(right) = self.analyze_internal(generation, right_id)? else {
            return Ok(None);
        };
        let outcome = compare_analyses(&left, &right, &self.config).map_err(describe)?;

        if self.state.record_comparison(generation, outcome.clone()).is_current() {
            Ok(Some(outcome))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn overlay_internal(
        &mut self,
        generation: Generation,
        down: (&str, u32),
        up: (&str, u32),
        settings: OverlaySettings,
    ) -> Result<Option<OverlayComparison>, String> {
        if self.state.mode() != Mode::Overlay {
            return Err("Overlay comparison requires overlay mode".to_string());
        }
        if !self.state.is_current(generation) {
            return Ok(None);
        }

        let down_entry = self.entry(down.0)?;
        let up_entry = self.entry(up.0)?;
        let overlay = OverlayAnalyzer::new(self.config.clone())
            .analyze(
                (down_entry.source.as_source(), down_entry.name.as_str(), down.1),
                (up_entry.source.as_source(), up_entry.name.as_str(), up.1),
                settings,
            )
            .map_err(describe)?;

        if self.state.record_overlay(generation, overlay.clone()).is_current() {
            Ok(Some(overlay))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn document_infos(&self) -> Vec<DocumentInfo> {
        self.documents
            .iter()
            .map(|d| DocumentInfo {
                id: d.id.clone(),
                name: d.name.clone(),
                page_count: d.source.as_source().page_count(),
            })
            .collect()
    }
}

#[wasm_bindgen]
impl CompareSession {
    /// Create a session in the mode the user last picked
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::with_mode(storage::load_mode())
    }

    #[wasm_bindgen(getter)]
    pub fn mode(&self) -> String {
        self.state.mode().as_str().to_string()
    }

    /// Switch mode and remember it. Returns true if the mode changed.
    #[wasm_bindgen(js_name = setMode)]
    pub fn set_mode(&mut self, mode: &str) -> Result<bool, JsValue> {
        let changed = self.set_mode_internal(mode).map_err(err_to_js)?;
        if changed {
            storage::save_mode(self.state.mode())?;
        }
        Ok(changed)
    }

    /// Replace the comparison tunables. Missing fields take defaults.
    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        let config: CompareConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
        self.set_config_internal(config).map_err(err_to_js)
    }

    /// Current request stamp
    #[wasm_bindgen(getter)]
    pub fn generation(&self) -> f64 {
        self.state.generation().0 as f64
    }

    /// Stamp a new request; pass the value back to `compare`/`overlay`
    #[wasm_bindgen(js_name = beginRequest)]
    pub fn begin_request(&mut self) -> f64 {
        self.state.begin_request().0 as f64
    }

    /// Add a PDF from its bytes. Returns `{ id, name, pageCount }`.
    #[wasm_bindgen(js_name = addDocument)]
    pub fn add_document(&mut self, name: &str, bytes: &[u8]) -> Result<JsValue, JsValue> {
        let info = self.add_document_internal(name, bytes).map_err(err_to_js)?;
        to_js(&info)
    }

    /// Add a document whose pages were extracted by pdf.js:
    /// `[{ fragments: string[], width, height, hasImages }]`
    #[wasm_bindgen(js_name = addExtractedDocument)]
    pub fn add_extracted_document(&mut self, name: &str, pages: JsValue) -> Result<JsValue, JsValue> {
        let pages: Vec<MemoryPage> = serde_wasm_bindgen::from_value(pages)
            .map_err(|e| JsValue::from_str(&format!("Invalid pages: {}", e)))?;
        let info = self.add_extracted_internal(name, pages).map_err(err_to_js)?;
        to_js(&info)
    }

    #[wasm_bindgen(js_name = removeDocument)]
    pub fn remove_document(&mut self, id: &str) -> bool {
        self.remove_document_internal(id)
    }

    #[wasm_bindgen(js_name = getDocuments)]
    pub fn get_documents(&self) -> Result<JsValue, JsValue> {
        to_js(&self.document_infos())
    }

    /// Drop all documents and results
    pub fn clear(&mut self) {
        self.documents.clear();
        self.state.clear();
    }

    /// Text analysis of one document, or `null` if the request went stale
    #[wasm_bindgen(js_name = analyzeDocument)]
    pub fn analyze_document(&mut self, generation: f64, id: &str) -> Result<JsValue, JsValue> {
        let analysis = self
            .analyze_internal(Generation(generation as u64), id)
            .map_err(err_to_js)?;
        optional_to_js(analysis.as_ref())
    }

    /// Semantic comparison. Resolves to the comparison result, an OCR
    /// notice (`requiresOCR: true`), or `null` if the request went stale.
    pub fn compare(&mut self, generation: f64, left_id: &str, right_id: &str) -> Result<JsValue, JsValue> {
        let outcome = self
            .compare_internal(Generation(generation as u64), left_id, right_id)
            .map_err(err_to_js)?;
        optional_to_js(outcome.as_ref())
    }

    /// Overlay one page of each document. `settings` may be `undefined`.
    pub fn overlay(
        &mut self,
        generation: f64,
        down_id: &str,
        down_page: u32,
        up_id: &str,
        up_page: u32,
        settings: JsValue,
    ) -> Result<JsValue, JsValue> {
        let settings: OverlaySettings = if settings.is_undefined() || settings.is_null() {
            OverlaySettings::default()
        } else {
            serde_wasm_bindgen::from_value(settings)
                .map_err(|e| JsValue::from_str(&format!("Invalid overlay settings: {}", e)))?
        };
        let overlay = self
            .overlay_internal(
                Generation(generation as u64),
                (down_id, down_page),
                (up_id, up_page),
                settings,
            )
            .map_err(err_to_js)?;
        optional_to_js(overlay.as_ref())
    }

    #[wasm_bindgen(getter, js_name = lastComparison)]
    pub fn last_comparison(&self) -> Result<JsValue, JsValue> {
        optional_to_js(self.state.comparison())
    }

    #[wasm_bindgen(getter, js_name = lastOverlay)]
    pub fn last_overlay(&self) -> Result<JsValue, JsValue> {
        optional_to_js(self.state.overlay())
    }
}

impl Default for CompareSession {
    fn default() -> Self {
        Self::with_mode(Mode::default())
    }
}
