//! WASM bindings for PDF comparison
//!
//! Session-based API: documents, mode and results are held in Rust and
//! JavaScript only handles DOM events, file I/O and canvas rendering.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { CompareSession } from './pkg/pdfcompare_wasm.js';
//!
//! await init();
//!
//! const session = new CompareSession();        // restores last mode
//! const a = session.addDocument("v1.pdf", bytesA);
//! const b = session.addDocument("v2.pdf", bytesB);
//!
//! const stamp = session.beginRequest();
//! const result = session.compare(stamp, a.id, b.id);
//! if (result === null) return;                 // superseded
//! if (result.requiresOCR) showOcrNotice(result);
//!
//! session.setMode("overlay");
//! const overlay = session.overlay(session.beginRequest(), a.id, 1, b.id, 1);
//! ```

pub mod session;
pub mod storage;

use pdfcompare_core::{analyze_pdf_bytes, CompareConfig, TextComparator};
use wasm_bindgen::prelude::*;

pub use session::{CompareSession, DocumentInfo};

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Quick validation check for a PDF file
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    validate(bytes).map_err(|e| JsValue::from_str(&e))
}

fn validate(bytes: &[u8]) -> Result<(), String> {
    if bytes.len() < 8 {
        return Err("File too small to be a valid PDF".to_string());
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err("Not a valid PDF file (missing header)".to_string());
    }
    Ok(())
}

/// Get page count from PDF bytes
#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    pdfcompare_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// One-shot text analysis without a session
#[wasm_bindgen]
pub fn analyze_pdf(name: &str, bytes: &[u8]) -> Result<JsValue, JsValue> {
    let analysis = analyze_pdf_bytes(bytes, name, &CompareConfig::default())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&analysis)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Compare two plain texts. Returns `null` if either is blank.
#[wasm_bindgen]
pub fn compare_texts(left: &str, right: &str) -> Result<JsValue, JsValue> {
    match TextComparator::default().compare_texts(left, right) {
        Some(result) => serde_wasm_bindgen::to_value(&result)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e))),
        None => Ok(JsValue::NULL),
    }
}
