//! Persist the selected comparison mode in localStorage

use pdfcompare_core::Mode;
use wasm_bindgen::prelude::*;

pub const MODE_KEY: &str = "pdfcompare.mode";

/// Interpret a stored value. Missing or unrecognized values fall back to the
/// default mode.
pub fn parse_stored_mode(value: Option<&str>) -> Mode {
    value.and_then(|v| v.parse().ok()).unwrap_or_default()
}

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

/// Read the last mode the user picked
pub fn load_mode() -> Mode {
    let stored = local_storage().and_then(|s| s.get_item(MODE_KEY).ok().flatten());
    parse_stored_mode(stored.as_deref())
}

pub fn save_mode(mode: Mode) -> Result<(), JsValue> {
    let storage = local_storage().ok_or("localStorage not available")?;
    storage.set_item(MODE_KEY, mode.as_str())
}
