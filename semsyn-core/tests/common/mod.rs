//! Shared fixtures for the integration tests.

use semsyn_core::sheet;
use semsyn_core::{BindingContext, Dialect, DialectSettings, Document, Mode};
use std::path::PathBuf;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    let path = fixture_path(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read fixture {}: {e}", path.display()))
}

pub fn document(name: &str) -> Document {
    Document::parse(&fixture(name)).unwrap_or_else(|e| panic!("fixture {name}: {e}"))
}

/// The invoice binding sheet under the JP PINT dialect
pub fn invoice_context(mode: Mode) -> BindingContext {
    let registry = sheet::load_path(fixture_path("invoice_bindings.csv"), b',')
        .unwrap_or_else(|e| panic!("invoice bindings: {e}"));
    BindingContext::build(registry, DialectSettings::new(Dialect::JpPint, mode))
}

/// Build a context from sheet text
pub fn context_from_sheet(sheet_text: &str, settings: DialectSettings) -> BindingContext {
    let registry = sheet::load_binding_sheet(sheet_text.as_bytes(), b',')
        .unwrap_or_else(|e| panic!("sheet: {e}"));
    BindingContext::build(registry, settings)
}
