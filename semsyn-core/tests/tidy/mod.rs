//! Tidy ingest and export against the invoice fixtures.

use crate::common::{document, fixture_path, invoice_context};
use semsyn_core::tidy::export::TidyExporter;
use semsyn_core::tidy::io::{read_rows, read_rows_from_path, write_rows};
use semsyn_core::tidy::{TidyLayout, DEFAULT_DESCRIPTIVE_PREFIX};
use semsyn_core::{DocumentMapper, Mode, TidyTable};

fn cell<'t>(table: &'t TidyTable, row: usize, column: &str) -> &'t str {
    let index = table
        .column(column)
        .unwrap_or_else(|| panic!("no column {column}"));
    &table.rows[row][index]
}

#[test]
fn ingest_puts_bound_columns_in_syntax_order() {
    let ctx = invoice_context(Mode::Semantic);
    let raw = read_rows_from_path(fixture_path("invoice_tidy.csv"), b',').unwrap();
    let mut diags = Vec::new();
    let table = TidyTable::ingest(&raw, ctx.registry(), DEFAULT_DESCRIPTIVE_PREFIX, &mut diags);

    assert!(diags.is_empty());
    assert_eq!(table.descriptive(), &["d_document", "d_ibg-25"]);
    assert_eq!(
        table.bound(),
        &["ibt-001", "ibt-005", "ibt-126", "ibt-129", "ibt-130", "ibt-153"]
    );
    assert_eq!(table.len(), 5);
    assert_eq!(cell(&table, 1, "ibt-153"), "Pen");
    assert_eq!(cell(&table, 4, "ibt-130"), "C62");
}

#[test]
fn reordered_table_writes_back_in_canonical_order() {
    let ctx = invoice_context(Mode::Semantic);
    let input = "d_document,ibt-126,ibt-001\n1,7,INV-9\n";
    let raw = read_rows(input.as_bytes(), b',').unwrap();
    let mut diags = Vec::new();
    let table = TidyTable::ingest(&raw, ctx.registry(), "d_", &mut diags);

    let mut out = Vec::new();
    write_rows(&table.to_rows(), &mut out, b',').unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "d_document,ibt-001,ibt-126\n1,INV-9,7\n"
    );
}

#[test]
fn canonical_layout_for_invoice_bindings() {
    let ctx = invoice_context(Mode::Semantic);
    let layout = TidyLayout::canonical(&ctx, "d_");

    assert_eq!(layout.groups, vec!["ibg-20", "ibg-25"]);
    assert_eq!(layout.descriptive(), vec!["d_document", "d_ibg-20", "d_ibg-25"]);
    assert_eq!(layout.bound.len(), 11);
    assert_eq!(layout.bound.first().map(String::as_str), Some("ibt-024"));
    assert_eq!(layout.bound.last().map(String::as_str), Some("ibt-153"));
}

#[test]
fn invoice_exports_one_row_per_instance() {
    let ctx = invoice_context(Mode::Semantic);
    let mut exporter = TidyExporter::new(&ctx, "d_");
    let mut mapper = DocumentMapper::new(&ctx, document("invoice.xml"));
    assert_eq!(exporter.add_document(&mut mapper).unwrap(), 4);
    let table = exporter.finish();

    assert_eq!(table.offset, 3);
    assert_eq!(cell(&table, 0, "ibt-001"), "INV-001");
    assert_eq!(cell(&table, 0, "ibt-006"), "USD");
    assert_eq!(cell(&table, 0, "ibt-110"), "1000");
    assert_eq!(cell(&table, 0, "ibt-153"), "");

    assert_eq!(cell(&table, 1, "d_ibg-20"), "1");
    assert_eq!(cell(&table, 1, "ibt-092"), "100");
    assert_eq!(cell(&table, 1, "ibt-097"), "Discount");
    assert_eq!(cell(&table, 1, "ibt-001"), "");

    for (row, (index, name)) in [(2, ("1", "Pen")), (3, ("2", "Ink"))] {
        assert_eq!(cell(&table, row, "d_document"), "1");
        assert_eq!(cell(&table, row, "d_ibg-25"), index);
        assert_eq!(cell(&table, row, "ibt-126"), index);
        assert_eq!(cell(&table, row, "ibt-130"), "H87");
        assert_eq!(cell(&table, row, "ibt-153"), name);
    }
}

#[test]
fn export_then_ingest_keeps_the_table() {
    let ctx = invoice_context(Mode::Semantic);
    let mut exporter = TidyExporter::new(&ctx, "d_");
    for name in ["invoice.xml", "invoice_minimal.xml"] {
        let mut mapper = DocumentMapper::new(&ctx, document(name));
        exporter.add_document(&mut mapper).unwrap();
    }
    let exported = exporter.finish();

    let mut diags = Vec::new();
    let ingested = TidyTable::ingest(&exported.to_rows(), ctx.registry(), "d_", &mut diags);
    assert!(diags.is_empty());
    assert_eq!(ingested, exported);
    assert_eq!(cell(&ingested, 4, "d_document"), "2");
}
