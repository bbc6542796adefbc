//! Sheet to document to table and back.

use crate::common::{context_from_sheet, document, fixture_path, invoice_context};
use semsyn_core::tidy::assemble::DocumentAssembler;
use semsyn_core::tidy::export::TidyExporter;
use semsyn_core::tidy::io::{read_rows_from_path, write_rows_to_path};
use semsyn_core::{Dialect, DialectSettings, Document, DocumentMapper, Mode, TidyTable};

const SHEET: &str = "semSort,id,level,defaultValue,synSort,xPath\n\
                     1,A,0,,1,/Root/A\n\
                     2,B,1,JPY,2,/Root/A/B\n";

#[test]
fn missing_child_with_default_is_synthesized_under_its_parent() {
    let ctx = context_from_sheet(SHEET, DialectSettings::new(Dialect::JpPint, Mode::Syntax));
    assert_eq!(ctx.semantic().children(0), &[1]);
    assert_eq!(ctx.semantic().children(1), &[2]);

    let doc = Document::parse("<Root><A/></Root>").unwrap();
    let mut mapper = DocumentMapper::new(&ctx, doc);
    let a = mapper.resolve("A").unwrap();
    assert_eq!(a.len(), 1);

    let b = mapper.complete_or_fetch(&a[0], "A", "B").unwrap();
    assert_eq!(b.len(), 1);
    assert_eq!(mapper.document().text_content(&b[0]), "JPY");
    assert_eq!(mapper.document().parent(b[0].node()), a[0].as_element());
    assert_eq!(mapper.synthesized(), 1);

    let again = mapper.complete_or_fetch(&a[0], "A", "B").unwrap();
    assert_eq!(again, b);
    assert_eq!(mapper.synthesized(), 1);

    let xml = mapper.into_document().to_xml_string(0).unwrap();
    assert!(xml.ends_with("<Root><A><B>JPY</B></A></Root>\n"), "{xml}");
}

#[test]
fn semantic_mode_never_mutates() {
    let ctx = context_from_sheet(SHEET, DialectSettings::default());
    let doc = Document::parse("<Root><A/></Root>").unwrap();
    let mut mapper = DocumentMapper::new(&ctx, doc);
    let a = mapper.resolve("A").unwrap();

    assert!(mapper.complete_or_fetch(&a[0], "A", "B").unwrap().is_empty());
    assert_eq!(mapper.document().mutations(), 0);
}

#[test]
fn tidy_rows_assemble_into_documents_and_export_back() {
    let ctx = invoice_context(Mode::Semantic);
    let raw = read_rows_from_path(fixture_path("invoice_tidy.csv"), b',').unwrap();
    let mut diags = Vec::new();
    let table = TidyTable::ingest(&raw, ctx.registry(), "d_", &mut diags);

    let mut assembler = DocumentAssembler::new(&ctx, document("invoice_skeleton.xml"), "d_");
    let documents = assembler.assemble(&table).unwrap();
    assert!(assembler.diagnostics().is_empty(), "{:?}", assembler.diagnostics());
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[1].key, "2");

    let mut exporter = TidyExporter::new(&ctx, "d_");
    for assembled in documents {
        let mut mapper = DocumentMapper::new(&ctx, assembled.document);
        exporter.add_document(&mut mapper).unwrap();
    }
    let exported = exporter.finish();

    for id in table.bound() {
        let source = table.column(id).unwrap();
        let target = exported.column(id).unwrap();
        let before: Vec<&str> = table
            .rows
            .iter()
            .map(|r| r[source].as_str())
            .filter(|v| !v.is_empty())
            .collect();
        let after: Vec<&str> = exported
            .rows
            .iter()
            .map(|r| r[target].as_str())
            .filter(|v| !v.is_empty())
            .collect();
        assert_eq!(before, after, "values of {id}");
    }
}

#[test]
fn completed_document_survives_a_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = invoice_context(Mode::Syntax);
    let mut mapper = DocumentMapper::new(&ctx, document("invoice_minimal.xml"));
    mapper.resolve_tree().unwrap();

    let path = dir.path().join("completed.xml");
    let file = std::fs::File::create(&path).unwrap();
    mapper.into_document().write_to(file, 2).unwrap();

    let reparsed = Document::parse(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let mut check = DocumentMapper::new(&ctx, reparsed);
    assert_eq!(
        check.values("ibt-024").unwrap(),
        vec!["urn:peppol:pint:billing-1@jp-1"]
    );

    let mut exporter = TidyExporter::new(&ctx, "d_");
    exporter.add_document(&mut check).unwrap();
    let csv = dir.path().join("out.csv");
    write_rows_to_path(&exporter.finish().to_rows(), &csv, b',', false).unwrap();
    let rows = read_rows_from_path(&csv, b',').unwrap();
    assert_eq!(rows[0][0], "d_document");
    assert_eq!(rows.len(), 3);
}
