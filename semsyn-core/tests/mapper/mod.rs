//! Document resolution against the invoice fixtures.

use crate::common::{context_from_sheet, document, invoice_context};
use semsyn_core::{
    Binding, BindingContext, BindingRegistry, Diagnostic, Dialect, DialectSettings, Document,
    DocumentMapper, Fragment, Mode,
};

#[test]
fn currencies_are_captured_and_substituted() {
    let ctx = invoice_context(Mode::Semantic);
    let mut mapper = DocumentMapper::new(&ctx, document("invoice.xml"));

    assert_eq!(mapper.document_currency(), Some("JPY"));
    assert_eq!(mapper.tax_currency(), Some("USD"));
    // Only the tax total in the document currency matches.
    assert_eq!(mapper.values("ibt-110").unwrap(), vec!["1000"]);
}

#[test]
fn charge_indicator_predicates_compare_text() {
    let ctx = invoice_context(Mode::Semantic);
    let mut mapper = DocumentMapper::new(&ctx, document("invoice.xml"));

    assert_eq!(mapper.values("ibt-092").unwrap(), vec!["100"]);
    assert_eq!(mapper.values("ibt-097").unwrap(), vec!["Discount"]);
}

#[test]
fn relative_match_beats_global_match() {
    let ctx = invoice_context(Mode::Semantic);
    let mut mapper = DocumentMapper::new(&ctx, document("invoice.xml"));

    let lines = mapper.resolve("ibg-25").unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(mapper.values("ibt-126").unwrap(), vec!["1", "2"]);

    let children = mapper.resolve_children(&lines[1], "ibg-25").unwrap();
    let ids = &children[&1100];
    assert_eq!(ids.len(), 1);
    assert_eq!(mapper.document().text_content(&ids[0]), "2");

    let units = &children[&1120];
    assert!(matches!(units[0], Fragment::Attribute(..)));
    assert_eq!(mapper.document().text_content(&units[0]), "H87");
}

#[test]
fn parse_all_harvests_every_semantic_binding() {
    let ctx = invoice_context(Mode::Semantic);
    let mut mapper = DocumentMapper::new(&ctx, document("invoice.xml"));
    let nodes = mapper.parse_all();

    assert_eq!(nodes[&1090].id, "ibg-25");
    assert_eq!(nodes[&1090].fragments.len(), 2);
    assert_eq!(nodes[&1060].fragments.len(), 1);
    assert_eq!(nodes[&1130].fragments.len(), 2);
    assert!(mapper.used_ids().contains("ibt-024"));
    assert!(mapper.diagnostics().is_empty());
}

#[test]
fn syntax_mode_synthesizes_missing_defaults_once() {
    let ctx = invoice_context(Mode::Syntax);
    let mut mapper = DocumentMapper::new(&ctx, document("invoice_minimal.xml"));
    assert!(mapper.values("ibt-024").unwrap().is_empty());

    mapper.resolve_tree().unwrap();
    assert_eq!(mapper.synthesized(), 1);
    assert_eq!(mapper.document().mutations(), 2);
    assert_eq!(
        mapper.values("ibt-024").unwrap(),
        vec!["urn:peppol:pint:billing-1@jp-1"]
    );

    let completed = mapper.into_document();
    let mut second = DocumentMapper::new(&ctx, completed);
    second.resolve_tree().unwrap();
    assert_eq!(second.synthesized(), 0);
    assert_eq!(second.document().mutations(), 2);
}

#[test]
fn semantic_mode_reports_missing_required_items() {
    let ctx = invoice_context(Mode::Semantic);
    let mut mapper = DocumentMapper::new(&ctx, document("invoice_minimal.xml"));
    mapper.resolve_tree().unwrap();

    assert_eq!(mapper.synthesized(), 0);
    assert_eq!(mapper.document().mutations(), 0);
    assert_eq!(mapper.tax_currency(), None);
    assert!(mapper.diagnostics().contains(&Diagnostic::Unresolved {
        id: "ibt-024".to_string()
    }));
    // Optional items stay silent.
    assert!(!mapper.diagnostics().contains(&Diagnostic::Unresolved {
        id: "ibt-006".to_string()
    }));
}

#[test]
fn anchors_are_tried_when_direct_lookup_fails() {
    let mut anchored = Binding::new("P")
        .with_semantic_order(2)
        .with_syntax_order(2)
        .with_level(1)
        .with_path("P");
    anchored.add_additional_path("W".to_string());

    let mut registry = BindingRegistry::new();
    registry.register(
        Binding::new("G")
            .with_semantic_order(1)
            .with_syntax_order(1)
            .with_path("/R"),
    );
    registry.register(anchored);
    let ctx = BindingContext::build(registry, DialectSettings::new(Dialect::XbrlGl, Mode::Semantic));

    let doc = Document::parse("<R><W><P>found</P></W></R>").unwrap();
    let mut mapper = DocumentMapper::new(&ctx, doc);
    let roots = mapper.resolve_tree().unwrap();

    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].children.len(), 1);
    assert_eq!(
        mapper.document().text_content(&roots[0].children[0].fragment),
        "found"
    );
}

#[test]
fn bad_paths_are_reported_and_yield_nothing() {
    let ctx = context_from_sheet(
        "semSort,id,level,synSort,xPath\n\
         10,A,0,10,/R/A[\n\
         20,B,0,20,/R/x:B\n",
        DialectSettings::new(Dialect::XbrlGl, Mode::Semantic),
    );
    let mut mapper = DocumentMapper::new(&ctx, Document::parse("<R><A/></R>").unwrap());

    assert!(mapper.resolve("A").unwrap().is_empty());
    assert!(mapper.resolve("B").unwrap().is_empty());
    assert!(mapper.resolve("missing").is_err());

    let failures: Vec<_> = mapper
        .diagnostics()
        .iter()
        .filter_map(|d| match d {
            Diagnostic::PathEvaluation { path, .. } => Some(path.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec!["/R/A[", "/R/x:B"]);
}

#[test]
fn sme_common_captures_currencies_by_default_ids() {
    let settlement = "/SMEInvoice/CIIHSupplyChainTradeTransaction/ApplicableCIIHSupplyChainTradeSettlement";
    let sheet = format!(
        "semSort,id,level,synSort,xPath\n\
         10,JC00,0,10,/SMEInvoice\n\
         20,JC43_JC34_02,1,20,{settlement}/InvoiceCurrencyCode\n\
         30,JC43_JC34_01,1,30,{settlement}/TaxCurrencyCode\n"
    );
    let ctx = context_from_sheet(&sheet, DialectSettings::new(Dialect::SmeCommon, Mode::Semantic));
    let doc = Document::parse(
        "<SMEInvoice><CIIHSupplyChainTradeTransaction>\
         <ApplicableCIIHSupplyChainTradeSettlement>\
         <InvoiceCurrencyCode>JPY</InvoiceCurrencyCode>\
         <TaxCurrencyCode>USD</TaxCurrencyCode>\
         </ApplicableCIIHSupplyChainTradeSettlement>\
         </CIIHSupplyChainTradeTransaction></SMEInvoice>",
    )
    .unwrap();
    let mapper = DocumentMapper::new(&ctx, doc);

    assert_eq!(mapper.document_currency(), Some("JPY"));
    assert_eq!(mapper.tax_currency(), Some("USD"));
}
