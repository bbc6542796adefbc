//! Forest construction from binding sheets.

use crate::common::{context_from_sheet, invoice_context};
use semsyn_core::{Diagnostic, Dialect, DialectSettings, ForestKind, Mode};

#[test]
fn invoice_sheet_builds_semantic_forest() {
    let ctx = invoice_context(Mode::Semantic);
    let semantic = ctx.semantic();

    assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());
    assert_eq!(semantic.children(0), &[1000]);
    assert_eq!(
        semantic.children(1000),
        &[1010, 1020, 1030, 1040, 1050, 1060, 1090]
    );
    assert_eq!(semantic.children(1060), &[1070, 1080]);
    assert_eq!(semantic.children(1090), &[1100, 1110, 1120, 1130]);
    assert_eq!(semantic.len(), 14);

    let top: Vec<_> = ctx.top_level().iter().map(|b| b.id.as_str()).collect();
    assert_eq!(top, vec!["ibg-00"]);
    let lines: Vec<_> = ctx
        .semantic_children("ibg-25")
        .unwrap()
        .iter()
        .map(|b| b.id.clone())
        .collect();
    assert_eq!(lines, vec!["ibt-126", "ibt-129", "ibt-130", "ibt-153"]);
}

#[test]
fn every_node_has_one_parent_and_reaches_the_root() {
    let ctx = invoice_context(Mode::Semantic);
    for kind in [ForestKind::Semantic, ForestKind::Syntax] {
        let forest = ctx.forest(kind);
        let mut seen = std::collections::BTreeSet::new();
        for (order, depth) in forest.iter() {
            assert!(seen.insert(order), "{order} visited twice in {kind}");
            let ancestors = forest.ancestors(order);
            assert_eq!(ancestors.last(), Some(&forest.root()));
            assert_eq!(ancestors.len(), depth + 1);
        }
        assert_eq!(seen.len(), forest.len());
    }
}

#[test]
fn rows_without_syntax_order_are_not_indexed() {
    let ctx = context_from_sheet(
        "semSort,id,level,synSort,xPath\n\
         10,A,0,10,/R/A\n\
         20,B,1,0,/R/A/B\n\
         30,C,1,30,/R/A/C\n",
        DialectSettings::default(),
    );
    let registry = ctx.registry();

    assert!(registry.has("B"));
    assert!(registry.by_semantic_order(20).is_err());
    assert!(registry.by_syntax_order(0).is_err());
    assert!(!ctx.semantic().contains(20));
    assert_eq!(ctx.semantic().children(10), &[30]);
    assert_eq!(
        ctx.diagnostics(),
        &[Diagnostic::UnboundSyntax {
            id: "B".to_string()
        }]
    );
}

#[test]
fn level_offset_lifts_every_row() {
    let ctx = context_from_sheet(
        "semSort,id,level,synSort,xPath\n\
         5,X,0,5,/X\n\
         10,A,1,10,/R/A\n\
         20,B,2,20,/R/A/B\n",
        DialectSettings::new(Dialect::Adc, Mode::Semantic),
    );

    assert_eq!(ctx.semantic().children(0), &[10]);
    assert_eq!(ctx.semantic().children(10), &[20]);
    assert!(!ctx.semantic().contains(5));
    assert!(!ctx.syntax().contains(5));
    assert_eq!(
        ctx.diagnostics(),
        &[Diagnostic::NegativeLevel {
            id: "X".to_string()
        }]
    );
}

#[test]
fn unit_wrappers_are_flattened_in_the_syntax_forest() {
    let sheet = "semSort,id,level,synSort,xPath\n\
                 10,A,0,10,/R/A\n\
                 20,B,1,20,/R/A/B\n\
                 30,C,2,30,/R/A/B/Amount\n";
    let flattened = context_from_sheet(sheet, DialectSettings::new(Dialect::SmeCommon, Mode::Syntax));
    let plain = context_from_sheet(sheet, DialectSettings::new(Dialect::XbrlGl, Mode::Syntax));

    assert_eq!(flattened.syntax().parent(30), Some(10));
    assert_eq!(flattened.semantic().parent(30), Some(20));
    assert_eq!(plain.syntax().parent(30), Some(20));
}

#[test]
fn missing_ancestor_is_reported_per_forest() {
    let ctx = context_from_sheet(
        "semSort,id,level,synSort,xPath\n\
         10,A,0,10,/R/A\n\
         20,B,2,20,/R/A/X/B\n",
        DialectSettings::default(),
    );

    assert!(!ctx.semantic().contains(20));
    assert!(ctx.diagnostics().contains(&Diagnostic::MissingAncestor {
        forest: ForestKind::Semantic,
        order: 20,
        level: 2,
    }));
    assert!(ctx.diagnostics().contains(&Diagnostic::MissingAncestor {
        forest: ForestKind::Syntax,
        order: 20,
        level: 2,
    }));
}

#[test]
fn deeper_row_attaches_to_last_ancestor_at_its_parent_level() {
    let ctx = context_from_sheet(
        "semSort,id,level,synSort,xPath\n\
         10,A,0,10,/R/A\n\
         20,B,1,20,/R/A/B\n\
         30,C,0,30,/R/C\n\
         40,D,2,40,/R/A/B/D\n",
        DialectSettings::new(Dialect::XbrlGl, Mode::Semantic),
    );

    assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());
    assert_eq!(ctx.semantic().children(20), &[40]);
    assert_eq!(ctx.syntax().children(20), &[40]);
    assert_eq!(ctx.semantic().ancestors(40), vec![20, 10, 0]);
}
