//! Documents to tidy rows
//!
//! # The High-Level Concept
//!
//! Each document contributes one row for its own single-valued items, and one
//! row per instance of every repeating group (an invoice line, an allowance).
//! Descriptive cells locate a row: the document index plus the instance index
//! of each enclosing repeating group. Items that are not repeating groups but
//! still have children are flattened into the row of their nearest repeating
//! ancestor.
//!
//! # The Algorithm
//!
//! Walk the resolved tree of a document. For one instance:
//!
//! 1. Start a row carrying the instance's descriptive cells.
//! 2. Fill leaf values into their column. A second value for the same column
//!    becomes an extra row holding only the descriptive cells and that value.
//! 3. Number nested repeating-group instances per group (1, 2, ...) and emit
//!    them after the current row and its extra rows.
//!
//! An instance row that carries no values is dropped when nested instances
//! follow it.

use super::{TidyLayout, TidyTable};
use crate::context::BindingContext;
use crate::error::Result;
use crate::mapper::{DocumentMapper, ResolvedNode};
use crate::xml::Document;
use std::collections::{BTreeSet, HashMap};

type Dimensions = Vec<(usize, String)>;

pub struct TidyExporter<'c> {
    ctx: &'c BindingContext,
    layout: TidyLayout,
    group_columns: HashMap<String, usize>,
    bound_columns: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
    documents: usize,
}

impl<'c> TidyExporter<'c> {
    pub fn new(ctx: &'c BindingContext, prefix: &str) -> Self {
        let layout = TidyLayout::canonical(ctx, prefix);
        let group_columns = layout
            .groups
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i + 1))
            .collect();
        let offset = layout.groups.len() + 1;
        let bound_columns = layout
            .bound
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), offset + i))
            .collect();
        TidyExporter {
            ctx,
            layout,
            group_columns,
            bound_columns,
            rows: Vec::new(),
            documents: 0,
        }
    }

    pub fn layout(&self) -> &TidyLayout {
        &self.layout
    }

    pub fn context(&self) -> &BindingContext {
        self.ctx
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Resolve one document and append its rows. Returns the number of rows added.
    pub fn add_document(&mut self, mapper: &mut DocumentMapper<'_>) -> Result<usize> {
        let roots = mapper.resolve_tree()?;
        self.documents += 1;
        let before = self.rows.len();
        let dims = vec![(0, self.documents.to_string())];
        let mut emitter = Emitter {
            exporter: &*self,
            document: mapper.document(),
            out: Vec::new(),
        };
        emitter.instance(&roots, &dims, true);
        let rows = emitter.out;
        self.rows.extend(rows);
        tracing::debug!(
            document = self.documents,
            rows = self.rows.len() - before,
            "document exported"
        );
        Ok(self.rows.len() - before)
    }

    pub fn finish(self) -> TidyTable {
        TidyTable {
            offset: self.layout.groups.len() + 1,
            header: self.layout.header(),
            rows: self.rows,
        }
    }

    fn width(&self) -> usize {
        1 + self.layout.groups.len() + self.layout.bound.len()
    }
}

struct Emitter<'a, 'c> {
    exporter: &'a TidyExporter<'c>,
    document: &'a Document,
    out: Vec<Vec<String>>,
}

struct Instance<'n> {
    row: Vec<String>,
    filled: BTreeSet<usize>,
    extras: Vec<(usize, String)>,
    nested: Vec<(&'n ResolvedNode, Dimensions)>,
    counters: HashMap<&'n str, usize>,
}

impl<'a, 'c> Emitter<'a, 'c> {
    fn blank(&self, dims: &Dimensions) -> Vec<String> {
        let mut row = vec![String::new(); self.exporter.width()];
        for (column, value) in dims {
            row[*column] = value.clone();
        }
        row
    }

    fn instance(&mut self, nodes: &[ResolvedNode], dims: &Dimensions, keep_empty: bool) {
        let mut instance = Instance {
            row: self.blank(dims),
            filled: BTreeSet::new(),
            extras: Vec::new(),
            nested: Vec::new(),
            counters: HashMap::new(),
        };
        self.collect(nodes, dims, &mut instance);

        if !instance.filled.is_empty() || (keep_empty && instance.nested.is_empty()) {
            self.out.push(instance.row);
        }
        for (column, value) in instance.extras {
            let mut row = self.blank(dims);
            row[column] = value;
            self.out.push(row);
        }
        for (node, child_dims) in instance.nested {
            self.instance(&node.children, &child_dims, false);
        }
    }

    fn collect<'n>(&self, nodes: &'n [ResolvedNode], dims: &Dimensions, instance: &mut Instance<'n>) {
        for node in nodes {
            if let Some(&column) = self.exporter.group_columns.get(&node.id) {
                let count = instance.counters.entry(node.id.as_str()).or_insert(0);
                *count += 1;
                let mut child_dims = dims.clone();
                child_dims.push((column, count.to_string()));
                instance.nested.push((node, child_dims));
            } else if let Some(&column) = self.exporter.bound_columns.get(&node.id) {
                let value = self.document.text_content(&node.fragment);
                if instance.filled.insert(column) {
                    instance.row[column] = value;
                } else {
                    instance.extras.push((column, value));
                }
            } else {
                self.collect(&node.children, dims, instance);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Binding, Cardinality};
    use crate::dialect::{Dialect, DialectSettings, Mode};
    use crate::registry::BindingRegistry;

    const DOC: &str = r#"<R>
  <ID>INV-1</ID>
  <Note>first</Note>
  <Note>second</Note>
  <Line><LID>1</LID><Name>Pen</Name></Line>
  <Line><LID>2</LID><Name>Ink</Name></Line>
</R>"#;

    fn context() -> BindingContext {
        let mut registry = BindingRegistry::new();
        let rows = [
            Binding::new("ROOT").with_semantic_order(1).with_syntax_order(1),
            Binding::new("ID")
                .with_semantic_order(2)
                .with_syntax_order(10)
                .with_level(1)
                .with_path("/R/ID"),
            Binding::new("NOTE")
                .with_semantic_order(3)
                .with_syntax_order(20)
                .with_level(1)
                .with_cardinality(Cardinality::Multiple)
                .with_path("/R/Note"),
            Binding::new("LINE")
                .with_semantic_order(4)
                .with_syntax_order(30)
                .with_level(1)
                .with_cardinality(Cardinality::Multiple)
                .with_path("/R/Line"),
            Binding::new("LID")
                .with_semantic_order(5)
                .with_syntax_order(40)
                .with_level(2)
                .with_path("/R/Line/LID"),
            Binding::new("NAME")
                .with_semantic_order(6)
                .with_syntax_order(50)
                .with_level(2)
                .with_path("/R/Line/Name"),
        ];
        for binding in rows {
            registry.register(binding);
        }
        BindingContext::build(
            registry,
            DialectSettings::new(Dialect::XbrlGl, Mode::Semantic).with_root_order(1),
        )
    }

    #[test]
    fn layout_lists_groups_and_leaves() {
        let ctx = context();
        let layout = TidyLayout::canonical(&ctx, "d_");
        assert_eq!(layout.groups, vec!["LINE"]);
        assert_eq!(layout.bound, vec!["ID", "NOTE", "LID", "NAME"]);
        assert_eq!(
            layout.header(),
            vec!["d_document", "d_LINE", "ID", "NOTE", "LID", "NAME"]
        );
    }

    #[test]
    fn rows_per_instance_and_extra_values() {
        let ctx = context();
        let mut exporter = TidyExporter::new(&ctx, "d_");
        let mut mapper = DocumentMapper::new(&ctx, Document::parse(DOC).unwrap());
        assert_eq!(exporter.add_document(&mut mapper).unwrap(), 4);

        let table = exporter.finish();
        assert_eq!(table.offset, 2);
        let rows: Vec<Vec<&str>> = table
            .rows
            .iter()
            .map(|r| r.iter().map(String::as_str).collect())
            .collect();
        assert_eq!(
            rows,
            vec![
                vec!["1", "", "INV-1", "first", "", ""],
                vec!["1", "", "", "second", "", ""],
                vec!["1", "1", "", "", "1", "Pen"],
                vec!["1", "2", "", "", "2", "Ink"],
            ]
        );
    }

    #[test]
    fn documents_are_numbered() {
        let ctx = context();
        let mut exporter = TidyExporter::new(&ctx, "d_");
        for _ in 0..2 {
            let mut mapper = DocumentMapper::new(&ctx, Document::parse(DOC).unwrap());
            exporter.add_document(&mut mapper).unwrap();
        }
        assert_eq!(exporter.documents(), 2);
        let table = exporter.finish();
        assert_eq!(table.len(), 8);
        assert_eq!(table.rows[4][0], "2");
    }
}
