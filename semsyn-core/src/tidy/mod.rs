//! Tidy table transform
//!
//!     A tidy table has one row per document (or repeating group instance) and
//!     one column per information item. Its header is split in two:
//!         - descriptive columns, every leading header cell made of the
//!           descriptive prefix (`d_` by default) and at least one more character
//!         - bound columns, headed by binding ids, in ascending syntax order
//!
//!     Directions:
//!         - ingest: any table re-projected into the canonical column order
//!           ([`TidyTable::ingest`])
//!         - export: documents harvested into rows ([`export::TidyExporter`])
//!         - assembly: rows written back into documents
//!           ([`assemble::DocumentAssembler`])
//!
//!     File reading and writing lives in [`io`].

pub mod assemble;
pub mod export;
pub mod io;

use crate::context::BindingContext;
use crate::diagnostics::{report, Diagnostic};
use crate::registry::BindingRegistry;
use crate::sheet::strip_bom;
use std::collections::BTreeSet;

pub const DEFAULT_DESCRIPTIVE_PREFIX: &str = "d_";

/// True for a header cell made of `prefix` and at least one more character
pub fn is_descriptive(cell: &str, prefix: &str) -> bool {
    cell.strip_prefix(prefix).is_some_and(|rest| !rest.is_empty())
}

/// Name of the descriptive column holding the document index
pub fn document_column(prefix: &str) -> String {
    format!("{prefix}document")
}

/// Name of the descriptive column holding a repeating group's instance index
pub fn group_column(prefix: &str, group_id: &str) -> String {
    format!("{prefix}{group_id}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TidyTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Number of leading descriptive columns
    pub offset: usize,
}

impl TidyTable {
    /// Re-project raw rows (header first) into canonical column order.
    ///
    /// Bound columns whose id is unknown, or known without a syntax order, are
    /// reported and dropped. Short rows are padded with empty cells.
    pub fn ingest(
        raw: &[Vec<String>],
        registry: &BindingRegistry,
        prefix: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        let Some((header, data)) = raw.split_first() else {
            return TidyTable::default();
        };
        let header: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let cell = if i == 0 { strip_bom(cell) } else { cell };
                cell.trim().to_string()
            })
            .collect();
        let offset = header
            .iter()
            .take_while(|cell| is_descriptive(cell, prefix))
            .count();

        let mut bound: Vec<(u32, usize)> = Vec::new();
        for (index, id) in header.iter().enumerate().skip(offset) {
            if id.is_empty() {
                continue;
            }
            match registry.by_id(id) {
                Err(_) => report(diagnostics, Diagnostic::UnknownColumn { id: id.clone() }),
                Ok(binding) => match binding.syntax_order {
                    Some(order) => bound.push((order, index)),
                    None => report(diagnostics, Diagnostic::UnorderedColumn { id: id.clone() }),
                },
            }
        }
        bound.sort_by_key(|(order, _)| *order);

        let columns: Vec<usize> = (0..offset).chain(bound.iter().map(|(_, i)| *i)).collect();
        let cell = |row: &Vec<String>, i: usize| row.get(i).cloned().unwrap_or_default();

        TidyTable {
            header: columns.iter().map(|i| header[*i].clone()).collect(),
            rows: data
                .iter()
                .map(|row| columns.iter().map(|i| cell(row, *i)).collect())
                .collect(),
            offset,
        }
    }

    /// Header followed by the data rows
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        std::iter::once(self.header.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }

    pub fn descriptive(&self) -> &[String] {
        &self.header[..self.offset.min(self.header.len())]
    }

    pub fn bound(&self) -> &[String] {
        &self.header[self.offset.min(self.header.len())..]
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Canonical columns for a binding context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TidyLayout {
    pub prefix: String,
    /// Repeating group ids in semantic pre-order
    pub groups: Vec<String>,
    /// Leaf binding ids in ascending syntax order
    pub bound: Vec<String>,
}

impl TidyLayout {
    /// A repeating group is a multiple-cardinality binding with semantic
    /// children. Bound columns are the forest's leaves that carry a path and a
    /// syntax order.
    pub fn canonical(ctx: &BindingContext, prefix: &str) -> Self {
        let forest = ctx.semantic();
        let mut groups = Vec::new();
        let mut leaves: Vec<(u32, String)> = Vec::new();
        for (order, _) in forest.iter() {
            let Ok(binding) = ctx.semantic_binding(order) else {
                continue;
            };
            let has_children = !forest.children(order).is_empty();
            if has_children && binding.is_multiple() {
                groups.push(binding.id.clone());
            }
            if !has_children && !binding.path.is_empty() {
                if let Some(syntax) = binding.syntax_order {
                    leaves.push((syntax, binding.id.clone()));
                }
            }
        }
        leaves.sort_by_key(|(order, _)| *order);
        TidyLayout {
            prefix: prefix.to_string(),
            groups,
            bound: leaves.into_iter().map(|(_, id)| id).collect(),
        }
    }

    pub fn descriptive(&self) -> Vec<String> {
        std::iter::once(document_column(&self.prefix))
            .chain(self.groups.iter().map(|g| group_column(&self.prefix, g)))
            .collect()
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = self.descriptive();
        header.extend(self.bound.iter().cloned());
        header
    }

    pub fn group_set(&self) -> BTreeSet<&str> {
        self.groups.iter().map(String::as_str).collect()
    }
}
