//! Tidy rows to documents
//!
//! Rows are grouped by the document column; each group is written into a copy
//! of a skeleton document. For every non-empty bound cell the binding path is
//! walked from the document root, or from the instance element of the nearest
//! enclosing repeating group, creating missing steps on the way:
//!
//! - intermediate steps reuse the first existing match
//! - the last step of a repeating group always creates a new instance, one per
//!   distinct descriptive index
//! - the last step of a leaf reuses an empty match, otherwise a sibling is added
//! - `[name='literal']` predicates on created steps are materialized as child
//!   elements (or attributes for `@name`) carrying the literal
//!
//! Steps that do not name a single location (`//`, wildcards, functions) cannot
//! be created and are reported as [`Diagnostic::Unassembled`].

use super::{document_column, group_column, TidyLayout, TidyTable};
use crate::binding::Binding;
use crate::context::BindingContext;
use crate::diagnostics::{report, Diagnostic};
use crate::error::Result;
use crate::path::{relative_to, split_steps, PathNormalizer};
use crate::xml::{Document, Fragment, NodeId, XPath};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

static LITERAL_PREDICATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\[\s*([^\[\]=!'"()]+?)\s*=\s*(?:'([^']*)'|"([^"]*)"|(true|false)\(\))\s*\]"#,
    )
    .unwrap_or_else(|e| panic!("invalid literal predicate pattern: {e}"))
});

/// A rebuilt document and the document-column value it was assembled from
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub key: String,
    pub document: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastStep {
    Reuse,
    New,
    Vacant,
}

/// Per-document state: the document and its repeating-group instances keyed
/// by the chain of (group id, index) leading to them
struct Build {
    document: Document,
    instances: HashMap<Vec<(String, String)>, NodeId>,
}

pub struct DocumentAssembler<'c> {
    ctx: &'c BindingContext,
    skeleton: Document,
    prefix: String,
    groups: BTreeSet<String>,
    normalizer: PathNormalizer,
    diagnostics: Vec<Diagnostic>,
}

impl<'c> DocumentAssembler<'c> {
    pub fn new(ctx: &'c BindingContext, skeleton: Document, prefix: &str) -> Self {
        let layout = TidyLayout::canonical(ctx, prefix);
        DocumentAssembler {
            ctx,
            skeleton,
            prefix: prefix.to_string(),
            groups: layout.groups.into_iter().collect(),
            normalizer: PathNormalizer::without_currencies(ctx.settings().rules()),
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Assemble one document per distinct document-column value, in order of
    /// first appearance. Without a document column all rows form one document.
    pub fn assemble(&mut self, table: &TidyTable) -> Result<Vec<AssembledDocument>> {
        let document_index = table.column(&document_column(&self.prefix));
        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, Vec<&Vec<String>>> = HashMap::new();
        for row in &table.rows {
            let key = document_index
                .and_then(|i| row.get(i))
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| "1".to_string());
            if !grouped.contains_key(&key) {
                order.push(key.clone());
            }
            grouped.entry(key).or_default().push(row);
        }

        let mut documents = Vec::with_capacity(order.len());
        for key in order {
            let rows = grouped.remove(&key).unwrap_or_default();
            let mut build = Build {
                document: self.skeleton.clone(),
                instances: HashMap::new(),
            };
            for row in rows {
                self.write_row(&mut build, table, row)?;
            }
            tracing::debug!(
                document = %key,
                instances = build.instances.len(),
                mutations = build.document.mutations(),
                "document assembled"
            );
            documents.push(AssembledDocument {
                key,
                document: build.document,
            });
        }
        tracing::info!(documents = documents.len(), "tidy rows assembled");
        Ok(documents)
    }

    fn write_row(&mut self, build: &mut Build, table: &TidyTable, row: &[String]) -> Result<()> {
        for (column, id) in table.header.iter().enumerate().skip(table.offset) {
            let Some(value) = row.get(column).filter(|v| !v.is_empty()) else {
                continue;
            };
            let dimension = |group: &str| -> String {
                table
                    .column(&group_column(&self.prefix, group))
                    .and_then(|i| row.get(i))
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| "1".to_string())
            };
            let chain: Vec<(String, String)> = self
                .group_chain(id)
                .into_iter()
                .map(|g| {
                    let index = dimension(&g.id);
                    (g.id.clone(), index)
                })
                .collect();
            self.write_cell(build, id, value, &chain)?;
        }
        Ok(())
    }

    /// Enclosing repeating groups of a binding, outermost first
    fn group_chain(&self, id: &str) -> Vec<&'c Binding> {
        let ctx = self.ctx;
        let Some(order) = ctx.binding(id).ok().and_then(|b| b.semantic_order) else {
            return Vec::new();
        };
        let mut chain: Vec<&Binding> = ctx
            .semantic()
            .ancestors(order)
            .into_iter()
            .filter_map(|a| ctx.semantic_binding(a).ok())
            .filter(|b| self.groups.contains(&b.id))
            .collect();
        chain.reverse();
        chain
    }

    fn write_cell(
        &mut self,
        build: &mut Build,
        id: &str,
        value: &str,
        chain: &[(String, String)],
    ) -> Result<()> {
        let ctx = self.ctx;
        let binding = ctx.binding(id)?;
        let mut base = NodeId::DOCUMENT;
        let mut base_path = "";
        let mut key = Vec::new();

        for (group_id, index) in chain {
            let group = ctx.binding(group_id)?;
            key.push((group_id.clone(), index.clone()));
            let instance = match build.instances.get(&key) {
                Some(node) => *node,
                None => {
                    let steps = steps_from(base_path, &group.path);
                    let Some(node) =
                        self.ensure(&mut build.document, base, &steps, LastStep::New, group_id)?
                    else {
                        return Ok(());
                    };
                    build.instances.insert(key.clone(), node);
                    node
                }
            };
            base = instance;
            base_path = &group.path;
        }

        let steps = steps_from(base_path, &binding.path);
        match steps.split_last() {
            Some((last, owner_steps)) if last.starts_with('@') => {
                let Some(owner) =
                    self.ensure(&mut build.document, base, owner_steps, LastStep::Reuse, id)?
                else {
                    return Ok(());
                };
                build.document.set_attribute(owner, &last[1..], value)?;
            }
            Some(_) => {
                let Some(element) =
                    self.ensure(&mut build.document, base, &steps, LastStep::Vacant, id)?
                else {
                    return Ok(());
                };
                build.document.set_text(element, value)?;
            }
            None => self.unassembled(id, "binding has no path"),
        }
        Ok(())
    }

    /// Walk `steps` from `start`, creating what is missing. `None` when a step
    /// cannot be created; the reason has been reported.
    fn ensure(
        &mut self,
        document: &mut Document,
        start: NodeId,
        steps: &[&str],
        last: LastStep,
        id: &str,
    ) -> Result<Option<NodeId>> {
        let mut current = start;
        for (i, step) in steps.iter().enumerate() {
            if *step == "." || step.starts_with(".[") {
                continue;
            }
            if step.is_empty() {
                self.unassembled(id, "a '//' step has no single location");
                return Ok(None);
            }
            if *step == ".." {
                match document.parent(current) {
                    Some(parent) => current = parent,
                    None => {
                        self.unassembled(id, "'..' above the document root");
                        return Ok(None);
                    }
                }
                continue;
            }
            let name = step.split('[').next().unwrap_or_default();
            if !is_qname(name) {
                self.unassembled(id, &format!("cannot create step '{step}'"));
                return Ok(None);
            }

            let policy = if i + 1 == steps.len() { last } else { LastStep::Reuse };
            let existing = match policy {
                LastStep::New => None,
                LastStep::Reuse => self.find(document, current, step).into_iter().next(),
                LastStep::Vacant => self
                    .find(document, current, step)
                    .into_iter()
                    .find(|node| document.string_value(*node).trim().is_empty()),
            };
            current = match existing {
                Some(node) => node,
                None => match self.create(document, current, name, step, id)? {
                    Some(node) => node,
                    None => return Ok(None),
                },
            };
        }
        Ok(Some(current))
    }

    fn find(&self, document: &Document, current: NodeId, step: &str) -> Vec<NodeId> {
        let normalized = self.normalizer.normalize(step);
        let Ok(xpath) = XPath::compile(&normalized) else {
            return Vec::new();
        };
        let context = (current != NodeId::DOCUMENT).then_some(Fragment::Element(current));
        xpath
            .select(document, context.as_ref())
            .map(|found| found.iter().filter_map(Fragment::as_element).collect())
            .unwrap_or_default()
    }

    fn create(
        &mut self,
        document: &mut Document,
        parent: NodeId,
        name: &str,
        step: &str,
        id: &str,
    ) -> Result<Option<NodeId>> {
        let (prefix, local) = match name.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, name),
        };
        let namespace = match prefix {
            Some(p) => match document
                .lookup_namespace(parent, Some(p))
                .or_else(|| document.namespace_uri(p))
            {
                Some(uri) => Some(uri.to_string()),
                None => {
                    self.unassembled(id, &format!("unknown namespace prefix '{p}'"));
                    return Ok(None);
                }
            },
            None => document.lookup_namespace(parent, None).map(str::to_string),
        };
        let element = document.create_element(parent, namespace.as_deref(), prefix, local)?;

        for caps in LITERAL_PREDICATE.captures_iter(step) {
            let target = caps[1].trim();
            let literal = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            if let Some(attribute) = target.strip_prefix('@') {
                document.set_attribute(element, attribute, literal)?;
                continue;
            }
            let inner: Vec<&str> = target.split('/').collect();
            if inner.iter().any(|s| s.is_empty() || !is_qname(s)) {
                tracing::debug!(%target, "predicate left unmaterialized");
                continue;
            }
            let Some(holder) = self.ensure(document, element, &inner, LastStep::Reuse, id)? else {
                continue;
            };
            document.set_text(holder, literal)?;
        }
        Ok(Some(element))
    }

    fn unassembled(&mut self, id: &str, reason: &str) {
        report(
            &mut self.diagnostics,
            Diagnostic::Unassembled {
                id: id.to_string(),
                reason: reason.to_string(),
            },
        );
    }
}

/// `name` or `prefix:name` made of name characters only
fn is_qname(name: &str) -> bool {
    let mut parts = name.split(':');
    let valid = |part: &str| {
        part.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
            && part
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    };
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), None, None) => valid(local),
        (Some(prefix), Some(local), None) => valid(prefix) && valid(local),
        _ => false,
    }
}

/// Steps of `path` under `base_path`: relative when `path` continues it,
/// otherwise absolute from the document node.
fn steps_from<'p>(base_path: &str, path: &'p str) -> Vec<&'p str> {
    if let Some(rest) = (!base_path.is_empty())
        .then(|| path.strip_prefix(base_path))
        .flatten()
        .filter(|_| relative_to(path, base_path).is_some())
    {
        let mut steps = split_steps(rest);
        if steps.first().is_some_and(|s| s.is_empty()) {
            steps.remove(0);
        }
        return steps;
    }
    let mut steps = split_steps(path);
    if steps.first().is_some_and(|s| s.is_empty()) {
        steps.remove(0);
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Cardinality;
    use crate::dialect::{Dialect, DialectSettings, Mode};
    use crate::mapper::DocumentMapper;
    use crate::registry::BindingRegistry;
    use crate::tidy::export::TidyExporter;

    fn context(extra: Vec<Binding>) -> BindingContext {
        let mut registry = BindingRegistry::new();
        let rows = vec![
            Binding::new("ROOT").with_semantic_order(1).with_syntax_order(1),
            Binding::new("ID")
                .with_semantic_order(2)
                .with_syntax_order(10)
                .with_level(1)
                .with_path("/R/ID"),
            Binding::new("LINE")
                .with_semantic_order(3)
                .with_syntax_order(20)
                .with_level(1)
                .with_cardinality(Cardinality::Multiple)
                .with_path("/R/Line"),
            Binding::new("LID")
                .with_semantic_order(4)
                .with_syntax_order(30)
                .with_level(2)
                .with_path("/R/Line/LID"),
            Binding::new("UNIT")
                .with_semantic_order(5)
                .with_syntax_order(40)
                .with_level(2)
                .with_path("/R/Line/Qty/@unit"),
        ];
        for binding in rows.into_iter().chain(extra) {
            registry.register(binding);
        }
        BindingContext::build(
            registry,
            DialectSettings::new(Dialect::XbrlGl, Mode::Semantic).with_root_order(1),
        )
    }

    fn table(rows: &[&[&str]]) -> TidyTable {
        TidyTable {
            header: rows[0].iter().map(|c| c.to_string()).collect(),
            rows: rows[1..]
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            offset: 2,
        }
    }

    #[test]
    fn steps_relative_and_absolute() {
        assert_eq!(steps_from("/R/Line", "/R/Line/LID"), vec!["LID"]);
        assert_eq!(steps_from("", "/R/Line/LID"), vec!["R", "Line", "LID"]);
        assert_eq!(steps_from("/R/Line", "/R/Other"), vec!["R", "Other"]);
        assert_eq!(steps_from("/R/L", "/R/Line"), vec!["R", "Line"]);
    }

    #[test]
    fn groups_become_instances() {
        let ctx = context(Vec::new());
        let mut assembler = DocumentAssembler::new(&ctx, Document::parse("<R/>").unwrap(), "d_");
        let rows = table(&[
            &["d_document", "d_LINE", "ID", "LID", "UNIT"],
            &["1", "", "INV-1", "", ""],
            &["1", "1", "", "10", "EA"],
            &["1", "2", "", "20", "KG"],
            &["2", "", "INV-2", "", ""],
        ]);
        let docs = assembler.assemble(&rows).unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].key, "1");
        assert_eq!(
            docs[0].document.to_xml_string(0).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><R><ID>INV-1</ID>\
             <Line><LID>10</LID><Qty unit=\"EA\"/></Line>\
             <Line><LID>20</LID><Qty unit=\"KG\"/></Line></R>\n"
        );
        assert!(assembler.diagnostics().is_empty());
    }

    #[test]
    fn literal_predicates_are_materialized() {
        let ctx = context(vec![Binding::new("CHARGE")
            .with_semantic_order(6)
            .with_syntax_order(50)
            .with_level(1)
            .with_path("/R/Charge[Indicator=false()]/Amount")]);
        let mut assembler = DocumentAssembler::new(&ctx, Document::parse("<R/>").unwrap(), "d_");
        let docs = assembler
            .assemble(&table(&[&["d_document", "d_LINE", "CHARGE"], &["1", "", "5"]]))
            .unwrap();
        let doc = &docs[0].document;
        let amounts = doc
            .select(None, "/R/Charge[Indicator='false']/Amount")
            .unwrap();
        assert_eq!(doc.text_content(&amounts[0]), "5");
    }

    #[test]
    fn descendant_steps_are_reported() {
        let ctx = context(vec![Binding::new("ANY")
            .with_semantic_order(6)
            .with_syntax_order(50)
            .with_level(1)
            .with_path("//Anywhere")]);
        let mut assembler = DocumentAssembler::new(&ctx, Document::parse("<R/>").unwrap(), "d_");
        assembler
            .assemble(&table(&[&["d_document", "d_LINE", "ANY"], &["1", "", "x"]]))
            .unwrap();
        assert!(matches!(
            assembler.diagnostics(),
            [Diagnostic::Unassembled { id, .. }] if id == "ANY"
        ));
    }

    #[test]
    fn export_of_assembled_rows_reproduces_values() {
        let ctx = context(Vec::new());
        let rows = table(&[
            &["d_document", "d_LINE", "ID", "LID", "UNIT"],
            &["1", "", "INV-1", "", ""],
            &["1", "1", "", "10", "EA"],
            &["1", "2", "", "20", "KG"],
        ]);
        let mut assembler = DocumentAssembler::new(&ctx, Document::parse("<R/>").unwrap(), "d_");
        let docs = assembler.assemble(&rows).unwrap();

        let mut exporter = TidyExporter::new(&ctx, "d_");
        for doc in docs {
            let mut mapper = DocumentMapper::new(&ctx, doc.document);
            exporter.add_document(&mut mapper).unwrap();
        }
        assert_eq!(exporter.finish(), rows);
    }
}
