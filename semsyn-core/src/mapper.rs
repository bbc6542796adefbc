//! Document mapper
//!
//! Resolves bindings against one parsed document. For a child binding under a
//! matched parent fragment the lookup precedence is:
//!
//! 1. skip children with an empty path
//! 2. a child path that continues the parent path is rewritten relative to the
//!    parent (`/R/A/B` under `/R/A` becomes `./B`) and evaluated on the parent
//!    fragment; any other path is evaluated from the document root
//! 3. nothing found, syntax mode and a default value: synthesize one element (or
//!    attribute) under the parent carrying the default
//! 4. nothing found: evaluate each anchor of the child under the parent and
//!    re-evaluate the child path on the first anchor match
//!
//! The first step with results wins. Synthesis mutates the owned document, so a
//! later lookup finds the created node directly.

use crate::binding::Binding;
use crate::context::BindingContext;
use crate::diagnostics::{report, Diagnostic};
use crate::dialect::Mode;
use crate::error::Result;
use crate::path::{last_segment, relative_to, shorten_path, strip_selector, PathNormalizer};
use crate::xml::{Document, Fragment, XPath};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Fragments matched for one semantic binding in one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNode {
    pub id: String,
    pub semantic_order: u32,
    pub fragments: Vec<Fragment>,
}

/// Per-document harvest keyed by semantic order
pub type NodeMap = BTreeMap<u32, ParsedNode>;

/// One matched fragment of a binding and the matches of its semantic children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub id: String,
    pub semantic_order: u32,
    pub fragment: Fragment,
    pub children: Vec<ResolvedNode>,
}

pub struct DocumentMapper<'c> {
    ctx: &'c BindingContext,
    document: Document,
    normalizer: PathNormalizer,
    compiled: HashMap<String, XPath>,
    used: BTreeSet<String>,
    synthesized: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'c> DocumentMapper<'c> {
    /// Take ownership of `document` and capture its currency codes.
    pub fn new(ctx: &'c BindingContext, document: Document) -> Self {
        let rules = ctx.settings().rules();
        let mut mapper = DocumentMapper {
            ctx,
            document,
            normalizer: PathNormalizer::without_currencies(rules),
            compiled: HashMap::new(),
            used: BTreeSet::new(),
            synthesized: 0,
            diagnostics: Vec::new(),
        };
        let settings = ctx.settings();
        let document_currency = mapper.capture(settings.document_currency_id.as_deref());
        let tax_currency = mapper.capture(settings.tax_currency_id.as_deref());
        tracing::debug!(?document_currency, ?tax_currency, "currencies captured");
        mapper.normalizer = PathNormalizer::new(rules, document_currency, tax_currency);
        mapper
    }

    fn capture(&mut self, id: Option<&str>) -> Option<String> {
        let ctx = self.ctx;
        let binding = ctx.registry().by_id(id?).ok()?;
        let found = self.evaluate(None, &binding.path);
        let value = self.document.text_content(found.first()?);
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn document_currency(&self) -> Option<&str> {
        self.normalizer.document_currency()
    }

    pub fn tax_currency(&self) -> Option<&str> {
        self.normalizer.tax_currency()
    }

    /// Ids resolved to at least one fragment so far
    pub fn used_ids(&self) -> &BTreeSet<String> {
        &self.used
    }

    /// Number of fragments created from default values
    pub fn synthesized(&self) -> usize {
        self.synthesized
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Normalize, compile and evaluate. Failures are reported and yield nothing.
    fn evaluate(&mut self, context: Option<&Fragment>, raw: &str) -> Vec<Fragment> {
        let normalized = self.normalizer.normalize(raw);
        if !self.compiled.contains_key(&normalized) {
            match XPath::compile(&normalized) {
                Ok(xpath) => {
                    self.compiled.insert(normalized.clone(), xpath);
                }
                Err(e) => {
                    self.path_failure(raw, e.to_string());
                    return Vec::new();
                }
            }
        }
        let Some(xpath) = self.compiled.get(&normalized) else {
            return Vec::new();
        };
        match xpath.select(&self.document, context) {
            Ok(found) => found,
            Err(e) => {
                self.path_failure(raw, e.to_string());
                Vec::new()
            }
        }
    }

    fn path_failure(&mut self, raw: &str, message: String) {
        let path = shorten_path(self.ctx.settings().rules(), raw);
        report(
            &mut self.diagnostics,
            Diagnostic::PathEvaluation { path, message },
        );
    }

    fn mark_used(&mut self, id: &str) {
        if !self.used.contains(id) {
            self.used.insert(id.to_string());
        }
    }

    /// All fragments matching a binding's path from the document root.
    pub fn resolve(&mut self, id: &str) -> Result<Vec<Fragment>> {
        let ctx = self.ctx;
        let binding = ctx.binding(id)?;
        if binding.path.is_empty() {
            return Ok(Vec::new());
        }
        let found = self.evaluate(None, &binding.path);
        tracing::debug!(
            id,
            path = %shorten_path(ctx.settings().rules(), &binding.path),
            matches = found.len(),
            "resolve"
        );
        if !found.is_empty() {
            self.mark_used(id);
        }
        Ok(found)
    }

    /// Text content of every fragment matching a binding
    pub fn values(&mut self, id: &str) -> Result<Vec<String>> {
        let found = self.resolve(id)?;
        Ok(found
            .iter()
            .map(|f| self.document.text_content(f))
            .collect())
    }

    fn fetch(&mut self, parent: &Fragment, parent_binding: &Binding, child: &Binding) -> Vec<Fragment> {
        match relative_to(&child.path, &parent_binding.path) {
            Some(relative) => self.evaluate(Some(parent), &relative),
            None => self.evaluate(None, &child.path),
        }
    }

    /// Fetch a child under `parent`; when nothing matches, complete the document
    /// with the child's default value (syntax mode only).
    pub fn complete_or_fetch(
        &mut self,
        parent: &Fragment,
        parent_id: &str,
        child_id: &str,
    ) -> Result<Vec<Fragment>> {
        let ctx = self.ctx;
        let parent_binding = ctx.binding(parent_id)?;
        let child = ctx.binding(child_id)?;
        if child.path.is_empty() {
            return Ok(Vec::new());
        }
        let found = self.fetch(parent, parent_binding, child);
        if !found.is_empty() {
            return Ok(found);
        }
        Ok(self.synthesize(parent, child)?.into_iter().collect())
    }

    fn synthesize(&mut self, parent: &Fragment, child: &Binding) -> Result<Option<Fragment>> {
        if self.ctx.settings().mode != Mode::Syntax {
            return Ok(None);
        }
        let (Some(value), Some(owner)) = (child.default_value(), parent.as_element()) else {
            return Ok(None);
        };
        let name = strip_selector(last_segment(&child.path));

        if let Some(attribute) = name.strip_prefix('@') {
            let index = self.document.set_attribute(owner, attribute, value)?;
            self.synthesized += 1;
            tracing::debug!(id = %child.id, %name, value, "attribute synthesized");
            return Ok(Some(Fragment::Attribute(owner, index)));
        }

        if name.is_empty() || name.contains(['(', '*', '.']) {
            tracing::debug!(id = %child.id, %name, "cannot synthesize from this step");
            return Ok(None);
        }
        let (prefix, local) = match name.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, name.as_str()),
        };
        let namespace = match prefix {
            Some(prefix) => match self.document.namespace_uri(prefix) {
                Some(uri) => Some(uri.to_string()),
                None => {
                    self.path_failure(
                        &child.path,
                        format!("unknown namespace prefix '{prefix}'"),
                    );
                    return Ok(None);
                }
            },
            None => None,
        };
        let element = self
            .document
            .create_element(owner, namespace.as_deref(), prefix, local)?;
        self.document.set_text(element, value)?;
        self.synthesized += 1;
        tracing::debug!(id = %child.id, %name, value, "element synthesized");
        Ok(Some(Fragment::Element(element)))
    }

    fn anchored(&mut self, parent: &Fragment, child: &Binding) -> Vec<Fragment> {
        for anchor in &child.additional_paths {
            let anchors = self.evaluate(Some(parent), anchor);
            if let Some(first) = anchors.first() {
                let found = self.evaluate(Some(first), &child.path);
                if !found.is_empty() {
                    tracing::debug!(id = %child.id, %anchor, "resolved through anchor");
                    return found;
                }
            }
        }
        Vec::new()
    }

    /// Fragments of every semantic child of `parent_id` under `parent`, keyed by
    /// child semantic order. Children without matches are left out.
    pub fn resolve_children(
        &mut self,
        parent: &Fragment,
        parent_id: &str,
    ) -> Result<BTreeMap<u32, Vec<Fragment>>> {
        let ctx = self.ctx;
        let mut found_children = BTreeMap::new();
        for child in ctx.semantic_children(parent_id)? {
            let Some(order) = child.semantic_order else {
                continue;
            };
            if child.path.is_empty() {
                continue;
            }
            let mut found = self.complete_or_fetch(parent, parent_id, &child.id)?;
            if found.is_empty() {
                found = self.anchored(parent, child);
            }
            if found.is_empty() {
                if child.is_required() {
                    report(
                        &mut self.diagnostics,
                        Diagnostic::Unresolved {
                            id: child.id.clone(),
                        },
                    );
                }
                continue;
            }
            self.mark_used(&child.id);
            found_children.insert(order, found);
        }
        Ok(found_children)
    }

    /// Resolve every semantic binding from the document root.
    pub fn parse_all(&mut self) -> NodeMap {
        let ctx = self.ctx;
        let mut nodes = NodeMap::new();
        for (order, binding) in ctx.registry().semantic_bindings() {
            if !ctx.semantic().contains(order) {
                continue;
            }
            match self.resolve(&binding.id) {
                Ok(fragments) if !fragments.is_empty() => {
                    nodes.insert(
                        order,
                        ParsedNode {
                            id: binding.id.clone(),
                            semantic_order: order,
                            fragments,
                        },
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(id = %binding.id, "{e}"),
            }
        }
        nodes
    }

    /// Walk the semantic forest from the top-level bindings down, resolving
    /// children under each matched fragment.
    pub fn resolve_tree(&mut self) -> Result<Vec<ResolvedNode>> {
        let ctx = self.ctx;
        let mut roots = Vec::new();
        for binding in ctx.top_level() {
            let Some(order) = binding.semantic_order else {
                continue;
            };
            let found = self.resolve(&binding.id)?;
            if found.is_empty() && binding.is_required() {
                report(
                    &mut self.diagnostics,
                    Diagnostic::Unresolved {
                        id: binding.id.clone(),
                    },
                );
            }
            for fragment in found {
                roots.push(self.resolve_subtree(&binding.id, order, fragment)?);
            }
        }
        tracing::info!(
            used = self.used.len(),
            synthesized = self.synthesized,
            "document resolved"
        );
        Ok(roots)
    }

    fn resolve_subtree(&mut self, id: &str, order: u32, fragment: Fragment) -> Result<ResolvedNode> {
        let mut children = Vec::new();
        for (child_order, fragments) in self.resolve_children(&fragment, id)? {
            let child_id = self.ctx.semantic_binding(child_order)?.id.clone();
            for child_fragment in fragments {
                children.push(self.resolve_subtree(&child_id, child_order, child_fragment)?);
            }
        }
        Ok(ResolvedNode {
            id: id.to_string(),
            semantic_order: order,
            fragment,
            children,
        })
    }
}
