//! The binding context: registry, both forests and dialect settings, built once
//! per dialect and shared read-only by every document that is processed.

use crate::binding::Binding;
use crate::diagnostics::{Diagnostic, ForestKind};
use crate::dialect::DialectSettings;
use crate::error::Result;
use crate::hierarchy::{self, anchors, Forest};
use crate::registry::BindingRegistry;

#[derive(Debug, Clone)]
pub struct BindingContext {
    registry: BindingRegistry,
    semantic: Forest,
    syntax: Forest,
    settings: DialectSettings,
    diagnostics: Vec<Diagnostic>,
}

impl BindingContext {
    /// Build both forests and infer anchors.
    ///
    /// Registry diagnostics are carried over, so [`BindingContext::diagnostics`]
    /// lists every finding from loading and building.
    pub fn build(mut registry: BindingRegistry, settings: DialectSettings) -> Self {
        let rules = settings.rules();
        let mut diagnostics = registry.diagnostics().to_vec();

        let semantic =
            hierarchy::build_semantic(&registry, rules, settings.root_order, &mut diagnostics);
        let anchors = anchors::infer_anchors(&mut registry, rules);
        let syntax =
            hierarchy::build_syntax(&registry, rules, settings.root_order, &mut diagnostics);

        tracing::info!(
            dialect = %settings.dialect,
            bindings = registry.len(),
            semantic = semantic.len(),
            syntax = syntax.len(),
            anchors,
            "binding context built"
        );

        BindingContext {
            registry,
            semantic,
            syntax,
            settings,
            diagnostics,
        }
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn semantic(&self) -> &Forest {
        &self.semantic
    }

    pub fn syntax(&self) -> &Forest {
        &self.syntax
    }

    pub fn forest(&self, kind: ForestKind) -> &Forest {
        match kind {
            ForestKind::Semantic => &self.semantic,
            ForestKind::Syntax => &self.syntax,
        }
    }

    pub fn settings(&self) -> &DialectSettings {
        &self.settings
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn binding(&self, id: &str) -> Result<&Binding> {
        self.registry.by_id(id)
    }

    /// Binding at a semantic order; the root sentinel has none unless a row uses it
    pub fn semantic_binding(&self, order: u32) -> Result<&Binding> {
        self.registry.by_semantic_order(order)
    }

    /// Semantic children of a binding, resolved to bindings
    pub fn semantic_children(&self, id: &str) -> Result<Vec<&Binding>> {
        let order = match self.binding(id)?.semantic_order {
            Some(order) => order,
            None => return Ok(Vec::new()),
        };
        Ok(self
            .semantic
            .children(order)
            .iter()
            .filter_map(|child| self.registry.by_semantic_order(*child).ok())
            .collect())
    }

    /// Top-level semantic bindings, children of the root
    pub fn top_level(&self) -> Vec<&Binding> {
        self.semantic
            .children(self.semantic.root())
            .iter()
            .filter_map(|order| self.registry.by_semantic_order(*order).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Dialect, Mode};

    #[test]
    fn build_collects_registry_and_builder_findings() {
        let mut registry = BindingRegistry::new();
        registry.register(
            Binding::new("A")
                .with_semantic_order(1)
                .with_syntax_order(1)
                .with_path("/Root/A"),
        );
        registry.register(
            Binding::new("B")
                .with_semantic_order(2)
                .with_syntax_order(2)
                .with_level(1)
                .with_path("/Root/A/B"),
        );
        registry.register(
            Binding::new("C")
                .with_semantic_order(3)
                .with_level(1)
                .with_path("/Root/A/C"),
        );
        registry.register(
            Binding::new("D")
                .with_semantic_order(4)
                .with_syntax_order(4)
                .with_level(3)
                .with_path("/Root/A/X/Y/D"),
        );

        let ctx = BindingContext::build(registry, DialectSettings::new(Dialect::XbrlGl, Mode::Semantic));

        assert_eq!(ctx.semantic().children(0), &[1]);
        assert_eq!(ctx.semantic().children(1), &[2]);
        assert_eq!(ctx.top_level().len(), 1);
        let children: Vec<_> = ctx
            .semantic_children("A")
            .unwrap()
            .into_iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(children, vec!["B"]);
        assert!(ctx.semantic_children("C").unwrap().is_empty());
        assert!(ctx.semantic_children("missing").is_err());
        // C unbound, D missing its ancestor in both passes
        assert_eq!(ctx.diagnostics().len(), 3);
    }
}
