//! Binding registry: one record per information item and its lookup indices
//!
//! Bindings are kept by id. Those that carry a syntax order are additionally
//! indexed by semantic order, by syntax order and, when they declare a default
//! value, in the default index. A binding without a syntax order is declared but
//! not bound to the syntax, so it never enters an order-keyed index.
//!
//! # Examples
//!
//! ```ignore
//! let mut registry = BindingRegistry::new();
//! registry.register(Binding::new("ibt-001").with_semantic_order(10).with_syntax_order(10));
//!
//! let binding = registry.by_semantic_order(10)?;
//! assert_eq!(binding.id, "ibt-001");
//! ```

use crate::binding::Binding;
use crate::diagnostics::{report, Diagnostic};
use crate::error::{Result, SemsynError};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Default, Clone)]
pub struct BindingRegistry {
    bindings: HashMap<String, Binding>,
    by_semantic: BTreeMap<u32, String>,
    by_syntax: BTreeMap<u32, String>,
    defaults: BTreeSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl BindingRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding.
    ///
    /// Returns `false` when the binding was rejected (duplicate id) or was kept
    /// by id only because it has no syntax order. Both cases are recorded as
    /// diagnostics.
    pub fn register(&mut self, binding: Binding) -> bool {
        if self.bindings.contains_key(&binding.id) {
            report(
                &mut self.diagnostics,
                Diagnostic::DuplicateId {
                    id: binding.id.clone(),
                },
            );
            return false;
        }

        let id = binding.id.clone();
        let Some(syntax_order) = binding.syntax_order else {
            report(&mut self.diagnostics, Diagnostic::UnboundSyntax { id: id.clone() });
            self.bindings.insert(id, binding);
            return false;
        };

        tracing::trace!(
            id = %id,
            semantic = ?binding.semantic_order,
            syntax = syntax_order,
            path = %binding.path,
            "register binding"
        );

        if let Some(order) = binding.semantic_order {
            self.by_semantic.insert(order, id.clone());
        }
        self.by_syntax.insert(syntax_order, id.clone());
        if binding.default_value().is_some() {
            self.defaults.insert(id.clone());
        }
        self.bindings.insert(id, binding);
        true
    }

    pub fn by_id(&self, id: &str) -> Result<&Binding> {
        self.bindings
            .get(id)
            .ok_or_else(|| SemsynError::UnknownId(id.to_string()))
    }

    pub(crate) fn by_id_mut(&mut self, id: &str) -> Result<&mut Binding> {
        self.bindings
            .get_mut(id)
            .ok_or_else(|| SemsynError::UnknownId(id.to_string()))
    }

    pub fn by_semantic_order(&self, order: u32) -> Result<&Binding> {
        self.by_semantic
            .get(&order)
            .and_then(|id| self.bindings.get(id))
            .ok_or(SemsynError::UnknownOrder {
                kind: "semantic",
                order,
            })
    }

    pub fn by_syntax_order(&self, order: u32) -> Result<&Binding> {
        self.by_syntax
            .get(&order)
            .and_then(|id| self.bindings.get(id))
            .ok_or(SemsynError::UnknownOrder {
                kind: "syntax",
                order,
            })
    }

    /// Check if a binding with this id exists
    pub fn has(&self, id: &str) -> bool {
        self.bindings.contains_key(id)
    }

    /// Ids of indexed bindings whose matches form a repeating group
    pub fn ids_with_multiple_cardinality(&self) -> BTreeSet<String> {
        self.by_syntax
            .values()
            .filter_map(|id| self.bindings.get(id))
            .filter(|binding| binding.is_multiple())
            .map(|binding| binding.id.clone())
            .collect()
    }

    /// Indexed bindings that declare a default value, by id
    pub fn defaults(&self) -> impl Iterator<Item = &Binding> {
        self.defaults.iter().filter_map(|id| self.bindings.get(id))
    }

    /// Bindings in ascending semantic order
    pub fn semantic_bindings(&self) -> impl Iterator<Item = (u32, &Binding)> {
        self.by_semantic
            .iter()
            .filter_map(|(order, id)| self.bindings.get(id).map(|b| (*order, b)))
    }

    /// Bindings in ascending syntax order
    pub fn syntax_bindings(&self) -> impl Iterator<Item = (u32, &Binding)> {
        self.by_syntax
            .iter()
            .filter_map(|(order, id)| self.bindings.get(id).map(|b| (*order, b)))
    }

    pub(crate) fn semantic_ids(&self) -> Vec<String> {
        self.by_semantic.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
