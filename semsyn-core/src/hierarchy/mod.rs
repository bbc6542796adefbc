//! Reconstructs the semantic and syntax forests from flat order keys and depths.
//!
//! # The High-Level Concept
//!
//! A binding sheet never states parent/child relations. Each row only carries an
//! order key and a depth. Scanned in ascending order, the most recent row seen at
//! depth `L - 1` is the parent of a row at depth `L`, exactly as in an outline.
//! The builder keeps one growable "ancestor at level" vector per pass instead of
//! recursing.
//!
//! Example scan (semantic order, level):
//! ```text
//! 10 L0   <- child of root, ancestor[0] = 10
//! 20 L1   <- child of 10,   ancestor[1] = 20
//! 30 L2   <- child of 20,   ancestor[2] = 30
//! 40 L1   <- child of 10,   ancestor[1] = 40, ancestor[2] still 30
//! 50 L0   <- child of root
//! ```
//!
//! # The Algorithm
//!
//! 1. **Semantic pass:** bindings in ascending semantic order, level plus the
//!    dialect level offset. A negative level is reported and skipped.
//! 2. **Placement:** level 0 attaches to the root, deeper levels to
//!    `ancestor[L-1]`. A missing ancestor is reported and the row is not attached.
//!    `ancestor[L]` is set to the row either way; deeper entries are kept.
//! 3. **Anchor inference:** see [`anchors`].
//! 4. **Syntax pass:** bindings in ascending syntax order with their own ancestor
//!    vector. Dialects that flatten unit wrappers lower the level of wrapped leaves
//!    by one. A negative level silently excludes the row from the syntax forest.

pub mod anchors;

use crate::diagnostics::{report, Diagnostic, ForestKind};
use crate::dialect::DialectRules;
use crate::path::strip_selector;
use crate::registry::BindingRegistry;
use std::collections::BTreeMap;

/// Unit data type suffixes whose element only wraps a value
pub const UNIT_SUFFIXES: [&str; 20] = [
    "/Amount",
    "/BinaryObject",
    "/Code",
    "/DateTime",
    "/Date",
    "/Graphic",
    "/ID",
    "/Indicator",
    "/Measure",
    "/Name",
    "/Numeric",
    "/Percent",
    "/Picture",
    "/Quantity",
    "/Rate",
    "/Sound",
    "/Text",
    "/Time",
    "/Value",
    "/Video",
];

/// Communication channel elements that wrap a single URI or number
pub const COMMUNICATION_WRAPPERS: [&str; 3] = [
    "TelephoneCIUniversalCommunication",
    "FaxCIUniversalCommunication",
    "EmailURICIUniversalCommunication",
];

/// True when a selector-free path denotes a unit wrapper around a leaf
pub fn is_unit_wrapper(stripped: &str) -> bool {
    UNIT_SUFFIXES.iter().any(|suffix| stripped.ends_with(suffix))
        || COMMUNICATION_WRAPPERS
            .iter()
            .any(|name| matches!(stripped.find(name), Some(i) if i > 0))
}

/// An ordered forest of order keys under a single root sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forest {
    kind: ForestKind,
    root: u32,
    children: BTreeMap<u32, Vec<u32>>,
    parents: BTreeMap<u32, u32>,
}

impl Forest {
    pub fn new(kind: ForestKind, root: u32) -> Self {
        Forest {
            kind,
            root,
            children: BTreeMap::new(),
            parents: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> ForestKind {
        self.kind
    }

    pub fn root(&self) -> u32 {
        self.root
    }

    fn attach(&mut self, parent: u32, child: u32) {
        if parent == child || self.parents.contains_key(&child) {
            return;
        }
        self.children.entry(parent).or_default().push(child);
        self.parents.insert(child, parent);
    }

    /// Children of `order` in scan order
    pub fn children(&self, order: u32) -> &[u32] {
        self.children.get(&order).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent(&self, order: u32) -> Option<u32> {
        self.parents.get(&order).copied()
    }

    /// Ancestors from the parent up to and including the root
    pub fn ancestors(&self, order: u32) -> Vec<u32> {
        let mut chain = Vec::new();
        let mut current = order;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// True for the root and every attached node
    pub fn contains(&self, order: u32) -> bool {
        order == self.root || self.parents.contains_key(&order)
    }

    /// Level below the root, 0 for top-level nodes; `None` for the root itself
    /// and for detached orders
    pub fn depth(&self, order: u32) -> Option<usize> {
        self.parents
            .contains_key(&order)
            .then(|| self.ancestors(order).len() - 1)
    }

    /// Attached nodes, root excluded
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Depth-first pre-order walk from the root, root excluded, with depths
    pub fn iter(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        let mut stack: Vec<(u32, usize)> = self
            .children(self.root)
            .iter()
            .rev()
            .map(|c| (*c, 0))
            .collect();
        std::iter::from_fn(move || {
            let (order, depth) = stack.pop()?;
            stack.extend(self.children(order).iter().rev().map(|c| (*c, depth + 1)));
            Some((order, depth))
        })
    }
}

/// Per-level "most recent order key" memory used while scanning
#[derive(Debug, Default)]
struct AncestorTrail {
    levels: Vec<Option<u32>>,
}

impl AncestorTrail {
    fn at(&self, level: usize) -> Option<u32> {
        self.levels.get(level).copied().flatten()
    }

    fn set(&mut self, level: usize, order: u32) {
        if self.levels.len() <= level {
            self.levels.resize(level + 1, None);
        }
        self.levels[level] = Some(order);
    }
}

fn place(
    forest: &mut Forest,
    trail: &mut AncestorTrail,
    order: u32,
    level: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if level == 0 {
        if order != forest.root {
            forest.attach(forest.root, order);
        }
    } else {
        match trail.at(level - 1) {
            Some(parent) => forest.attach(parent, order),
            None => report(
                diagnostics,
                Diagnostic::MissingAncestor {
                    forest: forest.kind,
                    order,
                    level,
                },
            ),
        }
    }
    trail.set(level, order);
}

/// Authored level shifted by the dialect offset, `None` above the root
pub(crate) fn effective_level(level: usize, rules: &DialectRules) -> Option<usize> {
    usize::try_from(level as isize + rules.level_offset).ok()
}

pub(crate) fn build_semantic(
    registry: &BindingRegistry,
    rules: &DialectRules,
    root: u32,
    diagnostics: &mut Vec<Diagnostic>,
) -> Forest {
    let mut forest = Forest::new(ForestKind::Semantic, root);
    let mut trail = AncestorTrail::default();
    for (order, binding) in registry.semantic_bindings() {
        let Some(level) = effective_level(binding.level, rules) else {
            report(
                diagnostics,
                Diagnostic::NegativeLevel {
                    id: binding.id.clone(),
                },
            );
            continue;
        };
        place(&mut forest, &mut trail, order, level, diagnostics);
    }
    tracing::debug!(nodes = forest.len(), "semantic forest built");
    forest
}

pub(crate) fn build_syntax(
    registry: &BindingRegistry,
    rules: &DialectRules,
    root: u32,
    diagnostics: &mut Vec<Diagnostic>,
) -> Forest {
    let mut forest = Forest::new(ForestKind::Syntax, root);
    let mut trail = AncestorTrail::default();
    for (order, binding) in registry.syntax_bindings() {
        let mut level = binding.level as isize + rules.level_offset;
        if rules.flatten_unit_wrappers && is_unit_wrapper(&strip_selector(&binding.path)) {
            level -= 1;
        }
        let Ok(level) = usize::try_from(level) else {
            tracing::trace!(id = %binding.id, "excluded from syntax forest");
            continue;
        };
        place(&mut forest, &mut trail, order, level, diagnostics);
    }
    tracing::debug!(nodes = forest.len(), "syntax forest built");
    forest
}
