//! Non-fatal findings collected while loading sheets, building hierarchies,
//! resolving documents and reshaping tables.
//!
//! Every diagnostic is logged with `tracing::warn!` at the point it is raised
//! and kept so callers (and tests) can inspect what was skipped.

use std::fmt;

/// Which of the two hierarchies a finding refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum ForestKind {
    Semantic,
    Syntax,
}

impl fmt::Display for ForestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForestKind::Semantic => write!(f, "semantic"),
            ForestKind::Syntax => write!(f, "syntax"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Binding declared without a syntax order; kept by id only
    UnboundSyntax { id: String },
    /// A second row reused an existing id; the later row was dropped
    DuplicateId { id: String },
    /// No ancestor recorded at `level - 1` while scanning
    MissingAncestor {
        forest: ForestKind,
        order: u32,
        level: usize,
    },
    /// The dialect level offset pushed the binding above the root
    NegativeLevel { id: String },
    /// Tidy column header names no registered binding
    UnknownColumn { id: String },
    /// Tidy column names a binding that has no syntax order
    UnorderedColumn { id: String },
    /// A path expression could not be evaluated
    PathEvaluation { path: String, message: String },
    /// A required item has no fragment, no default and no anchor match
    Unresolved { id: String },
    /// A tidy cell could not be written into the document
    Unassembled { id: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnboundSyntax { id } => {
                write!(f, "{id} has no syntax order and is not bound")
            }
            Diagnostic::DuplicateId { id } => write!(f, "duplicate binding id {id}"),
            Diagnostic::MissingAncestor {
                forest,
                order,
                level,
            } => write!(
                f,
                "{forest} order {order} at level {level} has no ancestor at level {}",
                level.saturating_sub(1)
            ),
            Diagnostic::NegativeLevel { id } => {
                write!(f, "{id} lies above the root after the level offset")
            }
            Diagnostic::UnknownColumn { id } => write!(f, "{id} is not defined in the bindings"),
            Diagnostic::UnorderedColumn { id } => {
                write!(f, "{id} is defined in the bindings with no syntax order")
            }
            Diagnostic::PathEvaluation { path, message } => {
                write!(f, "cannot evaluate {path}: {message}")
            }
            Diagnostic::Unresolved { id } => write!(f, "required item {id} is not present"),
            Diagnostic::Unassembled { id, reason } => write!(f, "cannot write {id}: {reason}"),
        }
    }
}

/// Log a diagnostic and append it to `sink`.
pub(crate) fn report(sink: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    tracing::warn!("{diagnostic}");
    sink.push(diagnostic);
}
