//! Additional anchor inference
//!
//! Some dialects flatten an optional wrapper away, so a child's concrete location
//! sits one step off from where its semantic parent expects it. While scanning
//! bindings in semantic order, each child whose path partially overlaps its
//! parent's path contributes an anchor path to the parent binding. The document
//! mapper re-resolves a binding under its anchors when the direct lookup fails.
//!
//! For child path `S` and parent path `P` (both with selectors stripped) and
//! `extra = S` up to its last `/`:
//!
//! - `extra` has more than one step, `P` contains `extra` and `extra` does not
//!   contain `P`: register `extra` with the child's selector put back.
//! - otherwise, when `P` strictly contains `S`: register the raw child path.

use super::effective_level;
use crate::dialect::DialectRules;
use crate::path::{parent_path, resume_selector, strip_selector};
use crate::registry::BindingRegistry;

/// Infer the anchor for a child path under a parent path, if any.
pub fn infer_anchor(child_path: &str, parent_path_raw: &str) -> Option<String> {
    let stripped = strip_selector(child_path);
    let parent = strip_selector(parent_path_raw);
    let extra = parent_path(&stripped);

    if !extra.is_empty()
        && extra.rfind('/').is_some_and(|i| i > 0)
        && parent.contains(extra)
        && !extra.contains(parent.as_str())
    {
        return Some(resume_selector(extra, child_path));
    }
    if !stripped.is_empty() && parent.contains(stripped.as_str()) && stripped != parent {
        return Some(child_path.to_string());
    }
    None
}

/// Scan the registry in semantic order and record inferred anchors on parents.
pub(crate) fn infer_anchors(registry: &mut BindingRegistry, rules: &DialectRules) -> usize {
    let mut found: Vec<(String, String)> = Vec::new();
    let mut at_level: Vec<Option<String>> = Vec::new();

    for (_, binding) in registry.semantic_bindings() {
        let Some(level) = effective_level(binding.level, rules) else {
            continue;
        };
        if at_level.len() <= level {
            at_level.resize(level + 1, None);
        }
        at_level[level] = Some(binding.id.clone());

        if level == 0 {
            continue;
        }
        let Some(parent_id) = at_level[level - 1].as_deref() else {
            continue;
        };
        let Ok(parent) = registry.by_id(parent_id) else {
            continue;
        };
        if let Some(anchor) = infer_anchor(&binding.path, &parent.path) {
            tracing::debug!(parent = %parent.id, child = %binding.id, %anchor, "anchor inferred");
            found.push((parent.id.clone(), anchor));
        }
    }

    let mut added = 0;
    for (parent_id, anchor) in found {
        if let Ok(parent) = registry.by_id_mut(&parent_id) {
            if parent.add_additional_path(anchor) {
                added += 1;
            }
        }
    }
    added
}
