//! Treeviz rendering of the binding forests
//!
//! One line per binding, nesting drawn with box characters:
//!
//!     <prefix><connector> <id>[ [*]] <short path>
//!
//! `[*]` marks a repeating binding. Paths are shortened with the dialect's
//! abbreviations. With anchors shown, each inferred anchor of a binding is
//! listed right under it as `↳ <anchor>`.

use crate::binding::Binding;
use crate::context::BindingContext;
use crate::diagnostics::ForestKind;
use crate::hierarchy::Forest;
use crate::path::shorten_path;

pub fn render_forest(ctx: &BindingContext, kind: ForestKind, show_anchors: bool) -> String {
    let forest = ctx.forest(kind);
    let mut output = String::new();
    let root_label = binding_at(ctx, kind, forest.root())
        .map(|b| b.id.clone())
        .unwrap_or_else(|| format!("{kind} root"));
    output.push_str(&format!("⧉ {root_label}\n"));

    let children = forest.children(forest.root());
    for (i, child) in children.iter().enumerate() {
        render_node(
            ctx,
            forest,
            *child,
            "",
            i + 1 == children.len(),
            show_anchors,
            &mut output,
        );
    }
    output
}

fn binding_at(ctx: &BindingContext, kind: ForestKind, order: u32) -> Option<&Binding> {
    match kind {
        ForestKind::Semantic => ctx.registry().by_semantic_order(order).ok(),
        ForestKind::Syntax => ctx.registry().by_syntax_order(order).ok(),
    }
}

fn label(ctx: &BindingContext, binding: &Binding) -> String {
    let mut label = binding.id.clone();
    if binding.is_multiple() {
        label.push_str(" [*]");
    }
    if !binding.path.is_empty() {
        label.push(' ');
        label.push_str(&shorten_path(ctx.settings().rules(), &binding.path));
    }
    label
}

fn render_node(
    ctx: &BindingContext,
    forest: &Forest,
    order: u32,
    prefix: &str,
    is_last: bool,
    show_anchors: bool,
    output: &mut String,
) {
    let connector = if is_last { "└─" } else { "├─" };
    let text = match binding_at(ctx, forest.kind(), order) {
        Some(binding) => label(ctx, binding),
        None => format!("#{order}"),
    };
    output.push_str(&format!("{prefix}{connector} {text}\n"));

    let child_prefix = format!("{}{}", prefix, if is_last { "  " } else { "│ " });
    if show_anchors {
        if let Some(binding) = binding_at(ctx, forest.kind(), order) {
            for anchor in &binding.additional_paths {
                output.push_str(&format!("{child_prefix}↳ {anchor}\n"));
            }
        }
    }

    let children = forest.children(order);
    for (i, child) in children.iter().enumerate() {
        render_node(
            ctx,
            forest,
            *child,
            &child_prefix,
            i + 1 == children.len(),
            show_anchors,
            output,
        );
    }
}
