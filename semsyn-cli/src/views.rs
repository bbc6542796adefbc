//! Inspection views for a loaded binding sheet
//!
//! Each view renders one aspect of the binding context:
//!
//! - `semantic`:      the semantic forest as a tree (default)
//! - `syntax`:        the syntax forest as a tree
//! - `anchors`:       the semantic forest with inferred anchor paths under each node
//! - `bindings-json`: every bound binding in semantic order, as JSON
//!
//! Example: `semsyn inspect bindings.csv syntax`

use semsyn_core::treeviz::render_forest;
use semsyn_core::{Binding, BindingContext, ForestKind};

/// All available inspection views
pub const AVAILABLE_VIEWS: &[&str] = &["semantic", "syntax", "anchors", "bindings-json"];

pub const DEFAULT_VIEW: &str = "semantic";

/// Render a named view of the context, or an error message for unknown views
pub fn execute_view(ctx: &BindingContext, view: &str) -> Result<String, String> {
    match view {
        "semantic" => Ok(render_forest(ctx, ForestKind::Semantic, false)),
        "syntax" => Ok(render_forest(ctx, ForestKind::Syntax, false)),
        "anchors" => Ok(render_forest(ctx, ForestKind::Semantic, true)),
        "bindings-json" => {
            let bindings: Vec<&Binding> = ctx
                .registry()
                .semantic_bindings()
                .map(|(_, binding)| binding)
                .collect();
            let mut json = serde_json::to_string_pretty(&bindings)
                .map_err(|e| format!("JSON serialization failed: {e}"))?;
            json.push('\n');
            Ok(json)
        }
        other => Err(format!(
            "Unknown view '{other}'. Available views: {}",
            AVAILABLE_VIEWS.join(", ")
        )),
    }
}
