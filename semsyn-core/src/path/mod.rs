//! Path algebra
//!
//!     Pure string utilities over structural path expressions. Nothing in here
//!     touches a document: selectors are located by bracket position, steps by
//!     `/` outside brackets and quotes.
//!
//!     A selector is the bracketed predicate text of a path, taken from the first
//!     `[` to the last `]`. Paths in binding sheets carry at most one selector
//!     group in practice, which is what these functions assume.

mod normalize;

pub use normalize::{replace_charge_indicator, shorten_path, PathNormalizer};

/// Marker of the one structure whose selector is put back by [`resume_selector`]
pub const SELECTOR_BEARING_MARKER: &str = "cac:AllowanceCharge";

fn selector_bounds(path: &str) -> Option<(usize, usize)> {
    let start = path.find('[')?;
    let last = path.rfind(']')?;
    (last > start).then_some((start, last))
}

/// The bracketed selector of `path`, or an empty string.
pub fn extract_selector(path: &str) -> &str {
    match selector_bounds(path) {
        Some((start, last)) => &path[start..=last],
        None => "",
    }
}

/// `path` with its bracketed selector removed.
pub fn strip_selector(path: &str) -> String {
    match selector_bounds(path) {
        Some((start, last)) => format!("{}{}", &path[..start], &path[last + 1..]),
        None => path.to_string(),
    }
}

/// Put the selector of `original` back into `stripped`.
///
/// Only paths naming [`SELECTOR_BEARING_MARKER`] are rewritten; any other path is
/// returned unchanged. The selector goes where it stood in `original`.
pub fn resume_selector(stripped: &str, original: &str) -> String {
    if !stripped.contains(SELECTOR_BEARING_MARKER) {
        return stripped.to_string();
    }
    let Some((start, _)) = selector_bounds(original) else {
        return stripped.to_string();
    };
    let selector = extract_selector(original);
    if start >= stripped.len() || !stripped.is_char_boundary(start) {
        return format!("{stripped}{selector}");
    }
    let (head, tail) = stripped.split_at(start);
    let tail = tail.strip_prefix('/').unwrap_or(tail);
    if tail.is_empty() {
        format!("{head}{selector}")
    } else {
        format!("{head}{selector}/{tail}")
    }
}

/// `path` up to, not including, its last step separator.
pub fn parent_path(path: &str) -> &str {
    match last_separator(path) {
        Some(i) => &path[..i],
        None => "",
    }
}

fn last_separator(path: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut last = None;
    for (i, c) in path.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '/') if depth == 0 => last = Some(i),
            _ => {}
        }
    }
    last
}

/// Split a path into its steps on `/` outside predicates.
///
/// An absolute path yields a leading empty step and `//` an empty step in the
/// middle, so `"/A//B[x/y='1']"` gives `["", "A", "", "B[x/y='1']"]`.
pub fn split_steps(path: &str) -> Vec<&str> {
    let mut steps = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in path.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '/') if depth == 0 => {
                steps.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < path.len() || path.is_empty() {
        steps.push(&path[start..]);
    }
    steps
}

/// The final step of `path`, predicates included.
pub fn last_segment(path: &str) -> &str {
    match last_separator(path) {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Rewrite `child` relative to `parent` when the parent path structurally
/// contains it: `/A/B` under `/A` becomes `./B`, `/A[x]` under `/A` becomes `.[x]`.
///
/// Returns `None` when `child` does not continue `parent` at a step boundary.
pub fn relative_to(child: &str, parent: &str) -> Option<String> {
    if parent.is_empty() {
        return None;
    }
    let rest = child.strip_prefix(parent)?;
    match rest.chars().next() {
        None => Some(".".to_string()),
        Some('/') | Some('[') => Some(format!(".{rest}")),
        Some(_) => None,
    }
}
