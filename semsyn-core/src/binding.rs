//! One information item of the semantic model and its syntax binding.

use serde::Serialize;

/// Marker used in binding sheets for "default value not known"
pub const UNKNOWN_DEFAULT: &str = "?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Cardinality {
    #[default]
    Single,
    Multiple,
}

impl Cardinality {
    /// Parse a `card` cell: `n`, `*` and ranges ending in either are repeating.
    pub fn parse(raw: &str) -> Self {
        let upper = raw.rsplit("..").next().unwrap_or("").trim();
        match upper {
            "n" | "*" => Cardinality::Multiple,
            _ => Cardinality::Single,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Binding {
    pub id: String,
    pub semantic_order: Option<u32>,
    pub syntax_order: Option<u32>,
    /// Depth in the semantic table as authored; dialect offsets are applied
    /// by the hierarchy builder.
    pub level: usize,
    pub cardinality: Cardinality,
    pub default_value: Option<String>,
    pub business_term: String,
    pub datatype: String,
    pub occurrence: String,
    pub semantic_path: String,
    /// Structural path, whitespace removed
    pub path: String,
    /// Inferred anchor paths, insertion ordered and unique
    pub additional_paths: Vec<String>,
}

impl Binding {
    pub fn new(id: impl Into<String>) -> Self {
        Binding {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_semantic_order(mut self, order: u32) -> Self {
        self.semantic_order = (order > 0).then_some(order);
        self
    }

    pub fn with_syntax_order(mut self, order: u32) -> Self {
        self.syntax_order = (order > 0).then_some(order);
        self
    }

    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.set_path(path);
        self
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.set_default_value(value);
        self
    }

    pub fn with_occurrence(mut self, occurrence: &str) -> Self {
        self.occurrence = occurrence.to_string();
        self
    }

    /// Store the path with every whitespace character removed.
    pub fn set_path(&mut self, path: &str) {
        self.path = path.chars().filter(|c| !c.is_whitespace()).collect();
    }

    /// Empty cells and the `?` marker leave the default unset.
    pub fn set_default_value(&mut self, value: &str) {
        self.default_value = if value.is_empty() || value == UNKNOWN_DEFAULT {
            None
        } else {
            Some(value.to_string())
        };
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn is_multiple(&self) -> bool {
        self.cardinality == Cardinality::Multiple
    }

    /// True when the lower bound of the occurrence (or cardinality) is 1.
    pub fn is_required(&self) -> bool {
        self.occurrence.trim_start().starts_with('1')
    }

    /// Register an anchor path; duplicates are ignored.
    pub fn add_additional_path(&mut self, path: String) -> bool {
        if path.is_empty() || self.additional_paths.contains(&path) {
            return false;
        }
        self.additional_paths.push(path);
        true
    }
}
