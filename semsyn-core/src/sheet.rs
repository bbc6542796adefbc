//! Binding sheet loader
//!
//! A binding sheet is a delimited table with one row per information item.
//! Columns are recognised by header name, so sheets may carry any subset of the
//! known columns in any order (extra columns are ignored):
//!
//! ```text
//! semSort,id,level,card,semPath,businessTerm,defaultValue,dataType,synSort,xPath,occur
//! ```
//!
//! Rows are sorted by ascending `semSort` before they are registered because
//! the hierarchy builder depends on that scan order.

use crate::binding::{Binding, Cardinality};
use crate::error::{Result, SemsynError};
use crate::registry::BindingRegistry;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BOM: char = '\u{feff}';

/// Remove a leading UTF-8 byte order mark
pub fn strip_bom(s: &str) -> &str {
    s.strip_prefix(BOM).unwrap_or(s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    SemanticOrder,
    Id,
    Level,
    Cardinality,
    SemanticPath,
    BusinessTerm,
    DefaultValue,
    DataType,
    SyntaxOrder,
    Path,
    Occurrence,
}

impl Column {
    fn from_header(name: &str) -> Option<Self> {
        Some(match name.trim() {
            "semSort" => Column::SemanticOrder,
            "id" => Column::Id,
            "level" => Column::Level,
            "card" => Column::Cardinality,
            "semPath" => Column::SemanticPath,
            "businessTerm" => Column::BusinessTerm,
            "defaultValue" => Column::DefaultValue,
            "dataType" => Column::DataType,
            "synSort" => Column::SyntaxOrder,
            "xPath" => Column::Path,
            "occur" => Column::Occurrence,
            _ => return None,
        })
    }
}

/// Parse a cell made only of ASCII digits
fn parse_number(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn binding_from_row(columns: &[Option<Column>], row: &csv::StringRecord) -> Binding {
    let mut binding = Binding::default();
    for (column, value) in columns.iter().zip(row.iter()) {
        let Some(column) = column else { continue };
        match column {
            Column::SemanticOrder => binding.semantic_order = parse_number(value).filter(|n| *n > 0),
            Column::Id => binding.id = value.trim().to_string(),
            Column::Level => binding.level = parse_number(value).unwrap_or(0) as usize,
            Column::Cardinality => binding.cardinality = Cardinality::parse(value),
            Column::SemanticPath => binding.semantic_path = value.to_string(),
            Column::BusinessTerm => binding.business_term = value.to_string(),
            Column::DefaultValue => binding.set_default_value(value),
            Column::DataType => binding.datatype = value.to_string(),
            Column::SyntaxOrder => binding.syntax_order = parse_number(value).filter(|n| *n > 0),
            Column::Path => binding.set_path(value),
            Column::Occurrence => binding.occurrence = value.trim().to_string(),
        }
    }
    binding
}

/// Read the rows of a binding sheet, sorted by ascending semantic order.
pub fn read_binding_sheet<R: Read>(reader: R, delimiter: u8) -> Result<Vec<Binding>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| SemsynError::csv("binding sheet header", e))?
        .clone();
    let columns: Vec<Option<Column>> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let name = if i == 0 { strip_bom(name) } else { name };
            Column::from_header(name)
        })
        .collect();
    if !columns.contains(&Some(Column::Id)) {
        return Err(SemsynError::MissingColumn("id".to_string()));
    }

    let mut bindings = Vec::new();
    for (n, record) in csv_reader.records().enumerate() {
        let record =
            record.map_err(|e| SemsynError::csv(format!("binding sheet row {}", n + 1), e))?;
        let binding = binding_from_row(&columns, &record);
        if binding.id.is_empty() {
            tracing::debug!(row = n + 1, "skipping binding row without id");
            continue;
        }
        bindings.push(binding);
    }

    // Stable: rows without a semantic order keep their relative order at the end.
    bindings.sort_by_key(|b| b.semantic_order.unwrap_or(u32::MAX));
    Ok(bindings)
}

/// Load a binding sheet into a fresh registry.
pub fn load_binding_sheet<R: Read>(reader: R, delimiter: u8) -> Result<BindingRegistry> {
    let mut registry = BindingRegistry::new();
    for binding in read_binding_sheet(reader, delimiter)? {
        registry.register(binding);
    }
    tracing::info!(bindings = registry.len(), "binding sheet loaded");
    Ok(registry)
}

/// Load a binding sheet from a file.
pub fn load_path(path: impl AsRef<Path>, delimiter: u8) -> Result<BindingRegistry> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SemsynError::io(path, e))?;
    load_binding_sheet(file, delimiter).map_err(|err| match err {
        SemsynError::Csv { context, source } => SemsynError::Csv {
            context: format!("{} ({context})", path.display()),
            source,
        },
        other => other,
    })
}
