//! Reading and writing delimited tables
//!
//! Rows are plain `Vec<String>`; the header is the first row. Input is UTF-8
//! with an optional byte-order mark on the first cell.

use crate::error::{Result, SemsynError};
use crate::sheet::strip_bom;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

pub fn read_rows<R: Read>(reader: R, delimiter: u8) -> Result<Vec<Vec<String>>> {
    read_with_context(reader, delimiter, "table")
}

pub fn read_rows_from_path(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SemsynError::io(path, e))?;
    read_with_context(file, delimiter, &path.display().to_string())
}

fn read_with_context<R: Read>(reader: R, delimiter: u8, context: &str) -> Result<Vec<Vec<String>>> {
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record.map_err(|e| SemsynError::csv(context, e))?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        if rows.is_empty() {
            if let Some(first) = row.first_mut() {
                *first = strip_bom(first).to_string();
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn write_rows<W: Write>(rows: &[Vec<String>], writer: W, delimiter: u8) -> Result<()> {
    write_with_context(rows, writer, delimiter, "table")
}

/// Render `rows` into an in-memory buffer.
pub fn render_rows(rows: &[Vec<String>], delimiter: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_with_context(rows, &mut buffer, delimiter, "table")?;
    Ok(buffer)
}

/// Write `rows` to `path`. In append mode an existing non-empty file keeps
/// its header and receives the data rows only.
///
/// The table is rendered in memory and written in one call; nothing touches
/// the file when rendering fails.
pub fn write_rows_to_path(
    rows: &[Vec<String>],
    path: impl AsRef<Path>,
    delimiter: u8,
    append: bool,
) -> Result<()> {
    let path = path.as_ref();
    let has_content = append
        && std::fs::metadata(path)
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
    let rows = if has_content {
        rows.get(1..).unwrap_or_default()
    } else {
        rows
    };
    let buffer = render_rows(rows, delimiter).map_err(|err| match err {
        SemsynError::Csv { source, .. } => SemsynError::csv(path.display().to_string(), source),
        other => other,
    })?;

    tracing::debug!(path = %path.display(), rows = rows.len(), append, "writing table");
    let written = if append {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(&buffer))
    } else {
        std::fs::write(path, &buffer)
    };
    written.map_err(|e| SemsynError::io(path, e))
}

fn write_with_context<W: Write>(
    rows: &[Vec<String>],
    writer: W,
    delimiter: u8,
    context: &str,
) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(writer);
    for row in rows {
        csv.write_record(row)
            .map_err(|e| SemsynError::csv(context, e))?;
    }
    csv.flush()
        .map_err(|e| SemsynError::csv(context, e.into()))?;
    Ok(())
}
