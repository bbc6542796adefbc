//! Error types for binding, document and table operations

use std::path::PathBuf;

/// Errors that stop the current run or the current document.
///
/// Structural problems in the binding sheet and data-quality findings are not
/// errors; they are collected as [`crate::diagnostics::Diagnostic`] values.
#[derive(Debug, thiserror::Error)]
pub enum SemsynError {
    /// Reading or writing a file failed
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A delimited table could not be decoded
    #[error("CSV error in {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },
    /// The XML document could not be parsed
    #[error("XML parse error: {0}")]
    Xml(String),
    /// The XML document could not be written
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// No binding is registered under this id
    #[error("Unknown binding id '{0}'")]
    UnknownId(String),
    /// No binding is registered under this order key
    #[error("Unknown {kind} order {order}")]
    UnknownOrder { kind: &'static str, order: u32 },
    /// The dialect tag is not one of the supported dialects
    #[error("Unknown dialect '{0}'")]
    UnknownDialect(String),
    /// The processing mode is neither semantic nor syntax
    #[error("Invalid processing mode '{0}'")]
    InvalidMode(String),
    /// A table lacks a column the operation depends on
    #[error("Missing column '{0}'")]
    MissingColumn(String),
}

impl SemsynError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SemsynError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(context: impl Into<String>, source: csv::Error) -> Self {
        SemsynError::Csv {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SemsynError>;
