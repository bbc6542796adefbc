//! Semantic model to XML syntax binding
//!
//!     A binding sheet lists the information items of a semantic model (an invoice,
//!     a ledger entry) and, for each item, where it lives in an XML syntax. This crate
//!     turns such a sheet into two hierarchies and uses them to read documents into
//!     flat tidy tables and to write tidy tables back into documents.
//!
//!     This is a pure lib: it powers semsyn-cli but makes no assumption about a shell,
//!     so nothing in here prints, exits or reads environment variables.
//!
//! Architecture
//!
//!     The file structure :
//!     .
//!     ├── binding.rs          # One information item and its syntax binding
//!     ├── registry.rs         # Bindings keyed by id, semantic order and syntax order
//!     ├── sheet.rs            # Binding sheet loader (CSV)
//!     ├── dialect.rs          # Dialect tags, modes and per-dialect rules
//!     ├── hierarchy
//!     │   ├── mod.rs          # Semantic and syntax forests from level outlines
//!     │   └── anchors.rs      # Anchor inference for flattened wrappers
//!     ├── path
//!     │   ├── mod.rs          # Selector and step algebra on path strings
//!     │   └── normalize.rs    # Dialect rewrites before evaluation
//!     ├── xml                 # Owned, mutable XML tree and the path evaluator
//!     ├── context.rs          # Registry + forests + settings, shared per run
//!     ├── mapper.rs           # Per-document resolution and default synthesis
//!     ├── tidy                # Tidy table ingest, export, assembly and file I/O
//!     ├── treeviz.rs          # Text rendering of the forests
//!     ├── diagnostics.rs      # Non-fatal findings
//!     └── error.rs
//!
//! Testing
//!
//!     Unit tests sit next to the code. Integration tests live under tests/ with their
//!     fixtures, included from tests/lib.rs as submodules:
//!     tests
//!     ├── lib.rs
//!     ├── <area>.rs
//!     └── fixtures
//!
//! Core Algorithms
//!
//!     The hierarchies are rebuilt from flat level outlines (see ./hierarchy/mod.rs),
//!     once for the semantic order and once for the syntax order. Everything else
//!     works on those forests: the mapper walks the semantic forest resolving paths
//!     relative to matched parents, the tidy exporter flattens the resolved tree into
//!     rows, and the assembler walks paths the other way, creating elements.
//!
//! Dialects
//!
//!     Dialects differ in a handful of rules (level offset, wrapper flattening, root
//!     rewrite, currency substitution, path abbreviations), collected in
//!     [dialect::DialectRules]. No other module branches on a dialect tag.

pub mod binding;
pub mod context;
pub mod diagnostics;
pub mod dialect;
pub mod error;
pub mod hierarchy;
pub mod mapper;
pub mod path;
pub mod registry;
pub mod sheet;
pub mod tidy;
pub mod treeviz;
pub mod xml;

pub use binding::{Binding, Cardinality};
pub use context::BindingContext;
pub use diagnostics::{Diagnostic, ForestKind};
pub use dialect::{Dialect, DialectSettings, Mode};
pub use error::{Result, SemsynError};
pub use mapper::{DocumentMapper, NodeMap, ParsedNode, ResolvedNode};
pub use registry::BindingRegistry;
pub use tidy::{TidyLayout, TidyTable};
pub use xml::{Document, Fragment, XPath};
