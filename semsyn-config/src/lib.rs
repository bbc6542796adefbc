//! Shared configuration loader for the semsyn toolchain.
//!
//! `defaults/semsyn.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`SemsynConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use semsyn_core::{Dialect, DialectSettings, Mode, SemsynError};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/semsyn.default.toml");

/// Name of the optional per-directory configuration file
pub const LOCAL_CONFIG_FILE: &str = "semsyn.toml";

/// Top-level configuration consumed by semsyn applications.
#[derive(Debug, Clone, Deserialize)]
pub struct SemsynConfig {
    pub binding: BindingConfig,
    pub dialect: DialectConfig,
    pub tidy: TidyConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BindingConfig {
    pub delimiter: char,
}

/// Dialect tag and processing mode, as written in configuration files.
#[derive(Debug, Clone, Deserialize)]
pub struct DialectConfig {
    pub name: String,
    pub mode: String,
    pub root_order: u32,
    #[serde(default)]
    pub document_currency_id: Option<String>,
    #[serde(default)]
    pub tax_currency_id: Option<String>,
}

impl DialectConfig {
    /// Resolve the tag and mode into core settings. Currency ids left unset
    /// fall back to the dialect's own.
    pub fn settings(&self) -> Result<DialectSettings, SemsynError> {
        let dialect: Dialect = self.name.parse()?;
        let mode: Mode = self.mode.parse()?;
        let mut settings = DialectSettings::new(dialect, mode).with_root_order(self.root_order);
        if let Some(id) = non_empty(&self.document_currency_id) {
            settings.document_currency_id = Some(id.to_string());
        }
        if let Some(id) = non_empty(&self.tax_currency_id) {
            settings.tax_currency_id = Some(id.to_string());
        }
        Ok(settings)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Tidy table knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct TidyConfig {
    pub descriptive_prefix: String,
    pub delimiter: char,
    pub append: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub indent: usize,
}

/// Single-byte delimiter for the CSV reader and writer; `None` for non-ASCII.
pub fn delimiter_byte(delimiter: char) -> Option<u8> {
    u8::try_from(delimiter).ok().filter(u8::is_ascii)
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<SemsynConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<SemsynConfig, ConfigError> {
    Loader::new().build()
}
