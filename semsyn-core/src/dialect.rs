//! Syntax dialects and the per-dialect rule table
//!
//!     Every dialect-dependent behaviour (hierarchy level offsets, unit wrapper
//!     flattening, root element rewriting, currency predicate substitution) is
//!     looked up here instead of being tested inline at each call site. Adding a
//!     dialect means adding one `DialectRules` entry.

use crate::error::{Result, SemsynError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dialect {
    JpPint,
    SmeCommon,
    XbrlGl,
    Adc,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::JpPint,
        Dialect::SmeCommon,
        Dialect::XbrlGl,
        Dialect::Adc,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Dialect::JpPint => "JP-PINT",
            Dialect::SmeCommon => "SME-COMMON",
            Dialect::XbrlGl => "XBRL-GL",
            Dialect::Adc => "ADC",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Dialect::JpPint => "Peppol BIS based Japanese invoice (UBL)",
            Dialect::SmeCommon => "SME common EDI invoice (UN/CEFACT CII)",
            Dialect::XbrlGl => "XBRL Global Ledger",
            Dialect::Adc => "Audit data collection",
        }
    }

    pub fn rules(&self) -> &'static DialectRules {
        match self {
            Dialect::JpPint => &JP_PINT,
            Dialect::SmeCommon => &SME_COMMON,
            Dialect::XbrlGl => &XBRL_GL,
            Dialect::Adc => &ADC,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Dialect {
    type Err = SemsynError;

    fn from_str(s: &str) -> Result<Self> {
        Dialect::ALL
            .into_iter()
            .find(|d| d.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SemsynError::UnknownDialect(s.to_string()))
    }
}

/// Whether resolution may complete the document with default values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Mode {
    /// Read-only harvesting
    #[default]
    Semantic,
    /// Missing defaulted items are synthesized into the document
    Syntax,
}

impl FromStr for Mode {
    type Err = SemsynError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semantic" => Ok(Mode::Semantic),
            "syntax" => Ok(Mode::Syntax),
            _ => Err(SemsynError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Semantic => f.write_str("semantic"),
            Mode::Syntax => f.write_str("syntax"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyKind {
    Document,
    Tax,
}

/// Replace a currency-code sub-path with the literal captured from the document
#[derive(Debug)]
pub struct CurrencyRule {
    /// Substring that must be present for the rule to apply
    pub marker: &'static str,
    pub pattern: Regex,
    pub kind: CurrencyKind,
}

#[derive(Debug)]
pub struct DialectRules {
    /// Added to the authored semantic level before placement
    pub level_offset: isize,
    /// Unit data type wrappers do not open a syntax level
    pub flatten_unit_wrappers: bool,
    /// Root element rewrite, applied before anything else
    pub root_rewrite: Option<(Regex, &'static str)>,
    /// At most one rule applies per path, first match wins
    pub currency_rules: Vec<CurrencyRule>,
    pub document_currency_id: Option<&'static str>,
    pub tax_currency_id: Option<&'static str>,
    /// Prefix abbreviations used in log output
    pub short_paths: &'static [(&'static str, &'static str)],
}

fn regex(pattern: &str) -> Regex {
    // Patterns are literals of this module and covered by tests.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid dialect pattern {pattern}: {e}"))
}

static JP_PINT: Lazy<DialectRules> = Lazy::new(|| DialectRules {
    level_offset: 0,
    flatten_unit_wrappers: false,
    root_rewrite: Some((regex(r"/(?:ubl:)?Invoice\b"), "/*")),
    currency_rules: vec![
        CurrencyRule {
            marker: "cbc:DocumentCurrencyCode]",
            pattern: regex(r"(?:/Invoice|/\*|\.)/cbc:DocumentCurrencyCode"),
            kind: CurrencyKind::Document,
        },
        CurrencyRule {
            marker: "cbc:TaxCurrencyCode]",
            pattern: regex(r"(?:/Invoice|/\*|\.)/cbc:TaxCurrencyCode"),
            kind: CurrencyKind::Tax,
        },
    ],
    document_currency_id: Some("ibt-005"),
    tax_currency_id: Some("ibt-006"),
    short_paths: &[],
});

static SME_COMMON: Lazy<DialectRules> = Lazy::new(|| DialectRules {
    level_offset: 0,
    flatten_unit_wrappers: true,
    root_rewrite: None,
    currency_rules: vec![
        CurrencyRule {
            marker: "InvoiceCurrencyCode]",
            pattern: regex(
                r"//CIIHSupplyChainTradeTransaction/ApplicableCIIHSupplyChainTradeSettlement/InvoiceCurrencyCode",
            ),
            kind: CurrencyKind::Document,
        },
        CurrencyRule {
            marker: "TaxCurrencyCode]",
            pattern: regex(
                r"//CIIHSupplyChainTradeTransaction/ApplicableCIIHSupplyChainTradeSettlement/TaxCurrencyCode",
            ),
            kind: CurrencyKind::Tax,
        },
    ],
    document_currency_id: Some("JC43_JC34_02"),
    tax_currency_id: Some("JC43_JC34_01"),
    short_paths: &[
        (
            "[TaxTotalAmount/@currencyID=/SMEInvoice/CIIHSupplyChainTradeTransaction/ApplicableCIIHSupplyChainTradeSettlement",
            "[TaxTotalAmount/@currencyID=...",
        ),
        (
            "[CurrencyCode=/SMEInvoice/CIIHSupplyChainTradeTransaction/ApplicableCIIHSupplyChainTradeSettlement",
            "[CurrencyCode=...",
        ),
        (
            "/SMEInvoice/CIIHSupplyChainTradeTransaction/ApplicableCIIHSupplyChainTradeAgreement/",
            "...Agreement/",
        ),
        (
            "/SMEInvoice/CIIHSupplyChainTradeTransaction/IncludedCIILSupplyChainTradeLineItem/",
            "...LineItem/",
        ),
        (
            "/SMEInvoice/CIIHSupplyChainTradeTransaction/ApplicableCIIHSupplyChainTradeSettlement/",
            "...Settlement/",
        ),
    ],
});

static XBRL_GL: Lazy<DialectRules> = Lazy::new(|| DialectRules {
    level_offset: 0,
    flatten_unit_wrappers: false,
    root_rewrite: None,
    currency_rules: Vec::new(),
    document_currency_id: None,
    tax_currency_id: None,
    short_paths: &[],
});

static ADC: Lazy<DialectRules> = Lazy::new(|| DialectRules {
    level_offset: -1,
    flatten_unit_wrappers: false,
    root_rewrite: None,
    currency_rules: Vec::new(),
    document_currency_id: None,
    tax_currency_id: None,
    short_paths: &[],
});

/// Everything a run needs to know about the active dialect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialectSettings {
    pub dialect: Dialect,
    pub mode: Mode,
    /// Order value of the root sentinel in both forests
    pub root_order: u32,
    pub document_currency_id: Option<String>,
    pub tax_currency_id: Option<String>,
}

impl DialectSettings {
    /// Settings with the dialect's own currency binding ids
    pub fn new(dialect: Dialect, mode: Mode) -> Self {
        let rules = dialect.rules();
        DialectSettings {
            dialect,
            mode,
            root_order: 0,
            document_currency_id: rules.document_currency_id.map(str::to_string),
            tax_currency_id: rules.tax_currency_id.map(str::to_string),
        }
    }

    pub fn with_root_order(mut self, root_order: u32) -> Self {
        self.root_order = root_order;
        self
    }

    pub fn rules(&self) -> &'static DialectRules {
        self.dialect.rules()
    }
}

impl Default for DialectSettings {
    fn default() -> Self {
        DialectSettings::new(Dialect::JpPint, Mode::Semantic)
    }
}
