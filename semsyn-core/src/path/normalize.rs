//! Rewrites applied to a binding path before it reaches the evaluator

use crate::dialect::{CurrencyKind, DialectRules};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::borrow::Cow;

static CHARGE_INDICATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\s*([^\[\]=]+?)\s*=\s*(true|false)\(\)\s*\]")
        .unwrap_or_else(|e| panic!("invalid charge indicator pattern: {e}"))
});

/// Rewrite boolean literal predicates into text comparisons.
///
/// `[X = true()]` becomes `[normalize-space(X/text())='true']` (and likewise for
/// `false()`), for every such predicate from left to right.
pub fn replace_charge_indicator(path: &str) -> Cow<'_, str> {
    CHARGE_INDICATOR.replace_all(path, "[normalize-space(${1}/text())='${2}']")
}

/// Abbreviate long, well known prefixes for log output.
pub fn shorten_path(rules: &DialectRules, path: &str) -> String {
    rules
        .short_paths
        .iter()
        .fold(path.to_string(), |acc, (long, short)| acc.replace(long, short))
}

/// Dialect normalization bound to the currency values of one document
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    rules: &'static DialectRules,
    document_currency: Option<String>,
    tax_currency: Option<String>,
}

impl PathNormalizer {
    pub fn new(
        rules: &'static DialectRules,
        document_currency: Option<String>,
        tax_currency: Option<String>,
    ) -> Self {
        PathNormalizer {
            rules,
            document_currency,
            tax_currency,
        }
    }

    /// A normalizer that knows no currencies yet
    pub fn without_currencies(rules: &'static DialectRules) -> Self {
        Self::new(rules, None, None)
    }

    pub fn document_currency(&self) -> Option<&str> {
        self.document_currency.as_deref()
    }

    pub fn tax_currency(&self) -> Option<&str> {
        self.tax_currency.as_deref()
    }

    /// Root rewrite, then boolean literal predicates, then currency literals.
    pub fn normalize(&self, path: &str) -> String {
        let mut path = match &self.rules.root_rewrite {
            Some((pattern, replacement)) => pattern.replace_all(path, *replacement).into_owned(),
            None => path.to_string(),
        };
        if path.contains("true()") || path.contains("false()") {
            path = replace_charge_indicator(&path).into_owned();
        }
        if let Some(rule) = self
            .rules
            .currency_rules
            .iter()
            .find(|rule| path.contains(rule.marker))
        {
            let value = match rule.kind {
                CurrencyKind::Document => self.document_currency.as_deref(),
                CurrencyKind::Tax => self.tax_currency.as_deref(),
            };
            if let Some(value) = value {
                let literal = format!("'{value}'");
                path = rule
                    .pattern
                    .replace_all(&path, NoExpand(&literal))
                    .into_owned();
            }
        }
        path
    }
}
