//! Path expression subset
//!
//!     Covers what binding sheets use, no more:
//!         - absolute and relative location paths, `//`, `.`, `..`, `*`
//!         - `@name`, `@*`, `text()`, `node()`, prefixed names
//!         - predicates, positional (`[1]`) or boolean
//!         - `=`, `!=`, `and`, `or`, parentheses, string and number literals
//!         - `normalize-space`, `not`, `contains`, `starts-with`, `string`,
//!           `count`, `true`, `false`
//!
//!     Comparisons follow XPath 1.0: a node-set compared with a boolean compares
//!     the node-set's existence, which is why boolean literal predicates are
//!     rewritten into text comparisons before evaluation.
//!
//!     Prefixes resolve through the document's namespace map. An unprefixed name
//!     matches elements in no namespace or in the document's default namespace.

mod eval;
mod parser;

use crate::xml::{Document, Fragment};

pub use parser::{Axis, Expr, LocationPath, NodeTest, Step};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("syntax error in '{path}': {message}")]
    Syntax { path: String, message: String },
    #[error("unknown namespace prefix '{0}'")]
    UnknownPrefix(String),
    #[error("unknown function '{0}()'")]
    UnknownFunction(String),
    #[error("{function}() expects {expected} argument(s)")]
    Arity {
        function: String,
        expected: &'static str,
    },
    #[error("{0}() requires a node-set")]
    NotANodeSet(String),
}

/// A compiled path expression
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    pub fn compile(source: &str) -> Result<Self, PathError> {
        Ok(XPath {
            source: source.to_string(),
            expr: parser::parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate against `doc`; `None` as context means the document node.
    ///
    /// Only element, text and attribute nodes are returned, in document order.
    /// An expression that does not yield a node-set returns no fragments.
    pub fn select(
        &self,
        doc: &Document,
        context: Option<&Fragment>,
    ) -> Result<Vec<Fragment>, PathError> {
        eval::select(doc, context, &self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<Invoice xmlns="urn:inv" xmlns:cbc="urn:cbc" xmlns:cac="urn:cac">
  <cbc:ID>INV-1</cbc:ID>
  <cbc:DocumentCurrencyCode>JPY</cbc:DocumentCurrencyCode>
  <cac:AllowanceCharge>
    <cbc:ChargeIndicator>false</cbc:ChargeIndicator>
    <cbc:Amount currencyID="JPY">100</cbc:Amount>
  </cac:AllowanceCharge>
  <cac:AllowanceCharge>
    <cbc:ChargeIndicator> true </cbc:ChargeIndicator>
    <cbc:Amount currencyID="JPY">250</cbc:Amount>
  </cac:AllowanceCharge>
  <cac:InvoiceLine>
    <cbc:ID>1</cbc:ID>
    <cac:Item><cbc:Name>Pen</cbc:Name></cac:Item>
  </cac:InvoiceLine>
  <cac:InvoiceLine>
    <cbc:ID>2</cbc:ID>
    <cac:Item><cbc:Name>Ink</cbc:Name></cac:Item>
  </cac:InvoiceLine>
</Invoice>"#;

    fn values(doc: &Document, context: Option<&Fragment>, path: &str) -> Vec<String> {
        doc.select(context, path)
            .unwrap()
            .iter()
            .map(|f| doc.text_content(f))
            .collect()
    }

    #[test]
    fn absolute_paths_and_wildcard_root() {
        let doc = Document::parse(DOC).unwrap();
        assert_eq!(values(&doc, None, "/Invoice/cbc:ID"), vec!["INV-1"]);
        assert_eq!(values(&doc, None, "/*/cbc:ID"), vec!["INV-1"]);
        assert_eq!(
            values(&doc, None, "/*/cac:InvoiceLine/cbc:ID"),
            vec!["1", "2"]
        );
    }

    #[test]
    fn descendant_and_attribute_steps() {
        let doc = Document::parse(DOC).unwrap();
        assert_eq!(values(&doc, None, "//cbc:Name"), vec!["Pen", "Ink"]);
        assert_eq!(
            values(&doc, None, "//cbc:Amount/@currencyID"),
            vec!["JPY", "JPY"]
        );
        assert_eq!(values(&doc, None, "/*/cbc:ID/text()"), vec!["INV-1"]);
    }

    #[test]
    fn predicates() {
        let doc = Document::parse(DOC).unwrap();
        assert_eq!(
            values(&doc, None, "/*/cac:InvoiceLine[2]/cac:Item/cbc:Name"),
            vec!["Ink"]
        );
        assert_eq!(
            values(&doc, None, "/*/cac:InvoiceLine[cbc:ID='1']//cbc:Name"),
            vec!["Pen"]
        );
        assert_eq!(
            values(
                &doc,
                None,
                "/*/cac:AllowanceCharge[normalize-space(cbc:ChargeIndicator/text())='true']/cbc:Amount"
            ),
            vec!["250"]
        );
        assert_eq!(
            values(&doc, None, "/*/cac:AllowanceCharge[cbc:Amount/@currencyID='JPY' and cbc:Amount!='100']/cbc:Amount"),
            vec!["250"]
        );
    }

    #[test]
    fn boolean_literal_predicate_tests_existence() {
        // Both charges have an indicator element, so both match either literal.
        let doc = Document::parse(DOC).unwrap();
        assert_eq!(
            values(&doc, None, "/*/cac:AllowanceCharge[cbc:ChargeIndicator=false()]/cbc:Amount"),
            vec!["100", "250"]
        );
    }

    #[test]
    fn relative_paths_from_context() {
        let doc = Document::parse(DOC).unwrap();
        let lines = doc.select(None, "/*/cac:InvoiceLine").unwrap();
        assert_eq!(values(&doc, Some(&lines[1]), "./cbc:ID"), vec!["2"]);
        assert_eq!(values(&doc, Some(&lines[1]), "cac:Item/cbc:Name"), vec!["Ink"]);
        assert_eq!(values(&doc, Some(&lines[1]), "../cbc:ID"), vec!["INV-1"]);
        assert_eq!(values(&doc, Some(&lines[0]), "/*/cbc:ID"), vec!["INV-1"]);
    }

    #[test]
    fn functions() {
        let doc = Document::parse(DOC).unwrap();
        assert_eq!(
            values(&doc, None, "/*/cac:InvoiceLine[count(cac:Item)=1][contains(cac:Item/cbc:Name,'n')]/cbc:ID"),
            vec!["1", "2"]
        );
        assert_eq!(
            values(&doc, None, "/*/cac:InvoiceLine[starts-with(string(cac:Item/cbc:Name),'I')]/cbc:ID"),
            vec!["2"]
        );
        assert_eq!(
            values(&doc, None, "/*/cac:InvoiceLine[not(cbc:ID='1') or false()]/cbc:ID"),
            vec!["2"]
        );
    }

    #[test]
    fn errors() {
        let doc = Document::parse(DOC).unwrap();
        assert_eq!(
            doc.select(None, "/*/xx:ID").unwrap_err(),
            PathError::UnknownPrefix("xx".to_string())
        );
        assert_eq!(
            doc.select(None, "/*[frobnicate()]").unwrap_err(),
            PathError::UnknownFunction("frobnicate".to_string())
        );
        assert!(matches!(
            doc.select(None, "/*/cbc:ID[").unwrap_err(),
            PathError::Syntax { .. }
        ));
        assert!(matches!(
            doc.select(None, "/*[not()]").unwrap_err(),
            PathError::Arity { .. }
        ));
    }

    #[test]
    fn non_node_set_results_are_empty() {
        let doc = Document::parse(DOC).unwrap();
        assert!(doc.select(None, "'JPY'").unwrap().is_empty());
    }
}
