//! XML text to arena, via roxmltree

use super::{Attribute, Document, Element, NodeId, NodeKind, QName};
use crate::error::{Result, SemsynError};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

pub(super) fn parse(text: &str) -> Result<Document> {
    let source = roxmltree::Document::parse(text).map_err(|e| SemsynError::Xml(e.to_string()))?;
    let mut doc = Document::default();

    let root = source.root_element();
    // Document element declarations take precedence in the namespace map.
    for ns in root.namespaces() {
        if ns.uri() != XML_NAMESPACE {
            doc.register_namespace(ns.name(), ns.uri());
        }
    }
    append(&mut doc, NodeId::DOCUMENT, root);
    Ok(doc)
}

fn append(doc: &mut Document, parent: NodeId, node: roxmltree::Node<'_, '_>) {
    if node.is_text() {
        if let Some(text) = node.text() {
            if !text.trim().is_empty() {
                doc.push(parent, NodeKind::Text(text.to_string()));
            }
        }
        return;
    }
    if !node.is_element() {
        return;
    }

    let tag = node.tag_name();
    let prefix = tag.namespace().and_then(|uri| node.lookup_prefix(uri));
    let name = QName::new(prefix, tag.name(), tag.namespace());

    let attributes = node
        .attributes()
        .map(|attr| {
            let prefix = attr.namespace().and_then(|uri| node.lookup_prefix(uri));
            Attribute {
                name: QName::new(prefix, attr.name(), attr.namespace()),
                value: attr.value().to_string(),
            }
        })
        .collect();

    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    let namespace_decls: Vec<(Option<String>, String)> = node
        .namespaces()
        .filter(|ns| ns.uri() != XML_NAMESPACE)
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect();
    for (prefix, uri) in &namespace_decls {
        doc.register_namespace(prefix.as_deref(), uri);
    }

    let id = doc.push(
        parent,
        NodeKind::Element(Element {
            name,
            attributes,
            namespace_decls,
        }),
    );
    for child in node.children() {
        append(doc, id, child);
    }
}
